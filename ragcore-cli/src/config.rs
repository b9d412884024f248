//! ABOUTME: Loads a `RuntimeConfig` from `--config`, falling back to the
//! ABOUTME: well-known search paths and then bare defaults plus
//! ABOUTME: `RAGCORE_*` environment overrides.

use ragcore_config::RuntimeConfig;
use std::path::Path;

pub async fn load_runtime_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    if let Some(path) = path {
        return RuntimeConfig::load_from_file(path).await;
    }

    if let Some(discovered) = RuntimeConfig::discover() {
        return RuntimeConfig::load_from_file(&discovered).await;
    }

    let mut config = RuntimeConfig::default();
    config.apply_env_overrides();
    Ok(config)
}
