//! ABOUTME: Error kinds shared across the query pipeline
//! ABOUTME: Mirrors the error-kind taxonomy from the system's error handling design

use thiserror::Error;

/// Error kinds for the retrieval/agent/evaluation pipeline.
///
/// These are kinds, not exhaustive variants per call site: every layer of the
/// pipeline maps its local failures onto one of these so callers can apply a
/// uniform recovery policy (retry, degrade, abort).
#[derive(Debug, Error)]
pub enum CoreError {
    /// Network, timeout, or rate-limit failure. Retry with bounded backoff,
    /// then degrade.
    #[error("transient error in {component}: {message}")]
    Transient { component: String, message: String },

    /// One retrieval signal is missing; the caller continues with the
    /// remaining signals and annotates the trace.
    #[error("degraded in {component}: {message}")]
    Degraded { component: String, message: String },

    /// Bad tool input or malformed LLM output.
    #[error("validation error in {component}: {message}")]
    Validation { component: String, message: String },

    /// Max retries or max steps reached; caller returns the best partial
    /// result.
    #[error("exhausted in {component}: {message}")]
    Exhaustion { component: String, message: String },

    /// KB not found, unauthorized, or index corruption. Abort the query.
    #[error("fatal error in {component}: {message}")]
    Fatal { component: String, message: String },

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Storage-layer failure not otherwise classified above.
    #[error("storage error: {0}")]
    Storage(String),

    /// LLM provider failure not otherwise classified above.
    #[error("provider error: {0}")]
    Provider(String),
}

impl CoreError {
    #[must_use]
    pub fn transient(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            component: component.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Degraded {
            component: component.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn validation(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            component: component.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn exhaustion(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Exhaustion {
            component: component.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn fatal(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fatal {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether this error should be recovered locally (the caller can
    /// continue with a degraded result) rather than propagated.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Degraded { .. } | Self::Validation { .. })
    }
}

/// Convenience result alias used across the workspace.
pub type Result<T> = std::result::Result<T, CoreError>;
