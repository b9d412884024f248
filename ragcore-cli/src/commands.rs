//! ABOUTME: Assembles the query-path and evaluator stacks from a
//! ABOUTME: `RuntimeConfig` and dispatches the `ask`/`eval` subcommands.
//! ABOUTME: Storage is always the in-memory fakes (spec.md §1: a physical
//! ABOUTME: backend is out of scope); LLM/embedding clients are the rig-core
//! ABOUTME: providers when an API key is configured, falling back to the
//! ABOUTME: deterministic test doubles otherwise so `ask`/`eval` still run
//! ABOUTME: offline.

use crate::cli::Command;
use anyhow::Context;
use ragcore_agents::tools::ToolContext;
use ragcore_agents::{build_default_registry, AgentLoop, QualityController, QueryPipeline, QueryRequest};
use ragcore_config::RuntimeConfig;
use ragcore_context::ContextEngine;
use ragcore_core::traits::embedding::EmbeddingClient;
use ragcore_core::traits::llm::LlmClient;
use ragcore_core::types::KbId;
use ragcore_eval::{EvalQuestion, EvaluatorHarness, ToolContextFactory};
use ragcore_intent::IntentAnalyzer;
use ragcore_memory::{MemoryStore, NoopMemoryExtractor};
use ragcore_providers::{DeterministicEmbeddingClient, DeterministicLlmClient, RigEmbeddingClient, RigLlmClient};
use ragcore_retrieval::RetrievalFabric;
use ragcore_storage::{InMemoryKeywordIndex, InMemoryStore, InMemoryVectorIndex, Store, UnavailableGraphIndex};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Everything a single process run needs to serve either subcommand.
struct Stack {
    pipeline: Arc<QueryPipeline>,
    tool_ctx: ToolContextFactory,
    store: Arc<dyn Store>,
    judge_llm: Arc<dyn LlmClient>,
    judge_model: String,
    question_timeout_secs: u64,
}

fn build_llm_client(config: &RuntimeConfig) -> Arc<dyn LlmClient> {
    match &config.llm.api_key {
        Some(key) if !key.is_empty() => match RigLlmClient::new(key, config.llm.base_url.as_deref(), &config.llm.model) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                warn!(error = %err, "falling back to the deterministic LLM client");
                Arc::new(DeterministicLlmClient::new("no answer available"))
            }
        },
        _ => {
            warn!("no LLM API key configured; using the deterministic LLM client");
            Arc::new(DeterministicLlmClient::new("no answer available"))
        }
    }
}

fn build_embedding_client(config: &RuntimeConfig) -> Arc<dyn EmbeddingClient> {
    match &config.llm.api_key {
        Some(key) if !key.is_empty() => {
            match RigEmbeddingClient::new(key, &config.embedding.model, config.embedding.dimensions) {
                Ok(client) => Arc::new(client),
                Err(err) => {
                    warn!(error = %err, "falling back to the deterministic embedding client");
                    Arc::new(DeterministicEmbeddingClient::new(config.embedding.dimensions))
                }
            }
        }
        _ => Arc::new(DeterministicEmbeddingClient::new(config.embedding.dimensions)),
    }
}

fn build_stack(config: &RuntimeConfig) -> Stack {
    let llm = build_llm_client(config);
    let embedder = build_embedding_client(config);

    let vector = Arc::new(InMemoryVectorIndex::new());
    let keyword = Arc::new(InMemoryKeywordIndex::new());
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());

    let fabric = Arc::new(RetrievalFabric::new(
        vector.clone(),
        keyword,
        Arc::new(UnavailableGraphIndex),
        embedder.clone(),
        config.retrieval.rrf_k,
        config.retrieval.fusion_prefix_width,
        Duration::from_secs(config.retrieval.graph_timeout_secs),
    ));
    let memory = Arc::new(MemoryStore::new(store.clone(), vector, embedder, Arc::new(NoopMemoryExtractor)));

    let intent = IntentAnalyzer::new(llm.clone(), config.llm.model.as_str());
    let context = ContextEngine::new(memory.clone(), fabric.clone(), config.context.clone(), config.retrieval.clone());
    let registry = Arc::new(build_default_registry(config.agent.max_invalid_tool_calls));
    let agent = AgentLoop::new(llm.clone(), registry, config.llm.model.as_str(), config.agent.clone());
    let quality = QualityController::new(
        llm.clone(),
        config.llm.model.as_str(),
        config.agent.max_retries,
        config.agent.retry_timeout_secs,
        config.agent.length_fallback_min_chars,
    );
    let pipeline = Arc::new(QueryPipeline::new(intent, context, agent, quality, config));

    let tool_ctx = ToolContextFactory {
        fabric,
        memory,
        store: store.clone(),
        llm: llm.clone(),
        retrieval_config: config.retrieval.clone(),
        agent_config: config.agent.clone(),
        web_config: config.web.clone(),
    };

    Stack {
        pipeline,
        tool_ctx,
        store,
        judge_llm: llm,
        judge_model: config.llm.model.clone(),
        question_timeout_secs: config.eval.question_timeout_secs,
    }
}

pub async fn execute_command(command: Command, config: RuntimeConfig) -> anyhow::Result<()> {
    match command {
        Command::Ask { kb_id, question } => run_ask(&config, &kb_id, &question).await,
        Command::Eval { kb_id, questions } => run_eval(&config, &kb_id, &questions).await,
    }
}

async fn run_ask(config: &RuntimeConfig, kb_id: &str, question: &str) -> anyhow::Result<()> {
    let stack = build_stack(config);
    let kb_id = parse_kb_id(kb_id);
    let ctx = stack.tool_ctx.build(kb_id);
    let cancel = CancellationToken::new();

    let outcome = stack
        .pipeline
        .run(
            &ctx,
            QueryRequest {
                kb_id,
                session_id: None,
                user_id: None,
                question,
                chat_history: Vec::new(),
                previous_intent: None,
            },
            &cancel,
        )
        .await
        .context("query pipeline failed")?;

    println!("{}", outcome.answer);
    Ok(())
}

async fn run_eval(config: &RuntimeConfig, kb_id: &str, questions_path: &std::path::Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(questions_path)
        .await
        .with_context(|| format!("reading question set {}", questions_path.display()))?;
    let questions: Vec<EvalQuestion> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(EvalQuestion::new)
        .collect();
    anyhow::ensure!(!questions.is_empty(), "question set is empty");

    let stack = build_stack(config);
    let harness = EvaluatorHarness::new(
        stack.pipeline,
        stack.tool_ctx,
        stack.store,
        stack.judge_llm,
        stack.judge_model,
        stack.question_timeout_secs,
    );

    let kb_id = parse_kb_id(kb_id);
    let mut rx = harness.run(kb_id, questions);
    let mut final_averages = None;
    while let Some(event) = rx.recv().await {
        eprint!("{}", event.to_sse());
        if let ragcore_eval::EvalEvent::Complete { averages, .. } = event {
            final_averages = Some(averages);
        }
    }

    match final_averages {
        Some(averages) => {
            println!("{}", serde_json::to_string_pretty(&averages)?);
            Ok(())
        }
        None => anyhow::bail!("evaluation run ended without completing"),
    }
}

fn parse_kb_id(raw: &str) -> KbId {
    uuid::Uuid::parse_str(raw).map_or_else(
        |_| {
            warn!(raw, "kb-id is not a UUID; generating a fresh one for this run");
            KbId::new()
        },
        KbId::from_uuid,
    )
}
