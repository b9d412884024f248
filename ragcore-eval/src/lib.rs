//! ABOUTME: Evaluator Harness (component I of spec.md §4.I): runs a
//! ABOUTME: question set end-to-end through the query pipeline, scores each
//! ABOUTME: answer with four parallel LLM judges, and streams progress
//! ABOUTME: while persisting it so a disconnected client can re-fetch run
//! ABOUTME: state.

pub mod judges;
pub mod stream;

pub use judges::{run_all_judges, EvalQuestion};
pub use stream::EvalEvent;

use ragcore_agents::tools::ToolContext;
use ragcore_agents::{QueryPipeline, QueryRequest};
use ragcore_config::{AgentConfig, RetrievalConfig, WebConfig};
use ragcore_core::error::CoreError;
use ragcore_core::traits::llm::LlmClient;
use ragcore_core::types::{EvalResult, EvalRun, JudgeScores, KbId, RunStatus};
use ragcore_memory::MemoryStore;
use ragcore_retrieval::RetrievalFabric;
use ragcore_storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Everything the harness needs to build a fresh `ToolContext` per
/// question, mirroring the fields `QueryPipeline::run`'s caller must supply
/// (spec.md §5: tool state is never shared across queries or KBs).
pub struct ToolContextFactory {
    pub fabric: Arc<RetrievalFabric>,
    pub memory: Arc<MemoryStore>,
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn LlmClient>,
    pub retrieval_config: RetrievalConfig,
    pub agent_config: AgentConfig,
    pub web_config: WebConfig,
}

impl ToolContextFactory {
    #[must_use]
    pub fn build(&self, kb_id: KbId) -> ToolContext {
        ToolContext::new(
            kb_id,
            self.fabric.clone(),
            self.memory.clone(),
            self.store.clone(),
            self.llm.clone(),
            self.retrieval_config.clone(),
            self.agent_config.clone(),
            self.web_config.clone(),
        )
    }
}

/// Drives one evaluation run over a question set, per spec.md §4.I.
pub struct EvaluatorHarness {
    pipeline: Arc<QueryPipeline>,
    tool_ctx: ToolContextFactory,
    store: Arc<dyn Store>,
    judge_llm: Arc<dyn LlmClient>,
    judge_model: String,
    question_timeout: Duration,
}

impl EvaluatorHarness {
    #[must_use]
    pub fn new(
        pipeline: Arc<QueryPipeline>,
        tool_ctx: ToolContextFactory,
        store: Arc<dyn Store>,
        judge_llm: Arc<dyn LlmClient>,
        judge_model: impl Into<String>,
        question_timeout_secs: u64,
    ) -> Self {
        Self {
            pipeline,
            tool_ctx,
            store,
            judge_llm,
            judge_model: judge_model.into(),
            question_timeout: Duration::from_secs(question_timeout_secs),
        }
    }

    /// Run the whole question set against `kb_id`. Creates the run row in
    /// `pending`, transitions to `running`, then for each question invokes
    /// the pipeline end-to-end and dispatches the four judges. Progress is
    /// persisted after every question so a reconnecting client's `get_run`
    /// reconstructs state even if it missed events on the channel. Returns
    /// the channel's receiving half; the caller drives it into whatever
    /// wire transport it's serving (SSE, websocket, CLI progress bar).
    #[instrument(skip(self, questions), fields(kb_id = %kb_id, n = questions.len()))]
    pub fn run(&self, kb_id: KbId, questions: Vec<EvalQuestion>) -> mpsc::Receiver<EvalEvent> {
        let (tx, rx) = mpsc::channel(32);
        let pipeline = self.pipeline.clone();
        let tool_ctx = self.tool_ctx.clone();
        let store = self.store.clone();
        let judge_llm = self.judge_llm.clone();
        let judge_model = self.judge_model.clone();
        let question_timeout = self.question_timeout;

        tokio::spawn(async move {
            drive_run(kb_id, questions, pipeline, tool_ctx, store, judge_llm, judge_model, question_timeout, tx).await;
        });

        rx
    }
}

#[allow(clippy::too_many_arguments)]
async fn drive_run(
    kb_id: KbId,
    questions: Vec<EvalQuestion>,
    pipeline: Arc<QueryPipeline>,
    tool_ctx: ToolContextFactory,
    store: Arc<dyn Store>,
    judge_llm: Arc<dyn LlmClient>,
    judge_model: String,
    question_timeout: Duration,
    tx: mpsc::Sender<EvalEvent>,
) {
    let mut run = EvalRun::new(kb_id, questions.len());
    if let Err(err) = store.create_eval_run(run.clone()).await {
        error!(error = %err, "failed to persist eval run creation");
        let _ = tx.send(EvalEvent::Error { message: err.to_string() }).await;
        return;
    }
    let _ = tx
        .send(EvalEvent::Status {
            status: "pending".to_string(),
        })
        .await;

    run.transition(RunStatus::Running);
    if persist_or_fail(&store, &run, &tx).await.is_err() {
        return;
    }
    let _ = tx
        .send(EvalEvent::Status {
            status: "running".to_string(),
        })
        .await;

    for question in questions {
        let cancel = CancellationToken::new();
        match tokio::time::timeout(question_timeout, run_one_question(&pipeline, &tool_ctx, kb_id, &question, &judge_llm, &judge_model, &cancel)).await {
            Ok(Ok(result)) => {
                if let Err(err) = store.append_eval_result(&run.id, result.clone()).await {
                    error!(error = %err, "failed to persist eval result");
                    let _ = tx.send(EvalEvent::Error { message: err.to_string() }).await;
                    return;
                }
                run.record_result(result.clone());
                if persist_or_fail(&store, &run, &tx).await.is_err() {
                    return;
                }
                let averages = run.averages();
                let _ = tx
                    .send(EvalEvent::Progress {
                        result,
                        completed: run.completed_count,
                        total: run.total_questions,
                        averages,
                    })
                    .await;
            }
            Ok(Err(err)) => {
                error!(error = %err, question = %question.text, "question failed");
                run.transition(RunStatus::Failed);
                let _ = store.update_eval_run(&run).await;
                let _ = tx.send(EvalEvent::Error { message: err.to_string() }).await;
                return;
            }
            Err(_) => {
                cancel.cancel();
                error!(question = %question.text, "question timed out");
                run.transition(RunStatus::Failed);
                let _ = store.update_eval_run(&run).await;
                let _ = tx
                    .send(EvalEvent::Error {
                        message: format!("question timed out after {}s", question_timeout.as_secs()),
                    })
                    .await;
                return;
            }
        }
    }

    run.transition(RunStatus::Completed);
    if persist_or_fail(&store, &run, &tx).await.is_err() {
        return;
    }
    let _ = tx
        .send(EvalEvent::Complete {
            averages: run.averages(),
            total: run.total_questions,
        })
        .await;
}

async fn persist_or_fail(store: &Arc<dyn Store>, run: &EvalRun, tx: &mpsc::Sender<EvalEvent>) -> Result<(), ()> {
    match store.update_eval_run(run).await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!(error = %err, "failed to persist eval run progress");
            let _ = tx.send(EvalEvent::Error { message: err.to_string() }).await;
            Err(())
        }
    }
}

async fn run_one_question(
    pipeline: &Arc<QueryPipeline>,
    tool_ctx: &ToolContextFactory,
    kb_id: KbId,
    question: &EvalQuestion,
    judge_llm: &Arc<dyn LlmClient>,
    judge_model: &str,
    cancel: &CancellationToken,
) -> Result<EvalResult, CoreError> {
    let ctx = tool_ctx.build(kb_id);
    let outcome = pipeline
        .run(
            &ctx,
            QueryRequest {
                kb_id,
                session_id: None,
                user_id: None,
                question: &question.text,
                chat_history: Vec::new(),
                previous_intent: None,
            },
            cancel,
        )
        .await?;

    let tools_called: Vec<String> = outcome.tool_calls.iter().map(|c| c.name.clone()).collect();
    let scores: JudgeScores = run_all_judges(
        judge_llm,
        judge_model,
        question,
        &outcome.answer,
        &outcome.retrieved_evidence,
        &tools_called,
    )
    .await;

    info!(question = %question.text, overall = scores.average(), "question evaluated");

    Ok(EvalResult {
        question: question.text.clone(),
        answer: outcome.answer,
        retrieved_evidence: outcome.retrieved_evidence,
        tools_called,
        scores,
    })
}

impl Clone for ToolContextFactory {
    fn clone(&self) -> Self {
        Self {
            fabric: self.fabric.clone(),
            memory: self.memory.clone(),
            store: self.store.clone(),
            llm: self.llm.clone(),
            retrieval_config: self.retrieval_config.clone(),
            agent_config: self.agent_config.clone(),
            web_config: self.web_config.clone(),
        }
    }
}
