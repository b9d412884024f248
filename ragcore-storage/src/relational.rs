//! ABOUTME: Relational store interface covering the row types named in
//! ABOUTME: spec.md §6's persisted state layout. Session management and the
//! ABOUTME: physical backend are out of scope (spec.md §1); this crate
//! ABOUTME: specifies the read/write contract the core pipeline needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ragcore_core::error::CoreError;
use ragcore_core::types::{EvalResult, EvalRun, KbId, KnowledgeBase, Memory};
use serde::{Deserialize, Serialize};

/// A document's provenance row — enough for `summarize_topic`'s direct
/// relational lookup before falling back to the retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: String,
    pub kb_id: KbId,
    pub name: String,
    pub full_text: String,
}

/// One turn of chat history, as persisted for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub session_id: String,
    pub role: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A chat session row. Session lifecycle/auth is out of scope; this is the
/// minimal shape the context engine needs to read history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSessionRow {
    pub id: String,
    pub kb_id: KbId,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The relational surface the query pipeline reads from and writes to:
/// KB, Document, Memory, EvalRun, EvalResult, ChatSession, ChatHistory.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_kb(&self, kb_id: KbId) -> Result<Option<KnowledgeBase>, CoreError>;

    async fn get_document(&self, kb_id: KbId, document_id: &str) -> Result<Option<DocumentRow>, CoreError>;

    async fn find_document_by_topic(
        &self,
        kb_id: KbId,
        topic: &str,
    ) -> Result<Option<DocumentRow>, CoreError>;

    async fn upsert_memory(&self, memory: Memory) -> Result<(), CoreError>;

    async fn get_memory(&self, kb_id: KbId, id: &str) -> Result<Option<Memory>, CoreError>;

    async fn touch_memory(&self, kb_id: KbId, id: &str, now: DateTime<Utc>) -> Result<(), CoreError>;

    async fn list_memories(&self, kb_id: KbId) -> Result<Vec<Memory>, CoreError>;

    async fn create_eval_run(&self, run: EvalRun) -> Result<(), CoreError>;

    async fn update_eval_run(&self, run: &EvalRun) -> Result<(), CoreError>;

    async fn get_eval_run(&self, id: &str) -> Result<Option<EvalRun>, CoreError>;

    async fn append_eval_result(&self, run_id: &str, result: EvalResult) -> Result<(), CoreError>;

    async fn get_chat_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatHistoryEntry>, CoreError>;

    async fn append_chat_history(&self, entry: ChatHistoryEntry) -> Result<(), CoreError>;
}
