//! ABOUTME: In-memory fakes for the four external collaborators, used by
//! ABOUTME: this workspace's own tests rather than shipped against a real
//! ABOUTME: deployment.

use crate::graph::{GraphIndex, GraphSnapshot};
use crate::keyword::{KeywordDoc, KeywordIndex};
use crate::relational::{ChatHistoryEntry, DocumentRow, Store};
use crate::vector::{VectorIndex, VectorUpsert};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ragcore_core::error::CoreError;
use ragcore_core::types::{
    EvalResult, EvalRun, GraphMode, KbId, KeywordHit, KnowledgeBase, Memory, VectorHit,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-memory vector index that ranks by cosine similarity over raw
/// `f32` vectors. Good enough to exercise fusion and score-filtering logic
/// in tests without a real ANN backend.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    entries: DashMap<KbId, Vec<(VectorUpsert, Vec<f32>)>>,
}

impl InMemoryVectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, kb_id: KbId, entries: Vec<VectorUpsert>) -> Result<(), CoreError> {
        let mut bucket = self.entries.entry(kb_id).or_default();
        for e in entries {
            bucket.retain(|(existing, _)| existing.id != e.id);
            let vec = e.vector.clone();
            bucket.push((e, vec));
        }
        Ok(())
    }

    async fn delete(&self, kb_id: KbId, ids: &[String]) -> Result<(), CoreError> {
        if let Some(mut bucket) = self.entries.get_mut(&kb_id) {
            bucket.retain(|(e, _)| !ids.contains(&e.id));
        }
        Ok(())
    }

    async fn retrieve(
        &self,
        kb_id: KbId,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, CoreError> {
        let Some(bucket) = self.entries.get(&kb_id) else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<(f32, &VectorUpsert)> = bucket
            .iter()
            .map(|(e, v)| (Self::cosine(query_vector, v), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, e)| VectorHit {
                id: e.id.clone(),
                content: e.text.clone(),
                document_name: e.document_name.clone(),
                similarity: score,
                metadata: e.metadata.clone(),
            })
            .collect())
    }
}

/// An in-memory keyword index: naive substring-count ranking. The `healthy`
/// flag lets tests simulate a down index for the fallback-path scenarios.
pub struct InMemoryKeywordIndex {
    docs: DashMap<KbId, Vec<KeywordDoc>>,
    healthy: AtomicBool,
}

impl Default for InMemoryKeywordIndex {
    fn default() -> Self {
        Self {
            docs: DashMap::new(),
            healthy: AtomicBool::new(true),
        }
    }
}

impl InMemoryKeywordIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeywordIndex for InMemoryKeywordIndex {
    async fn index(&self, kb_id: KbId, docs: Vec<KeywordDoc>) -> Result<(), CoreError> {
        let mut bucket = self.docs.entry(kb_id).or_default();
        for d in docs {
            bucket.retain(|existing| existing.id != d.id);
            bucket.push(d);
        }
        Ok(())
    }

    async fn delete(&self, kb_id: KbId, doc_id: &str) -> Result<(), CoreError> {
        if let Some(mut bucket) = self.docs.get_mut(&kb_id) {
            bucket.retain(|d| d.document_id != doc_id);
        }
        Ok(())
    }

    async fn search(
        &self,
        kb_id: KbId,
        query: &str,
        limit: usize,
    ) -> Result<Vec<KeywordHit>, CoreError> {
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(CoreError::degraded("keyword_index", "index unhealthy"));
        }
        let Some(bucket) = self.docs.get(&kb_id) else {
            return Ok(Vec::new());
        };
        let query_lower = query.to_lowercase();
        let mut scored: Vec<(usize, &KeywordDoc)> = bucket
            .iter()
            .filter_map(|d| {
                let hits = d.content.to_lowercase().matches(&query_lower).count();
                (hits > 0).then_some((hits, d))
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(rank, (_, d))| KeywordHit {
                id: d.id.clone(),
                document_id: d.document_id.clone(),
                document_name: d.document_name.clone(),
                content: d.content.clone(),
                rank,
            })
            .collect())
    }

    async fn health(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

/// An in-memory graph index that always falls back (no real graph backend
/// is carried in this workspace; spec.md §1 treats it as external). Tests
/// that need a working graph answer can swap in their own fake via the
/// `GraphIndex` trait.
#[derive(Default)]
pub struct UnavailableGraphIndex;

#[async_trait]
impl GraphIndex for UnavailableGraphIndex {
    async fn query(&self, _kb_id: KbId, _question: &str, _mode: GraphMode) -> Result<String, CoreError> {
        Err(CoreError::transient("graph_index", "graph backend unavailable"))
    }

    async fn graph(&self, _kb_id: KbId, _limit: usize) -> Result<GraphSnapshot, CoreError> {
        Err(CoreError::transient("graph_index", "graph backend unavailable"))
    }

    async fn health(&self) -> bool {
        false
    }
}

/// An in-memory relational store backing KB/Document/Memory/EvalRun/
/// EvalResult/ChatHistory.
#[derive(Default)]
pub struct InMemoryStore {
    kbs: DashMap<KbId, KnowledgeBase>,
    documents: DashMap<(KbId, String), DocumentRow>,
    memories: DashMap<(KbId, String), Memory>,
    runs: DashMap<String, EvalRun>,
    chat_history: DashMap<String, Vec<ChatHistoryEntry>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_kb(&self, kb: KnowledgeBase) {
        self.kbs.insert(kb.id, kb);
    }

    pub fn seed_document(&self, doc: DocumentRow) {
        self.documents.insert((doc.kb_id, doc.id.clone()), doc);
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_kb(&self, kb_id: KbId) -> Result<Option<KnowledgeBase>, CoreError> {
        Ok(self.kbs.get(&kb_id).map(|e| e.clone()))
    }

    async fn get_document(&self, kb_id: KbId, document_id: &str) -> Result<Option<DocumentRow>, CoreError> {
        Ok(self
            .documents
            .get(&(kb_id, document_id.to_string()))
            .map(|e| e.clone()))
    }

    async fn find_document_by_topic(
        &self,
        kb_id: KbId,
        topic: &str,
    ) -> Result<Option<DocumentRow>, CoreError> {
        let topic_lower = topic.to_lowercase();
        Ok(self
            .documents
            .iter()
            .filter(|e| e.key().0 == kb_id)
            .find(|e| e.value().name.to_lowercase().contains(&topic_lower))
            .map(|e| e.value().clone()))
    }

    async fn upsert_memory(&self, memory: Memory) -> Result<(), CoreError> {
        self.memories.insert((memory.kb_id, memory.id.clone()), memory);
        Ok(())
    }

    async fn get_memory(&self, kb_id: KbId, id: &str) -> Result<Option<Memory>, CoreError> {
        Ok(self.memories.get(&(kb_id, id.to_string())).map(|e| e.clone()))
    }

    async fn touch_memory(&self, kb_id: KbId, id: &str, now: DateTime<Utc>) -> Result<(), CoreError> {
        if let Some(mut entry) = self.memories.get_mut(&(kb_id, id.to_string())) {
            entry.access_count = entry.access_count.saturating_add(1);
            entry.last_accessed_at = now;
        }
        Ok(())
    }

    async fn list_memories(&self, kb_id: KbId) -> Result<Vec<Memory>, CoreError> {
        Ok(self
            .memories
            .iter()
            .filter(|e| e.key().0 == kb_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn create_eval_run(&self, run: EvalRun) -> Result<(), CoreError> {
        self.runs.insert(run.id.clone(), run);
        Ok(())
    }

    async fn update_eval_run(&self, run: &EvalRun) -> Result<(), CoreError> {
        self.runs.insert(run.id.clone(), run.clone());
        Ok(())
    }

    async fn get_eval_run(&self, id: &str) -> Result<Option<EvalRun>, CoreError> {
        Ok(self.runs.get(id).map(|e| e.clone()))
    }

    async fn append_eval_result(&self, run_id: &str, result: EvalResult) -> Result<(), CoreError> {
        if let Some(mut run) = self.runs.get_mut(run_id) {
            run.record_result(result);
            Ok(())
        } else {
            Err(CoreError::fatal("store", format!("no such run {run_id}")))
        }
    }

    async fn get_chat_history(
        &self,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatHistoryEntry>, CoreError> {
        Ok(self
            .chat_history
            .get(session_id)
            .map(|h| {
                let len = h.len();
                h[len.saturating_sub(limit)..].to_vec()
            })
            .unwrap_or_default())
    }

    async fn append_chat_history(&self, entry: ChatHistoryEntry) -> Result<(), CoreError> {
        self.chat_history
            .entry(entry.session_id.clone())
            .or_default()
            .push(entry);
        Ok(())
    }
}
