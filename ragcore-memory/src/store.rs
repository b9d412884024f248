//! ABOUTME: The Memory Store — extract/upsert/recall/touch over the
//! ABOUTME: relational store and vector index, per spec.md §4.B.

use crate::extractor::{should_extract, MemoryExtractor};
use crate::freshness::freshness_score;
use ragcore_core::error::CoreError;
use ragcore_core::traits::embedding::EmbeddingClient;
use ragcore_core::types::{ExtractedMemory, KbId, Memory, MemoryKind, ScoredMemory};
use ragcore_storage::{Store, VectorIndex, VectorUpsert};
use std::sync::Arc;
use tracing::{debug, warn};

/// How many vector candidates to pull per requested memory, to account for
/// document chunks sharing the same vector index and being filtered out by
/// the `type=memory` metadata tag.
const CANDIDATE_MULTIPLIER: usize = 4;

/// Memory-type tag written into vector metadata so memories co-retrieve
/// with, but stay distinguishable from, document chunks.
const VECTOR_METADATA_TYPE: &str = "memory";

pub struct MemoryStore {
    store: Arc<dyn Store>,
    vector: Arc<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingClient>,
    extractor: Arc<dyn MemoryExtractor>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        vector: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingClient>,
        extractor: Arc<dyn MemoryExtractor>,
    ) -> Self {
        Self {
            store,
            vector,
            embedder,
            extractor,
        }
    }

    /// `extract(question, answer)`, gated by the `should_extract` heuristic.
    /// Returns an empty list without invoking the extractor when the
    /// heuristic rejects the exchange.
    pub async fn extract(&self, question: &str, answer: &str) -> Result<Vec<ExtractedMemory>, CoreError> {
        if !should_extract(question, answer) {
            debug!("should_extract rejected exchange, skipping LLM extraction");
            return Ok(Vec::new());
        }
        self.extractor.extract(question, answer).await
    }

    /// Persist `memory` and side-index its embedding into the vector store
    /// tagged `type=memory`. `store.upsert_memory` replaces the whole row in
    /// one write, so concurrent upserts on the same id never interleave
    /// partial fields.
    pub async fn upsert(&self, memory: Memory) -> Result<(), CoreError> {
        let kb_id = memory.kb_id;
        let vectors = self.embedder.embed(&[memory.content.clone()]).await?;
        let vector = vectors.into_iter().next().unwrap_or_default();

        self.vector
            .upsert(
                kb_id,
                vec![VectorUpsert {
                    id: memory.id.clone(),
                    vector,
                    text: memory.content.clone(),
                    document_name: String::new(),
                    metadata: serde_json::json!({
                        "type": VECTOR_METADATA_TYPE,
                        "memory_id": memory.id,
                    }),
                }],
            )
            .await?;

        self.store.upsert_memory(memory).await
    }

    /// `recall(kb_id, query, k) -> [ScoredMemory]`: top-k memories by
    /// similarity × freshness. Touches every returned memory's access
    /// counter and last-access timestamp.
    pub async fn recall(&self, kb_id: KbId, query: &str, k: usize) -> Result<Vec<ScoredMemory>, CoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let vectors = self.embedder.embed(&[query.to_string()]).await?;
        let query_vector = vectors.into_iter().next().unwrap_or_default();

        let candidates = self
            .vector
            .retrieve(kb_id, &query_vector, k * CANDIDATE_MULTIPLIER)
            .await?;

        let now = chrono::Utc::now();
        let mut scored = Vec::new();
        for hit in candidates {
            if hit.metadata.get("type").and_then(|v| v.as_str()) != Some(VECTOR_METADATA_TYPE) {
                continue;
            }
            let Some(memory_id) = hit.metadata.get("memory_id").and_then(|v| v.as_str()) else {
                continue;
            };
            let Some(memory) = self.store.get_memory(kb_id, memory_id).await? else {
                warn!(memory_id, "vector hit referenced a memory missing from the store");
                continue;
            };
            let score = freshness_score(
                hit.similarity,
                memory.importance,
                memory.age_days(now),
                memory.access_count,
            );
            scored.push(ScoredMemory { memory, score });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        for scored_memory in &scored {
            self.touch(kb_id, &scored_memory.memory.id).await?;
        }

        Ok(scored)
    }

    /// `touch(id)`: best-effort access-counter increment. A missed update
    /// under concurrent access is acceptable per spec.md §4.B.
    pub async fn touch(&self, kb_id: KbId, id: &str) -> Result<(), CoreError> {
        self.store.touch_memory(kb_id, id, chrono::Utc::now()).await
    }

    /// Convenience helper binding `extract` to `upsert` for a finished
    /// conversational turn.
    pub async fn record_turn(
        &self,
        kb_id: KbId,
        user_id: Option<String>,
        session_id: Option<String>,
        question: &str,
        answer: &str,
    ) -> Result<Vec<Memory>, CoreError> {
        let extracted = self.extract(question, answer).await?;
        let mut persisted = Vec::with_capacity(extracted.len());
        for ExtractedMemory {
            content,
            kind,
            importance,
        } in extracted
        {
            let memory = Memory::new(
                kb_id,
                user_id.clone(),
                session_id.clone(),
                content,
                kind,
                importance,
            );
            self.upsert(memory.clone()).await?;
            persisted.push(memory);
        }
        Ok(persisted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::NoopMemoryExtractor;
    use async_trait::async_trait;
    use ragcore_storage::{InMemoryStore, InMemoryVectorIndex};

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingClient for StubEmbedder {
        fn name(&self) -> &str {
            "stub"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }

        fn dimensions(&self) -> usize {
            2
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(InMemoryVectorIndex::new()),
            Arc::new(StubEmbedder),
            Arc::new(NoopMemoryExtractor),
        )
    }

    #[tokio::test]
    async fn upsert_then_recall_round_trips() {
        let ms = store();
        let kb_id = KbId::new();
        let memory = Memory::new(
            kb_id,
            Some("user-1".to_string()),
            None,
            "prefers dark mode".to_string(),
            MemoryKind::UserPreference,
            0.8,
        );
        ms.upsert(memory.clone()).await.unwrap();

        let recalled = ms.recall(kb_id, "dark mode preference", 5).await.unwrap();
        assert_eq!(recalled.len(), 1);
        assert_eq!(recalled[0].memory.content, "prefers dark mode");
        assert!(recalled[0].score > 0.0);
    }

    #[tokio::test]
    async fn recall_touches_access_counter() {
        let ms = store();
        let kb_id = KbId::new();
        let memory = Memory::new(kb_id, None, None, "likes rust".to_string(), MemoryKind::General, 0.5);
        let id = memory.id.clone();
        ms.upsert(memory).await.unwrap();

        ms.recall(kb_id, "rust", 5).await.unwrap();
        let touched = ms.store.get_memory(kb_id, &id).await.unwrap().unwrap();
        assert_eq!(touched.access_count, 1);
    }

    #[tokio::test]
    async fn record_turn_skips_extraction_for_greetings() {
        let ms = store();
        let kb_id = KbId::new();
        let persisted = ms.record_turn(kb_id, None, None, "hello", "Hi there!").await.unwrap();
        assert!(persisted.is_empty());
    }

    #[tokio::test]
    async fn recall_with_zero_k_returns_empty() {
        let ms = store();
        let kb_id = KbId::new();
        let recalled = ms.recall(kb_id, "anything", 0).await.unwrap();
        assert!(recalled.is_empty());
    }
}
