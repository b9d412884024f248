//! ABOUTME: The Retrieval Fabric — a uniform hybrid_search/graph_search
//! ABOUTME: surface over vector, keyword, and graph indexes, per spec.md §4.A.

use crate::fusion::reciprocal_rank_fusion;
use ragcore_core::error::CoreError;
use ragcore_core::traits::embedding::EmbeddingClient;
use ragcore_core::types::{
    ContentType, GraphMode, GraphSearchOutcome, KbId, Origin, RetrievalResult,
};
use ragcore_storage::{GraphIndex, KeywordIndex, VectorIndex};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Per-call overrides for `hybrid_search`. Fields default to the fabric's
/// configured values; callers (e.g. `deep_search` wanting a wider net) can
/// override individual knobs without touching the shared config.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub vector_top_k: usize,
    pub keyword_limit: usize,
    pub use_keyword: bool,
    pub min_vector_score: f32,
}

/// The uniform retrieval surface (spec.md §4.A, component A). Holds shared
/// handles to the three index collaborators plus the tuning knobs needed to
/// reproduce the fusion algorithm without reaching into global config.
pub struct RetrievalFabric {
    vector: Arc<dyn VectorIndex>,
    keyword: Arc<dyn KeywordIndex>,
    graph: Arc<dyn GraphIndex>,
    embedder: Arc<dyn EmbeddingClient>,
    rrf_k: u32,
    fusion_prefix_width: usize,
    graph_timeout: Duration,
}

impl RetrievalFabric {
    #[must_use]
    pub fn new(
        vector: Arc<dyn VectorIndex>,
        keyword: Arc<dyn KeywordIndex>,
        graph: Arc<dyn GraphIndex>,
        embedder: Arc<dyn EmbeddingClient>,
        rrf_k: u32,
        fusion_prefix_width: usize,
        graph_timeout: Duration,
    ) -> Self {
        Self {
            vector,
            keyword,
            graph,
            embedder,
            rrf_k,
            fusion_prefix_width,
            graph_timeout,
        }
    }

    /// The six-step hybrid search algorithm:
    /// 1. embed the query
    /// 2. fetch `vector_top_k` vector hits
    /// 3. drop vector hits below `min_vector_score`
    /// 4. probe keyword index health; if healthy and `use_keyword`, fetch
    ///    `keyword_limit` keyword hits
    /// 5. fuse both lists with Reciprocal Rank Fusion
    /// 6. if the keyword index was unavailable, return the (filtered) vector
    ///    list unchanged rather than erroring; if the vector index also
    ///    fails, return an empty list rather than propagating the error —
    ///    a degraded retrieval beats an aborted query.
    #[instrument(skip(self, query), fields(kb_id = %kb_id))]
    pub async fn hybrid_search(
        &self,
        kb_id: KbId,
        query: &str,
        options: &SearchOptions,
    ) -> Vec<RetrievalResult> {
        let vector_hits = match self.embedder.embed(&[query.to_string()]).await {
            Ok(mut vectors) => {
                let query_vector = vectors.pop().unwrap_or_default();
                self.vector
                    .retrieve(kb_id, &query_vector, options.vector_top_k)
                    .await
            }
            Err(err) => Err(err),
        };

        let vector_results: Vec<RetrievalResult> = match vector_hits {
            Ok(hits) => hits
                .into_iter()
                .filter(|h| h.similarity >= options.min_vector_score)
                .map(|h| RetrievalResult {
                    id: h.id,
                    content: h.content,
                    document_name: h.document_name,
                    score: h.similarity,
                    content_type: ContentType::Document,
                    origin: Origin::Vector,
                    metadata: h.metadata,
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, "vector retrieval failed, continuing with empty vector list");
                Vec::new()
            }
        };

        if !options.use_keyword {
            return vector_results;
        }

        if !self.keyword.health().await {
            debug!("keyword index unhealthy, returning vector-only results");
            return vector_results;
        }

        let keyword_results: Vec<RetrievalResult> = match self
            .keyword
            .search(kb_id, query, options.keyword_limit)
            .await
        {
            Ok(hits) => hits
                .into_iter()
                .map(|h| RetrievalResult {
                    id: h.id,
                    content: h.content,
                    document_name: h.document_name,
                    score: 0.0,
                    content_type: ContentType::Document,
                    origin: Origin::Keyword,
                    metadata: serde_json::json!({}),
                })
                .collect(),
            Err(err) => {
                warn!(error = %err, "keyword search failed, falling back to vector-only results");
                return vector_results;
            }
        };

        reciprocal_rank_fusion(
            &vector_results,
            &keyword_results,
            self.rrf_k,
            self.fusion_prefix_width,
        )
    }

    /// Forward to the graph index bounded by `graph_timeout`. On a health
    /// check failure, a transport error, or a timeout, fall back to
    /// `hybrid_search` and annotate the outcome so the caller can surface
    /// the degradation in the execution trace.
    #[instrument(skip(self, question), fields(kb_id = %kb_id))]
    pub async fn graph_search(
        &self,
        kb_id: KbId,
        question: &str,
        mode: GraphMode,
        fallback_options: &SearchOptions,
    ) -> GraphSearchOutcome {
        if !self.graph.health().await {
            return self
                .fallback_to_hybrid(kb_id, question, fallback_options, "graph index unhealthy")
                .await;
        }

        match tokio::time::timeout(self.graph_timeout, self.graph.query(kb_id, question, mode))
            .await
        {
            Ok(Ok(answer)) => GraphSearchOutcome {
                answer,
                fell_back: false,
                fallback_reason: None,
            },
            Ok(Err(err)) => {
                self.fallback_to_hybrid(
                    kb_id,
                    question,
                    fallback_options,
                    &format!("graph query failed: {err}"),
                )
                .await
            }
            Err(_) => {
                self.fallback_to_hybrid(
                    kb_id,
                    question,
                    fallback_options,
                    "graph query timed out",
                )
                .await
            }
        }
    }

    async fn fallback_to_hybrid(
        &self,
        kb_id: KbId,
        question: &str,
        options: &SearchOptions,
        reason: &str,
    ) -> GraphSearchOutcome {
        warn!(reason, "graph search falling back to hybrid search");
        let results = self.hybrid_search(kb_id, question, options).await;
        let answer = results
            .into_iter()
            .map(|r| r.content)
            .collect::<Vec<_>>()
            .join("\n\n");
        GraphSearchOutcome {
            answer,
            fell_back: true,
            fallback_reason: Some(reason.to_string()),
        }
    }
}

/// Shortcut to build `SearchOptions` from a `ragcore_config::RetrievalConfig`.
impl From<&ragcore_config::RetrievalConfig> for SearchOptions {
    fn from(cfg: &ragcore_config::RetrievalConfig) -> Self {
        Self {
            vector_top_k: cfg.vector_top_k,
            keyword_limit: cfg.keyword_limit,
            use_keyword: cfg.use_keyword,
            min_vector_score: cfg.min_vector_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_storage::{InMemoryKeywordIndex, InMemoryVectorIndex, KeywordDoc, UnavailableGraphIndex, VectorUpsert};

    struct StubEmbedder {
        dims: usize,
    }

    #[async_trait::async_trait]
    impl EmbeddingClient for StubEmbedder {
        fn name(&self) -> &str {
            "stub"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
            Ok(texts.iter().map(|_| vec![1.0; self.dims]).collect())
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    struct FailingEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingClient for FailingEmbedder {
        fn name(&self) -> &str {
            "failing"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
            Err(CoreError::transient("embedder", "provider down"))
        }

        fn dimensions(&self) -> usize {
            0
        }
    }

    fn fabric(
        vector: Arc<dyn VectorIndex>,
        keyword: Arc<dyn KeywordIndex>,
        graph: Arc<dyn GraphIndex>,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> RetrievalFabric {
        RetrievalFabric::new(vector, keyword, graph, embedder, 60, 100, Duration::from_secs(1))
    }

    fn opts() -> SearchOptions {
        SearchOptions {
            vector_top_k: 10,
            keyword_limit: 10,
            use_keyword: true,
            min_vector_score: 0.0,
        }
    }

    #[tokio::test]
    async fn filters_below_min_vector_score() {
        let kb = KbId::new();
        let vector_index = Arc::new(InMemoryVectorIndex::new());
        vector_index
            .upsert(
                kb,
                vec![VectorUpsert {
                    id: "1".to_string(),
                    vector: vec![1.0, 0.0],
                    text: "alpha".to_string(),
                    document_name: "doc".to_string(),
                    metadata: serde_json::json!({}),
                }],
            )
            .await
            .unwrap();
        let keyword_index = Arc::new(InMemoryKeywordIndex::new());
        keyword_index.set_healthy(false);
        let f = fabric(
            vector_index,
            keyword_index,
            Arc::new(UnavailableGraphIndex),
            Arc::new(StubEmbedder { dims: 2 }),
        );
        let mut options = opts();
        options.min_vector_score = 1.1;
        let results = f.hybrid_search(kb, "alpha", &options).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn falls_back_to_vector_only_when_keyword_unhealthy() {
        let kb = KbId::new();
        let vector_index = Arc::new(InMemoryVectorIndex::new());
        vector_index
            .upsert(
                kb,
                vec![VectorUpsert {
                    id: "1".to_string(),
                    vector: vec![1.0, 0.0],
                    text: "alpha content".to_string(),
                    document_name: "doc".to_string(),
                    metadata: serde_json::json!({}),
                }],
            )
            .await
            .unwrap();
        let keyword_index = Arc::new(InMemoryKeywordIndex::new());
        keyword_index.set_healthy(false);
        let f = fabric(
            vector_index,
            keyword_index,
            Arc::new(UnavailableGraphIndex),
            Arc::new(StubEmbedder { dims: 2 }),
        );
        let results = f.hybrid_search(kb, "alpha", &opts()).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].origin, Origin::Vector));
    }

    #[tokio::test]
    async fn embedder_failure_yields_empty_vector_list_not_error() {
        let kb = KbId::new();
        let keyword_index = Arc::new(InMemoryKeywordIndex::new());
        keyword_index
            .index(
                kb,
                vec![KeywordDoc {
                    id: "1".to_string(),
                    document_id: "d1".to_string(),
                    document_name: "doc".to_string(),
                    content: "alpha content here".to_string(),
                }],
            )
            .await
            .unwrap();
        let f = fabric(
            Arc::new(InMemoryVectorIndex::new()),
            keyword_index,
            Arc::new(UnavailableGraphIndex),
            Arc::new(FailingEmbedder),
        );
        let results = f.hybrid_search(kb, "alpha", &opts()).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].origin, Origin::Keyword));
    }

    #[tokio::test]
    async fn graph_search_falls_back_when_unavailable() {
        let kb = KbId::new();
        let vector_index = Arc::new(InMemoryVectorIndex::new());
        vector_index
            .upsert(
                kb,
                vec![VectorUpsert {
                    id: "1".to_string(),
                    vector: vec![1.0, 0.0],
                    text: "fallback content".to_string(),
                    document_name: "doc".to_string(),
                    metadata: serde_json::json!({}),
                }],
            )
            .await
            .unwrap();
        let f = fabric(
            vector_index,
            Arc::new(InMemoryKeywordIndex::new()),
            Arc::new(UnavailableGraphIndex),
            Arc::new(StubEmbedder { dims: 2 }),
        );
        let outcome = f
            .graph_search(kb, "what connects these", GraphMode::Local, &opts())
            .await;
        assert!(outcome.fell_back);
        assert!(outcome.fallback_reason.is_some());
        assert!(outcome.answer.contains("fallback content"));
    }
}
