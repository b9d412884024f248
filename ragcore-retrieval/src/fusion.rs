//! ABOUTME: Reciprocal Rank Fusion — combines vector and keyword result
//! ABOUTME: lists into one ranked list without needing comparable scores.

use ragcore_core::types::{Origin, RetrievalResult};
use std::collections::HashMap;

struct Accumulator {
    result: RetrievalResult,
    score: f32,
    from_vector: bool,
    from_keyword: bool,
    insertion_order: usize,
}

/// Fuse `vector_results` and `keyword_results` with Reciprocal Rank Fusion:
/// for each distinct document, keyed by the first `prefix_width` characters
/// of its content, accumulate `1 / (k + rank + 1)` across both lists.
/// `origin` is set to `vector`, `keyword`, or `both` according to which
/// lists contributed. Ties break by original insertion order (vector list
/// first, then keyword list, in their given order) which is deterministic
/// within a single query.
#[must_use]
pub fn reciprocal_rank_fusion(
    vector_results: &[RetrievalResult],
    keyword_results: &[RetrievalResult],
    k: u32,
    prefix_width: usize,
) -> Vec<RetrievalResult> {
    let mut by_key: HashMap<String, Accumulator> = HashMap::new();
    let mut next_order = 0usize;

    for (rank, item) in vector_results.iter().enumerate() {
        let key = item.fusion_key(prefix_width);
        let contribution = 1.0 / (k as f32 + rank as f32 + 1.0);
        by_key
            .entry(key)
            .and_modify(|acc| {
                acc.score += contribution;
                acc.from_vector = true;
            })
            .or_insert_with(|| {
                let order = next_order;
                next_order += 1;
                Accumulator {
                    result: item.clone(),
                    score: contribution,
                    from_vector: true,
                    from_keyword: false,
                    insertion_order: order,
                }
            });
    }

    for (rank, item) in keyword_results.iter().enumerate() {
        let key = item.fusion_key(prefix_width);
        let contribution = 1.0 / (k as f32 + rank as f32 + 1.0);
        by_key
            .entry(key)
            .and_modify(|acc| {
                acc.score += contribution;
                acc.from_keyword = true;
            })
            .or_insert_with(|| {
                let order = next_order;
                next_order += 1;
                Accumulator {
                    result: item.clone(),
                    score: contribution,
                    from_vector: false,
                    from_keyword: true,
                    insertion_order: order,
                }
            });
    }

    let mut fused: Vec<Accumulator> = by_key.into_values().collect();
    fused.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.insertion_order.cmp(&b.insertion_order))
    });

    fused
        .into_iter()
        .map(|acc| {
            let origin = match (acc.from_vector, acc.from_keyword) {
                (true, true) => Origin::Both,
                (true, false) => Origin::Vector,
                (false, true) => Origin::Keyword,
                (false, false) => unreachable!("accumulator must come from at least one list"),
            };
            RetrievalResult {
                score: acc.score,
                origin,
                content_type: acc.result.content_type,
                ..acc.result
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragcore_core::types::ContentType;
    use serde_json::json;

    fn result(id: &str, content: &str) -> RetrievalResult {
        RetrievalResult {
            id: id.to_string(),
            content: content.to_string(),
            document_name: "doc".to_string(),
            score: 0.0,
            content_type: ContentType::Document,
            origin: Origin::Vector,
            metadata: json!({}),
        }
    }

    #[test]
    fn fuses_overlapping_results_as_both() {
        let vector = vec![result("1", "reciprocal rank fusion explained")];
        let keyword = vec![result("2", "reciprocal rank fusion explained")];
        let fused = reciprocal_rank_fusion(&vector, &keyword, 60, 100);
        assert_eq!(fused.len(), 1);
        assert!(matches!(fused[0].origin, Origin::Both));
        let expected = 1.0 / 61.0 + 1.0 / 61.0;
        assert!((fused[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn vector_only_result_keeps_vector_origin() {
        let vector = vec![result("1", "alpha")];
        let keyword: Vec<RetrievalResult> = Vec::new();
        let fused = reciprocal_rank_fusion(&vector, &keyword, 60, 100);
        assert_eq!(fused.len(), 1);
        assert!(matches!(fused[0].origin, Origin::Vector));
    }

    #[test]
    fn sorted_descending_by_fused_score() {
        let vector = vec![result("1", "alpha"), result("2", "beta")];
        let keyword = vec![result("2", "beta")];
        let fused = reciprocal_rank_fusion(&vector, &keyword, 60, 100);
        assert_eq!(fused[0].content, "beta");
        assert!(fused[0].score >= fused[1].score);
    }

    #[test]
    fn empty_lists_fuse_to_empty() {
        let fused = reciprocal_rank_fusion(&[], &[], 60, 100);
        assert!(fused.is_empty());
    }
}
