//! ABOUTME: The canonical tool set (catalog), its typed dispatch (registry),
//! ABOUTME: and the per-query execution context they close over.

pub mod catalog;
pub mod context;
pub mod registry;

pub use catalog::{
    DatetimeTool, DeepSearchTool, FetchWebpageTool, GenerateDiagramTool, GraphSearchTool,
    KeywordSearchTool, SearchKnowledgeTool, SummarizeTopicTool, WebSearchTool,
};
pub use context::ToolContext;
pub use registry::{Tool, ToolRegistry, HARD_STOP_OBSERVATION};

use std::sync::Arc;

/// Build the registry over the canonical tool set named in spec.md §4.E,
/// with `max_invalid_calls` shared across every tool's invalid-call streak.
#[must_use]
pub fn build_default_registry(max_invalid_calls: u32) -> ToolRegistry {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(SearchKnowledgeTool),
        Arc::new(DeepSearchTool),
        Arc::new(KeywordSearchTool),
        Arc::new(GraphSearchTool),
        Arc::new(SummarizeTopicTool),
        Arc::new(WebSearchTool),
        Arc::new(FetchWebpageTool),
        Arc::new(DatetimeTool),
        Arc::new(GenerateDiagramTool),
    ];
    ToolRegistry::new(tools, max_invalid_calls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_carries_all_nine_tools() {
        let registry = build_default_registry(3);
        let names: Vec<String> = registry.catalog().into_iter().map(|(n, _)| n).collect();
        for expected in [
            "search_knowledge",
            "deep_search",
            "keyword_search",
            "graph_search",
            "summarize_topic",
            "web_search",
            "fetch_webpage",
            "get_current_datetime",
            "generate_diagram",
        ] {
            assert!(names.contains(&expected.to_string()), "missing tool: {expected}");
        }
        assert_eq!(names.len(), 9);
    }
}
