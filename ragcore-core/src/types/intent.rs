//! Intent — a closed-set classification of a user query.

use serde::{Deserialize, Serialize};

/// The closed set of query intents. Adding a variant here is a breaking
/// change to every downstream consumer; this set is intentionally small.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentTag {
    Greeting,
    SmallTalk,
    DocumentSummary,
    KnowledgeQuery,
    Comparison,
    DrawDiagram,
    WebSearch,
    Datetime,
    Instruction,
}

impl IntentTag {
    /// Intents that never need the knowledge base, per the closed-set
    /// invariant in the testable properties.
    #[must_use]
    pub const fn implies_no_kb(self) -> bool {
        matches!(self, Self::Greeting | Self::SmallTalk | Self::Datetime)
    }
}

/// The result of intent analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub intent: IntentTag,
    pub needs_knowledge_base: bool,
    pub needs_memory: bool,
    pub keywords: Vec<String>,
    pub suggested_tool: Option<String>,
    /// Confidence in [0, 1].
    pub confidence: f32,
}

impl Intent {
    /// Construct an intent. `needs_knowledge_base` is the analyzer's own
    /// flag (LLM-produced or regex-derived); greeting/small_talk/datetime
    /// are clamped to `false` regardless of what the caller passes, per the
    /// closed-set invariant in the testable properties.
    #[must_use]
    pub fn new(
        intent: IntentTag,
        needs_knowledge_base: bool,
        needs_memory: bool,
        keywords: Vec<String>,
        suggested_tool: Option<String>,
        confidence: f32,
    ) -> Self {
        let needs_knowledge_base = needs_knowledge_base && !intent.implies_no_kb();
        Self {
            intent,
            needs_knowledge_base,
            needs_memory,
            keywords,
            suggested_tool,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// `should_skip_agent`: true only for greeting and small_talk — these
    /// get a direct response with no agent loop and no tool calls.
    #[must_use]
    pub const fn should_skip_agent(&self) -> bool {
        matches!(self.intent, IntentTag::Greeting | IntentTag::SmallTalk)
    }
}
