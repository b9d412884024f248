//! ABOUTME: Incremental line-by-line tokenizer for the ReAct trace grammar
//! ABOUTME: (`Thought:`/`Action:`/`Action Input:`/`Observation:`/`Answer:`),
//! ABOUTME: per spec.md §4.F. Line-based rather than whole-string regex so a
//! ABOUTME: streaming caller could tokenize incrementally as text arrives.

use crate::mermaid;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerKind {
    Thought,
    Action,
    ActionInput,
    Observation,
    Answer,
}

const MARKERS: &[(&str, MarkerKind)] = &[
    ("Thought:", MarkerKind::Thought),
    ("Action Input:", MarkerKind::ActionInput),
    ("Action:", MarkerKind::Action),
    ("Observation:", MarkerKind::Observation),
    ("Answer:", MarkerKind::Answer),
];

struct Segment {
    kind: MarkerKind,
    body: String,
}

/// A tool invocation as recovered from the trace, before dispatch. `input`
/// is `None` when the strict grammar was unmatched and the fallback
/// "simple Action:" path had to guess a bare call with no input.
#[derive(Debug, Clone)]
pub struct ParsedToolCall {
    pub name: String,
    pub raw_input: Option<String>,
    /// An `Observation:` segment the model hallucinated for this call
    /// before the host ever executed it — the driver ignores these and
    /// always dispatches for real, but they are kept for diagnostics.
    pub hallucinated_observation: Option<String>,
}

/// The result of tokenizing one raw LLM trace.
#[derive(Debug, Clone, Default)]
pub struct ParsedTrace {
    pub thoughts: Vec<String>,
    pub tool_calls: Vec<ParsedToolCall>,
    pub answer: Option<String>,
}

/// Tokenize `raw` line by line into marker segments, merging continuation
/// lines (lines with no marker of their own) into the preceding segment's
/// body.
fn tokenize(raw: &str) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for line in raw.lines() {
        let trimmed = line.trim_start();
        let matched = MARKERS
            .iter()
            .find_map(|(prefix, kind)| trimmed.strip_prefix(prefix).map(|rest| (*kind, rest)));

        match matched {
            Some((kind, rest)) => segments.push(Segment {
                kind,
                body: rest.trim_start().to_string(),
            }),
            None => {
                if let Some(last) = segments.last_mut() {
                    if !last.body.is_empty() {
                        last.body.push('\n');
                    }
                    last.body.push_str(line);
                }
            }
        }
    }
    segments
}

/// Whether a thought segment merely restates an action's input rather than
/// reasoning — these are filtered out of the returned thought list.
fn is_action_input_echo(body: &str) -> bool {
    let lower = body.to_lowercase();
    lower.contains("action input") || (body.trim_start().starts_with('{') && body.trim_end().ends_with('}'))
}

fn strip_wrapping_quotes(text: &str) -> &str {
    let trimmed = text.trim();
    for quote in ["\"\"\"", "'''"] {
        if let Some(inner) = trimmed.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner.trim();
        }
    }
    trimmed
}

/// Strip any ReAct marker lines that leaked into an `Answer:` body — a
/// defensive cleanup for models that keep rambling past the final answer.
fn strip_residual_fragments(text: &str) -> String {
    text.lines()
        .take_while(|line| {
            let trimmed = line.trim_start();
            !MARKERS
                .iter()
                .any(|(prefix, kind)| *kind != MarkerKind::Answer && trimmed.starts_with(prefix))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Tokenize a raw ReAct trace into thoughts, tool calls, and a final
/// answer, per spec.md §4.F's parsing rules.
///
/// Mermaid content (tagged or bare) is detected across the *whole* raw
/// trace and takes priority over any `Answer:` marker, since the model
/// sometimes emits the diagram directly without wrapping it in the
/// `Answer:` convention.
#[must_use]
pub fn parse_trace(raw: &str) -> ParsedTrace {
    let segments = tokenize(raw);

    let mut thoughts = Vec::new();
    let mut seen_thoughts: HashSet<String> = HashSet::new();
    let mut tool_calls: Vec<ParsedToolCall> = Vec::new();
    let mut last_answer: Option<String> = None;

    let mut i = 0;
    while i < segments.len() {
        match segments[i].kind {
            MarkerKind::Thought => {
                let body = segments[i].body.trim().to_string();
                if !body.is_empty() && !is_action_input_echo(&body) {
                    let key = body.to_lowercase();
                    if seen_thoughts.insert(key) {
                        thoughts.push(body);
                    }
                }
                i += 1;
            }
            MarkerKind::Action => {
                let name = segments[i].body.trim().to_string();
                let mut raw_input = None;
                let mut hallucinated_observation = None;
                let mut j = i + 1;
                if j < segments.len() && segments[j].kind == MarkerKind::ActionInput {
                    raw_input = Some(segments[j].body.trim().to_string());
                    j += 1;
                }
                if j < segments.len() && segments[j].kind == MarkerKind::Observation {
                    hallucinated_observation = Some(segments[j].body.trim().to_string());
                    j += 1;
                }
                if !name.is_empty() {
                    tool_calls.push(ParsedToolCall {
                        name,
                        raw_input,
                        hallucinated_observation,
                    });
                }
                i = j;
            }
            MarkerKind::ActionInput | MarkerKind::Observation => {
                // Orphaned input/observation with no preceding Action segment
                // this loop recognized; the fallback path below handles
                // the degenerate "simple Action:" case separately.
                i += 1;
            }
            MarkerKind::Answer => {
                let cleaned = strip_residual_fragments(&segments[i].body);
                last_answer = Some(strip_wrapping_quotes(&cleaned).to_string());
                i += 1;
            }
        }
    }

    // Fallback: the strict Action:/Action Input: pairing above found no
    // tool calls at all, but the raw text still contains bare "Action:"
    // lines (e.g. the model never emitted a matching Action Input). Treat
    // each as a no-input call so the driver can still attempt dispatch.
    if tool_calls.is_empty() {
        for segment in &segments {
            if segment.kind == MarkerKind::Action && !segment.body.trim().is_empty() {
                tool_calls.push(ParsedToolCall {
                    name: segment.body.trim().to_string(),
                    raw_input: None,
                    hallucinated_observation: None,
                });
            }
        }
    }

    let diagram_override = mermaid::find_tagged_block(raw).or_else(|| mermaid::normalize(raw));
    let answer = diagram_override.or(last_answer);

    ParsedTrace {
        thoughts,
        tool_calls,
        answer,
    }
}

/// Parse an action's raw input text into a JSON value for schema
/// validation and tool dispatch. Accepts either a JSON object/value or a
/// bare quoted string (`Action Input: "some query"`), per spec.md §4.F.
#[must_use]
pub fn parse_action_input(raw: Option<&str>, primary_field: &str) -> serde_json::Value {
    let Some(raw) = raw else {
        return serde_json::json!({});
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return serde_json::json!({});
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if value.is_object() {
            return value;
        }
        return serde_json::json!({ primary_field: value });
    }
    let unquoted = trimmed.trim_matches('"').trim_matches('\'');
    serde_json::json!({ primary_field: unquoted })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_thought_action_input_observation_answer() {
        let raw = "Thought: I should search\nAction: search_knowledge\nAction Input: {\"query\": \"RRF\"}\nObservation: found nothing yet\nAnswer: RRF is reciprocal rank fusion";
        let trace = parse_trace(raw);
        assert_eq!(trace.thoughts, vec!["I should search".to_string()]);
        assert_eq!(trace.tool_calls.len(), 1);
        assert_eq!(trace.tool_calls[0].name, "search_knowledge");
        assert_eq!(trace.answer.as_deref(), Some("RRF is reciprocal rank fusion"));
    }

    #[test]
    fn falls_back_to_simple_action_without_action_input() {
        let raw = "Action: get_current_datetime\nAnswer: now";
        let trace = parse_trace(raw);
        assert_eq!(trace.tool_calls.len(), 1);
        assert_eq!(trace.tool_calls[0].name, "get_current_datetime");
        assert!(trace.tool_calls[0].raw_input.is_none());
    }

    #[test]
    fn deduplicates_repeated_thoughts() {
        let raw = "Thought: same idea\nThought: same idea\nAnswer: done";
        let trace = parse_trace(raw);
        assert_eq!(trace.thoughts.len(), 1);
    }

    #[test]
    fn filters_thoughts_that_echo_action_input() {
        let raw = "Thought: {\"query\": \"x\"}\nAnswer: ok";
        let trace = parse_trace(raw);
        assert!(trace.thoughts.is_empty());
    }

    #[test]
    fn tagged_mermaid_block_wins_over_answer_marker() {
        let raw = "Answer: see below\n[MERMAID_DIAGRAM]\nflowchart TD\nA-->B\n[/MERMAID_DIAGRAM]";
        let trace = parse_trace(raw);
        let answer = trace.answer.unwrap();
        assert!(answer.starts_with(mermaid::OPEN_TAG));
        assert!(answer.ends_with(mermaid::CLOSE_TAG));
    }

    #[test]
    fn strips_triple_quotes_from_answer() {
        let raw = "Answer: \"\"\"The answer is 42.\"\"\"";
        let trace = parse_trace(raw);
        assert_eq!(trace.answer.as_deref(), Some("The answer is 42."));
    }

    #[test]
    fn strips_residual_fragments_after_answer() {
        let raw = "Answer: the real answer\nThought: oops I kept going";
        let trace = parse_trace(raw);
        assert_eq!(trace.answer.as_deref(), Some("the real answer"));
    }

    #[test]
    fn no_answer_marker_yields_none() {
        let raw = "Thought: still thinking\nAction: search_knowledge\nAction Input: {\"query\": \"x\"}";
        let trace = parse_trace(raw);
        assert!(trace.answer.is_none());
    }

    #[test]
    fn action_input_parses_bare_quoted_string() {
        let value = parse_action_input(Some("\"reciprocal rank fusion\""), "query");
        assert_eq!(value["query"], "reciprocal rank fusion");
    }

    #[test]
    fn action_input_parses_json_object_directly() {
        let value = parse_action_input(Some("{\"query\": \"x\", \"mode\": \"local\"}"), "query");
        assert_eq!(value["query"], "x");
        assert_eq!(value["mode"], "local");
    }

    #[test]
    fn action_input_missing_defaults_to_empty_object() {
        let value = parse_action_input(None, "query");
        assert_eq!(value, serde_json::json!({}));
    }
}
