//! ABOUTME: Intent Analyzer — LLM-JSON-first query classification with a
//! ABOUTME: regex-heuristic fallback, per spec.md §4.D.

pub mod analyzer;
pub mod regex_fallback;

pub use analyzer::IntentAnalyzer;
