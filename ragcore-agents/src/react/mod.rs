//! ABOUTME: The ReAct agent loop (component F of spec.md §4): trace
//! ABOUTME: grammar parsing, enriched-message assembly, and the driving
//! ABOUTME: state machine.

pub mod driver;
pub mod enrich;
pub mod parser;

pub use driver::{AgentLoop, LoopOutcome, LoopState};
pub use enrich::build_enriched_message;
