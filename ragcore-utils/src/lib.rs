//! ABOUTME: Shared text and token utilities used by the context engine,
//! ABOUTME: intent analyzer, and adaptive context manager.

pub mod entities;
pub mod tokens;
pub mod truncate;
