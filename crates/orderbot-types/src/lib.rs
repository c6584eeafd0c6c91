//! Shared domain types for orderbot.
//!
//! Conversation turns, business context, order records, LLM request/response
//! shapes, configuration, and the error types shared across crates.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod order;
