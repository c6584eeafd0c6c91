//! LLM provider abstractions for orderbot.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for runtime backend selection
//! - `UnavailableProvider`: stand-in used when credentials are missing

pub mod box_provider;
pub mod provider;
pub mod unavailable;
