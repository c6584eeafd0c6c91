//! Message-processing and order-extraction pipeline for orderbot.
//!
//! This crate defines the conversation store, prompt construction, the LLM
//! provider trait, order extraction, and the orchestrator that ties them
//! together. It also defines the "ports" (delivery and sink traits) that the
//! infrastructure layer implements. It depends only on `orderbot-types` and
//! the span attribute names in `orderbot-observe` -- never on
//! `orderbot-infra` or any HTTP crate.

pub mod conversation;
pub mod extract;
pub mod llm;
pub mod orchestrator;
pub mod ports;
pub mod prompt;
