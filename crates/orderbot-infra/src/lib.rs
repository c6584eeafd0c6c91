//! Infrastructure implementations for orderbot.
//!
//! Concrete chat backends behind `orderbot-core`'s `LlmProvider`, the
//! Messenger delivery client and Google Sheets order sink behind its ports,
//! webhook verification, and configuration/secret loading.

pub mod config;
pub mod llm;
pub mod messenger;
pub mod secret;
pub mod sheets;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;
