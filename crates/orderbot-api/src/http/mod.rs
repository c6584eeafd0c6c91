//! HTTP layer for orderbot.
//!
//! The Messenger webhook at `/webhook`, status endpoints at `/` and
//! `/health`, and a JSON REST API under `/api/v1/` for driving
//! conversations without the messaging platform.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
