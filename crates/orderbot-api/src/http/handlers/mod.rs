//! HTTP request handlers grouped by resource.

pub mod conversations;
pub mod messages;
pub mod status;
pub mod webhook;
