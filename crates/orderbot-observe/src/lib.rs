//! Observability for orderbot: GenAI span attribute names, and (with the
//! `setup` feature) tracing subscriber initialization.

pub mod genai_attrs;

#[cfg(feature = "setup")]
pub mod tracing_setup;
