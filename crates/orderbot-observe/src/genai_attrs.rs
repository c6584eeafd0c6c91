//! OpenTelemetry GenAI Semantic Convention attribute names.
//!
//! Provider calls run in a `gen_ai.complete` span. `tracing` needs literal
//! field names when a span is declared, so only the fields filled in after
//! the response arrives (via `Span::record`) have constants here.

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The finish reason reported by the provider (e.g., "stop", "length").
pub const GEN_AI_RESPONSE_FINISH_REASONS: &str = "gen_ai.response.finish_reasons";

/// The unique response ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

// --- Operation name values ---

/// Standard chat completion operation.
pub const OP_CHAT: &str = "chat";

// --- Provider name values ---

pub const PROVIDER_GROQ: &str = "groq";
pub const PROVIDER_OPENAI: &str = "openai";
