use thiserror::Error;

/// Errors raised while assembling the application from configuration.
///
/// These are startup failures: a capability that hits one is unavailable
/// for the lifetime of the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors from persisting an order to the external sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("order sink not configured: {0}")]
    NotConfigured(String),

    #[error("sink request failed: {0}")]
    Request(String),

    #[error("sink rejected the order (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Errors from delivering a message back to the user.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery client not configured: {0}")]
    NotConfigured(String),

    #[error("delivery request failed: {0}")]
    Request(String),

    #[error("platform rejected the message (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },
}
