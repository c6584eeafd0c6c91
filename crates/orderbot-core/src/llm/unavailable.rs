//! Provider used when no chat backend could be configured.
//!
//! Every call fails immediately with [`LlmError::NotConfigured`] and never
//! touches the network, so the rest of the pipeline keeps answering users
//! with a configuration-error message instead of crashing.

use orderbot_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::provider::LlmProvider;

pub struct UnavailableProvider {
    name: String,
    reason: String,
}

impl UnavailableProvider {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

impl LlmProvider for UnavailableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        ""
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        Err(LlmError::NotConfigured(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderbot_types::llm::ProviderErrorKind;

    #[tokio::test]
    async fn test_unavailable_fails_fast() {
        let provider = UnavailableProvider::new("groq", "GROQ_API_KEY is not set");
        let request = CompletionRequest {
            model: String::new(),
            messages: Vec::new(),
            max_tokens: 1,
            temperature: None,
            top_p: None,
            stream: false,
        };

        let err = provider.complete(&request).await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_)));
        assert_eq!(err.kind(), ProviderErrorKind::Unauthorized);
        assert!(err.to_string().contains("GROQ_API_KEY"));
    }
}
