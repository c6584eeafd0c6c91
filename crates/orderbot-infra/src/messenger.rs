//! Messenger Send API client.
//!
//! Implements [`MessageDelivery`] against
//! `POST {graph_api_base}/{version}/me/messages?access_token=...`.
//! Without a page access token every call fails with
//! [`DeliveryError::NotConfigured`] and nothing is sent.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use orderbot_core::ports::MessageDelivery;
use orderbot_types::config::MessengerSettings;
use orderbot_types::error::{ConfigError, DeliveryError};

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<TextMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sender_action: Option<&'static str>,
}

pub struct MessengerClient {
    client: reqwest::Client,
    endpoint: String,
    page_access_token: Option<SecretString>,
}

impl MessengerClient {
    pub fn new(
        settings: &MessengerSettings,
        page_access_token: Option<SecretString>,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/{}/me/messages",
                settings.graph_api_base.trim_end_matches('/'),
                settings.graph_api_version
            ),
            page_access_token,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.page_access_token.is_some()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, body: &SendRequest<'_>) -> Result<(), DeliveryError> {
        let token = self
            .page_access_token
            .as_ref()
            .ok_or_else(|| DeliveryError::NotConfigured("PAGE_ACCESS_TOKEN is not set".into()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("access_token", token.expose_secret())])
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl MessageDelivery for MessengerClient {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), DeliveryError> {
        self.send(&SendRequest {
            recipient: Recipient { id: recipient },
            message: Some(TextMessage { text }),
            sender_action: None,
        })
        .await?;
        tracing::debug!(recipient, "Message delivered");
        Ok(())
    }

    async fn send_typing(&self, recipient: &str) -> Result<(), DeliveryError> {
        self.send(&SendRequest {
            recipient: Recipient { id: recipient },
            message: None,
            sender_action: Some("typing_on"),
        })
        .await
    }
}
