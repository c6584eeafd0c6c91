//! Secrets resolved from environment variables.
//!
//! Every credential is wrapped in [`SecretString`] as soon as it is read and
//! only exposed when building an outbound request. `Debug` output reports
//! which secrets are present, never their values.

use secrecy::SecretString;

use orderbot_types::llm::ProviderBackend;

pub const PAGE_ACCESS_TOKEN: &str = "PAGE_ACCESS_TOKEN";
pub const VERIFY_TOKEN: &str = "VERIFY_TOKEN";
pub const APP_SECRET: &str = "APP_SECRET";
pub const GOOGLE_SHEET_ID: &str = "GOOGLE_SHEET_ID";
pub const GOOGLE_SHEETS_ACCESS_TOKEN: &str = "GOOGLE_SHEETS_ACCESS_TOKEN";

/// Verify token used for the webhook handshake when `VERIFY_TOKEN` is unset.
pub const DEFAULT_VERIFY_TOKEN: &str = "my_secret_verify_token_12345";

pub struct Secrets {
    pub groq_api_key: Option<SecretString>,
    pub openai_api_key: Option<SecretString>,
    pub page_access_token: Option<SecretString>,
    pub verify_token: SecretString,
    pub app_secret: Option<SecretString>,
    pub google_sheet_id: Option<String>,
    pub google_sheets_access_token: Option<SecretString>,
}

impl Secrets {
    /// Read every secret from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty or whitespace-only values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secret = |key: &str| read(key).map(SecretString::from);

        Self {
            groq_api_key: secret(ProviderBackend::Groq.api_key_env()),
            openai_api_key: secret(ProviderBackend::OpenAi.api_key_env()),
            page_access_token: secret(PAGE_ACCESS_TOKEN),
            verify_token: SecretString::from(
                read(VERIFY_TOKEN).unwrap_or_else(|| DEFAULT_VERIFY_TOKEN.to_string()),
            ),
            app_secret: secret(APP_SECRET),
            google_sheet_id: read(GOOGLE_SHEET_ID),
            google_sheets_access_token: secret(GOOGLE_SHEETS_ACCESS_TOKEN),
        }
    }

    /// API key for the given chat backend, if set.
    pub fn api_key(&self, backend: ProviderBackend) -> Option<&SecretString> {
        match backend {
            ProviderBackend::Groq => self.groq_api_key.as_ref(),
            ProviderBackend::OpenAi => self.openai_api_key.as_ref(),
        }
    }

    pub fn messenger_configured(&self) -> bool {
        self.page_access_token.is_some()
    }

    pub fn sheets_configured(&self) -> bool {
        self.google_sheet_id.is_some() && self.google_sheets_access_token.is_some()
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("groq_api_key", &self.groq_api_key.is_some())
            .field("openai_api_key", &self.openai_api_key.is_some())
            .field("page_access_token", &self.page_access_token.is_some())
            .field("app_secret", &self.app_secret.is_some())
            .field("google_sheet_id", &self.google_sheet_id.is_some())
            .field(
                "google_sheets_access_token",
                &self.google_sheets_access_token.is_some(),
            )
            .finish_non_exhaustive()
    }
}
