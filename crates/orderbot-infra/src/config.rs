//! Configuration loader for orderbot.
//!
//! Reads `orderbot.toml` and deserializes it into [`AppConfig`]. Falls back
//! to defaults when the file is missing or malformed, so the service can
//! always start; secrets never live in this file (see [`crate::secret`]).

use std::path::{Path, PathBuf};

use orderbot_types::config::AppConfig;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "orderbot.toml";

/// Resolve the configuration path: an explicit path wins, otherwise
/// `./orderbot.toml`.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load configuration from `path`.
///
/// - If the file does not exist, returns [`AppConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config; absent sections keep their defaults.
pub async fn load_config(path: &Path) -> AppConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file at {}, using defaults", path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => {
            tracing::debug!("Loaded configuration from {}", path.display());
            config
        }
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderbot_types::llm::ProviderBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("orderbot.toml")).await;
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.provider.backend, ProviderBackend::Groq);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("orderbot.toml");
        tokio::fs::write(
            &path,
            r#"
[server]
port = 8080

[provider]
backend = "openai"
temperature = 0.2

[business]
name = "Demo Restaurant"
type = "pizzeria"
"#,
        )
        .await
        .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.provider.backend, ProviderBackend::OpenAi);
        assert_eq!(config.provider.temperature, 0.2);
        assert_eq!(config.provider.max_tokens, 500);
        assert_eq!(config.business.name(), "Demo Restaurant");
        assert_eq!(config.business.kind(), "pizzeria");
        assert_eq!(config.conversation.max_conversations, 10_000);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("orderbot.toml");
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(&path).await;
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.business.name(), "Our Business");
    }

    #[test]
    fn config_path_prefers_explicit() {
        assert_eq!(config_path(None), PathBuf::from("orderbot.toml"));
        assert_eq!(
            config_path(Some(Path::new("/etc/orderbot/prod.toml"))),
            PathBuf::from("/etc/orderbot/prod.toml")
        );
    }
}
