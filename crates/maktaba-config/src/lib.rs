#![deny(unsafe_code)]

//! Configuration loading and validation for Maktaba.
//!
//! Loads TOML configuration files and validates them against expected
//! ranges. [`AppConfig`] is the central configuration structure; every
//! section has defaults, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Completion service configuration.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Context budget limits.
    #[serde(default)]
    pub budget: BudgetConfig,

    /// User store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote completion service configuration.
///
/// The service must speak the OpenAI chat-completions format and accept a
/// `search_settings.include_domains` restriction.
///
/// ## TOML Example
///
/// ```toml
/// [llm]
/// base_url = "https://api.groq.com/openai/v1/chat/completions"
/// model = "compound-beta-mini"
/// api_key_env = "GROQ_API_KEY"
/// include_domain = "shamilaurdu.com"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Full URL of the chat completions endpoint.
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Environment variable holding the API key. Read once at startup.
    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// The single hostname the service may draw supporting material from.
    #[serde(default = "default_llm_include_domain")]
    pub include_domain: String,

    /// Whole-request timeout in seconds (0 = no timeout).
    #[serde(default = "default_llm_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Optional file whose contents replace the built-in system prompt.
    #[serde(default)]
    pub system_prompt_file: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key_env: default_llm_api_key_env(),
            include_domain: default_llm_include_domain(),
            request_timeout_secs: default_llm_request_timeout_secs(),
            system_prompt_file: None,
        }
    }
}

fn default_llm_base_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_llm_model() -> String {
    "compound-beta-mini".to_string()
}

fn default_llm_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_llm_include_domain() -> String {
    "shamilaurdu.com".to_string()
}

fn default_llm_request_timeout_secs() -> u64 {
    120
}

/// Token budget limits, measured with the whitespace token estimator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum combined estimate of history plus the new query.
    #[serde(default = "default_budget_ceiling")]
    pub ceiling: usize,

    /// Maximum estimate of a single query on its own.
    #[serde(default = "default_budget_per_request_ceiling")]
    pub per_request_ceiling: usize,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            ceiling: default_budget_ceiling(),
            per_request_ceiling: default_budget_per_request_ceiling(),
        }
    }
}

fn default_budget_ceiling() -> usize {
    1500
}

fn default_budget_per_request_ceiling() -> usize {
    300
}

/// User store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database holding user records.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("user.db")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.budget.per_request_ceiling == 0 {
            return Err(ConfigError::Validation(
                "budget.per_request_ceiling must be at least 1".to_string(),
            ));
        }
        if self.budget.ceiling < self.budget.per_request_ceiling {
            return Err(ConfigError::Validation(format!(
                "budget.ceiling ({}) must not be smaller than budget.per_request_ceiling ({})",
                self.budget.ceiling, self.budget.per_request_ceiling
            )));
        }

        if self.llm.model.is_empty() {
            return Err(ConfigError::Validation(
                "llm.model must not be empty".to_string(),
            ));
        }
        if self.llm.api_key_env.is_empty() {
            return Err(ConfigError::Validation(
                "llm.api_key_env must not be empty".to_string(),
            ));
        }
        if !self.llm.base_url.starts_with("http://") && !self.llm.base_url.starts_with("https://")
        {
            return Err(ConfigError::Validation(format!(
                "llm.base_url must be an http(s) URL, got {:?}",
                self.llm.base_url
            )));
        }
        let domain = &self.llm.include_domain;
        if domain.is_empty()
            || domain.contains("://")
            || domain.contains('/')
            || domain.chars().any(char::is_whitespace)
        {
            return Err(ConfigError::Validation(format!(
                "llm.include_domain must be a bare hostname, got {domain:?}"
            )));
        }

        if self.store.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "store.path must not be empty".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.budget.ceiling, 1500);
        assert_eq!(config.budget.per_request_ceiling, 300);
        assert_eq!(config.llm.model, "compound-beta-mini");
        assert_eq!(config.llm.include_domain, "shamilaurdu.com");
        assert_eq!(config.llm.api_key_env, "GROQ_API_KEY");
        assert_eq!(config.store.path, PathBuf::from("user.db"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.budget.ceiling, 1500);
        assert!(config.llm.system_prompt_file.is_none());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [llm]
            base_url = "http://localhost:8080/v1/chat/completions"
            model = "compound-beta"
            api_key_env = "MAKTABA_KEY"
            include_domain = "example.org"
            request_timeout_secs = 30
            system_prompt_file = "prompt.txt"

            [budget]
            ceiling = 2000
            per_request_ceiling = 400

            [store]
            path = "/var/lib/maktaba/users.db"

            [logging]
            level = "debug"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(
            config.llm.base_url,
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(config.llm.model, "compound-beta");
        assert_eq!(config.llm.api_key_env, "MAKTABA_KEY");
        assert_eq!(config.llm.include_domain, "example.org");
        assert_eq!(config.llm.request_timeout_secs, 30);
        assert_eq!(
            config.llm.system_prompt_file,
            Some(PathBuf::from("prompt.txt"))
        );
        assert_eq!(config.budget.ceiling, 2000);
        assert_eq!(config.budget.per_request_ceiling, 400);
        assert_eq!(config.store.path, PathBuf::from("/var/lib/maktaba/users.db"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_zero_per_request_ceiling() {
        let toml = r#"
            [budget]
            per_request_ceiling = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_ceiling_below_per_request() {
        let toml = r#"
            [budget]
            ceiling = 100
            per_request_ceiling = 300
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_validation_rejects_empty_model() {
        let toml = r#"
            [llm]
            model = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_api_key_env() {
        let toml = r#"
            [llm]
            api_key_env = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_non_http_base_url() {
        let toml = r#"
            [llm]
            base_url = "ftp://example.org/chat"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_domain_with_scheme_or_path() {
        for domain in ["https://shamilaurdu.com", "shamilaurdu.com/books", "", "a b"] {
            let toml = format!("[llm]\ninclude_domain = {domain:?}\n");
            assert!(
                AppConfig::parse(&toml).is_err(),
                "domain {domain:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_validation_rejects_empty_store_path() {
        let toml = r#"
            [store]
            path = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let toml = r#"
            [logging]
            level = "loud"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = AppConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed = AppConfig::parse(&rendered).unwrap();
        assert_eq!(parsed.llm.base_url, config.llm.base_url);
        assert_eq!(parsed.budget.ceiling, config.budget.ceiling);
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("maktaba.toml");
        tokio::fs::write(&path, b"[budget]\nceiling = 900\nper_request_ceiling = 90\n")
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.budget.ceiling, 900);
        assert_eq!(config.budget.per_request_ceiling, 90);
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/file.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[")
            .await
            .unwrap();

        let result = AppConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // ── Error display ─────────────────────────────────────────────────

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
