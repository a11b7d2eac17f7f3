//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::Path;

use maktaba_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .base_url(&server.uri())
///     .ceiling(50)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn base_url(mut self, url: &str) -> Self {
        self.config.llm.base_url = url.to_string();
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.config.llm.model = model.to_string();
        self
    }

    pub fn include_domain(mut self, domain: &str) -> Self {
        self.config.llm.include_domain = domain.to_string();
        self
    }

    pub fn system_prompt_file(mut self, path: &Path) -> Self {
        self.config.llm.system_prompt_file = Some(path.to_path_buf());
        self
    }

    pub fn ceiling(mut self, tokens: usize) -> Self {
        self.config.budget.ceiling = tokens;
        self
    }

    pub fn per_request_ceiling(mut self, tokens: usize) -> Self {
        self.config.budget.per_request_ceiling = tokens;
        self
    }

    pub fn store_path(mut self, path: &Path) -> Self {
        self.config.store.path = path.to_path_buf();
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
