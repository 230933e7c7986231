// Layered configuration: defaults, optional config.toml, then APP__* environment variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server_address: String,
    // JSON file holding brands and models (see data/catalog.json)
    pub catalog_path: String,
    pub llm: LlmSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub enabled: bool,
    /// "openai" or "ollama"
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Hard limit for a single completion, after which the caller falls back
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub autocomplete_limit: usize,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 8,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
            autocomplete_limit: 10,
            cache_size: 256,
            cache_ttl_secs: 60,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1:3000".to_string(),
            catalog_path: "data/catalog.json".to_string(),
            llm: LlmSettings::default(),
            search: SearchSettings::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self> {
        dotenv::dotenv().ok(); // Load .env file if present

        let defaults = Settings::default();
        let builder = Config::builder()
            .set_default("server_address", defaults.server_address)?
            .set_default("catalog_path", defaults.catalog_path)?
            .set_default("llm.enabled", defaults.llm.enabled)?
            .set_default("llm.provider", defaults.llm.provider)?
            .set_default("llm.base_url", defaults.llm.base_url)?
            .set_default("llm.model", defaults.llm.model)?
            .set_default("llm.timeout_secs", defaults.llm.timeout_secs)?
            .set_default("search.default_page_size", defaults.search.default_page_size as u64)?
            .set_default("search.max_page_size", defaults.search.max_page_size as u64)?
            .set_default("search.autocomplete_limit", defaults.search.autocomplete_limit as u64)?
            .set_default("search.cache_size", defaults.search.cache_size as u64)?
            .set_default("search.cache_ttl_secs", defaults.search.cache_ttl_secs)?
            // Load from a configuration file (e.g., config.toml)
            .add_source(File::with_name("config").required(false))
            // Nested keys use a double underscore, e.g. APP__LLM__API_KEY
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if settings.search.default_page_size == 0
            || settings.search.default_page_size > settings.search.max_page_size
        {
            anyhow::bail!(
                "search.default_page_size must be between 1 and search.max_page_size ({})",
                settings.search.max_page_size
            );
        }
        Ok(settings)
    }
}
