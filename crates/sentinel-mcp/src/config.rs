//! Configuration management for the Sentinel MCP server

use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Reasoning provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EscalationConfig {
    /// Provider API key. Empty means no provider is configured.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Base URL of an OpenAI-compatible chat completions API
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Upper bound on the provider call, in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl EscalationConfig {
    /// Whether a live provider should be used
    pub fn provider_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_api_key() -> String {
    std::env::var("OPENAI_API_KEY").unwrap_or_default()
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f64 {
    0.1
}

fn default_timeout() -> u64 {
    30
}

/// Verdict cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Maximum cache entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_capacity: default_max_capacity(),
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

fn default_max_capacity() -> u64 {
    1000
}

fn default_ttl() -> u64 {
    300 // 5 minutes
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            // Start with defaults
            .set_default("escalation.api_key", default_api_key())?
            .set_default("escalation.api_url", default_api_url())?
            .set_default("escalation.model", default_model())?
            .set_default("escalation.temperature", default_temperature())?
            .set_default("escalation.timeout_seconds", default_timeout() as i64)?
            .set_default("cache.enabled", default_cache_enabled())?
            .set_default("cache.max_capacity", default_max_capacity() as i64)?
            .set_default("cache.ttl_seconds", default_ttl() as i64)?
            // Load from config files if present
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Override with environment variables (SENTINEL__ESCALATION__API_KEY, etc.)
            .add_source(
                config::Environment::with_prefix("SENTINEL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
