//! Configuration loading and provider credential resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `ROCKID_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/rockid/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! Provider API keys are resolved once, here, and handed to the adapters as
//! plain values. Adapters never read the process environment themselves.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "ROCKID_CONFIG";

/// Default HTTP port for rockid-ai
pub const DEFAULT_PORT: u16 = 5780;

/// Default request body limit (base64 images are large)
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Top-level TOML configuration
///
/// Every section is optional; missing sections and keys take the compiled
/// defaults. A missing `providers` array yields the three default providers,
/// while an explicit `providers = []` disables them all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Provider id used for the conversational pass-through
    pub chat_provider: Option<String>,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub dispatch: DispatchConfig,
    pub aggregation: AggregationConfig,
    pub providers: Vec<ProviderConfig>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            chat_provider: None,
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            dispatch: DispatchConfig::default(),
            aggregation: AggregationConfig::default(),
            providers: default_providers(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body (base64 images are large)
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Logging configuration
///
/// `level` is an `EnvFilter` directive string; `RUST_LOG` overrides it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "rockid_ai=info,tower_http=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Per-provider timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Consensus tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Added to the mean provider confidence when merging
    pub confidence_boost: u8,
    /// Upper bound of a merged confidence (must stay below 100)
    pub confidence_ceiling: u8,
    /// Maximum number of composition tags in the merged record
    pub max_attributes: usize,
    /// Confidence assigned to a reply that could not be parsed (25-50)
    pub placeholder_confidence: u8,
    /// Leave `Unknown` categories and placeholder labels out of the vote
    pub ignore_unknown_votes: bool,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            confidence_boost: 5,
            confidence_ceiling: 95,
            max_attributes: 8,
            placeholder_confidence: 30,
            ignore_unknown_votes: false,
        }
    }
}

/// Provider wire format family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Gemini,
    Anthropic,
}

impl ProviderKind {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

/// One `[[providers]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Source id reported in provenance
    pub id: String,
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    /// Environment variable holding the key (defaults per kind)
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub requests_per_minute: Option<u32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_enabled() -> bool {
    true
}

impl ProviderConfig {
    pub fn new(id: impl Into<String>, kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            model: model.into(),
            base_url: None,
            api_key: None,
            api_key_env: None,
            max_tokens: default_max_tokens(),
            requests_per_minute: None,
            enabled: true,
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind.default_base_url())
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind.default_api_key_env())
    }
}

/// The three providers used when the config file names none
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new("openai", ProviderKind::OpenAi, "gpt-4o"),
        ProviderConfig::new("gemini", ProviderKind::Gemini, "gemini-1.5-flash"),
        ProviderConfig::new("anthropic", ProviderKind::Anthropic, "claude-3-5-sonnet-latest"),
    ]
}

impl TomlConfig {
    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        let agg = &self.aggregation;
        if agg.confidence_ceiling == 0 || agg.confidence_ceiling >= 100 {
            return Err(Error::Config(format!(
                "aggregation.confidence_ceiling must be within 1..=99, got {}",
                agg.confidence_ceiling
            )));
        }
        if !(25..=50).contains(&agg.placeholder_confidence) {
            return Err(Error::Config(format!(
                "aggregation.placeholder_confidence must be within 25..=50, got {}",
                agg.placeholder_confidence
            )));
        }
        if agg.max_attributes == 0 {
            return Err(Error::Config(
                "aggregation.max_attributes must be at least 1".to_string(),
            ));
        }
        if self.dispatch.timeout_secs == 0 {
            return Err(Error::Config(
                "dispatch.timeout_secs must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(Error::Config("provider id must not be empty".to_string()));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate provider id: {}",
                    provider.id
                )));
            }
            if provider.requests_per_minute == Some(0) {
                return Err(Error::Config(format!(
                    "provider {}: requests_per_minute must be at least 1",
                    provider.id
                )));
            }
        }

        if let Some(chat) = &self.chat_provider {
            if !seen.contains(chat.as_str()) {
                return Err(Error::Config(format!(
                    "chat_provider '{}' does not name a configured provider",
                    chat
                )));
            }
        }

        Ok(())
    }
}

/// Find the config file to load, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("rockid").join("config.toml"))
        .filter(|p| p.exists())
}

/// Read, parse, and validate a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

/// Configuration plus the file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// `None` when compiled defaults were used
    pub source: Option<PathBuf>,
}

/// Load configuration following the resolution priority
///
/// Falls back to compiled defaults when no file is found. Does not log;
/// callers report `source` once the subscriber is installed.
pub fn load_config(cli_arg: Option<&Path>) -> Result<LoadedConfig> {
    let source = resolve_config_path(cli_arg);
    let config = match &source {
        Some(path) => load_toml_config(path)?,
        None => {
            let config = TomlConfig::default();
            config.validate()?;
            config
        }
    };
    Ok(LoadedConfig { config, source })
}

/// Resolve a provider's API key
///
/// **Priority:** ENV → TOML. Returns `None` when neither holds a usable key.
pub fn resolve_api_key(provider: &ProviderConfig) -> Option<String> {
    let env_name = provider.api_key_env();
    let env_key = std::env::var(env_name).ok().filter(|k| is_valid_key(k));
    let toml_key = provider.api_key.clone().filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            provider = %provider.id,
            "API key found in both {} and TOML config. Using environment (highest priority).",
            env_name
        );
    }

    if let Some(key) = env_key {
        info!(provider = %provider.id, "API key loaded from environment variable {}", env_name);
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!(provider = %provider.id, "API key loaded from TOML config");
        return Some(key);
    }

    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
