//! Application configuration for RivalScope.
//!
//! User config lives at `~/.rivalscope/rivalscope.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RivalScopeError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rivalscope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rivalscope";

// ---------------------------------------------------------------------------
// Config structs (matching rivalscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenAI settings.
    #[serde(default)]
    pub openai: OpenAiConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Title used when a request does not name its analysis.
    #[serde(default = "default_title")]
    pub title: String,

    /// Maximum in-flight site fetches.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: u32,

    /// Per-site fetch timeout.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Per-call timeout for enrichment and synthesis.
    #[serde(default = "default_enrich_timeout")]
    pub enrich_timeout_secs: u64,

    /// Allow fetching loopback/private addresses (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            fetch_concurrency: default_fetch_concurrency(),
            fetch_timeout_secs: default_fetch_timeout(),
            enrich_timeout_secs: default_enrich_timeout(),
            allow_private_hosts: false,
        }
    }
}

fn default_title() -> String {
    crate::types::DEFAULT_ANALYSIS_TITLE.into()
}
fn default_fetch_concurrency() -> u32 {
    8
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_enrich_timeout() -> u64 {
    60
}

/// `[openai]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat model used for enrichment and synthesis.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL (override for proxies or compatible providers).
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration, merged from config file and CLI flags.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Maximum concurrent HTTP requests.
    pub concurrency: u32,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Whether loopback/private hosts may be fetched.
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.fetch_concurrency,
            timeout_secs: config.defaults.fetch_timeout_secs,
            allow_private_hosts: config.defaults.allow_private_hosts,
        }
    }
}

// ---------------------------------------------------------------------------
// AI availability
// ---------------------------------------------------------------------------

/// Whether the language model credential is present.
///
/// Resolved once per request by the caller and handed to the pipeline, which
/// never reads the environment itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiAvailability {
    /// A non-empty API key was found.
    Configured { api_key: String },
    /// No key; `env_var` names the variable that was checked.
    Unconfigured { env_var: String },
}

impl AiAvailability {
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured { .. })
    }
}

/// Look up the API key named by `config.openai.api_key_env`.
pub fn resolve_api_key(config: &AppConfig) -> AiAvailability {
    let var_name = &config.openai.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => AiAvailability::Configured {
            api_key: val.trim().to_string(),
        },
        _ => {
            tracing::debug!(env_var = %var_name, "API key not set");
            AiAvailability::Unconfigured {
                env_var: var_name.clone(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rivalscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RivalScopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rivalscope/rivalscope.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RivalScopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        RivalScopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RivalScopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RivalScopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RivalScopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("fetch_concurrency"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.fetch_timeout_secs, 30);
        assert_eq!(parsed.openai.model, "gpt-4o");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
title = "Weekly sweep"

[openai]
model = "gpt-4o-mini"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.title, "Weekly sweep");
        assert_eq!(config.defaults.fetch_concurrency, 8);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn fetch_config_from_app_config() {
        let app = AppConfig::default();
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.concurrency, 8);
        assert_eq!(fetch.timeout_secs, 30);
        assert!(!fetch.allow_private_hosts);
    }

    #[test]
    fn missing_api_key_is_unconfigured() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openai.api_key_env = "RS_TEST_NONEXISTENT_KEY_12345".into();
        let availability = resolve_api_key(&config);
        assert!(!availability.is_configured());
        assert_eq!(
            availability,
            AiAvailability::Unconfigured {
                env_var: "RS_TEST_NONEXISTENT_KEY_12345".into()
            }
        );
    }
}
