//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MAILSIFT_CONFIG` (environment variable)
//! 2. `~/.config/mailsift/config.toml` (Linux)
//!    `~/Library/Application Support/mailsift/config.toml` (macOS)
//!    `%APPDATA%\mailsift\config.toml` (Windows)
//! 3. Built-in defaults
//!
//! Command-line flags override anything set here.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::gmail::DEFAULT_BASE_URL;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Mail API connection settings.
    pub api: ApiConfig,
    /// Default result limits.
    pub fetch: FetchConfig,
    /// Export defaults.
    pub export: ExportConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
}

/// Mail API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API root for the authenticated mailbox.
    pub base_url: String,
    /// Token file; defaults to `token.json` next to the config file.
    pub token_file: Option<PathBuf>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Default result limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Messages fetched by `list-emails` when `-n` is not given.
    pub list_max_results: u32,
    /// Messages fetched by the filter and export commands when `-n` is not given.
    pub export_max_results: u32,
}

/// Export defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory for `.eml` files.
    pub output_dir: PathBuf,
    /// Path of the aggregated HTML document.
    pub html_file: PathBuf,
    /// Order the HTML export newest first.
    pub newest_first: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_file: None,
            timeout_secs: 30,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            list_max_results: 10,
            export_max_results: 50,
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("downloads"),
            html_file: PathBuf::from("emails.html"),
            newest_first: false,
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MAILSIFT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mailsift").join("config.toml"))
}

/// Return the token file path, honoring the config override.
pub fn token_file_path(config: &Config) -> PathBuf {
    if let Some(ref path) = config.api.token_file {
        return path.clone();
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsift")
        .join("token.json")
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailsift")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api.timeout(), Duration::from_secs(30));
        assert_eq!(cfg.fetch.list_max_results, 10);
        assert_eq!(cfg.fetch.export_max_results, 50);
        assert_eq!(cfg.export.output_dir, PathBuf::from("downloads"));
        assert_eq!(cfg.export.html_file, PathBuf::from("emails.html"));
        assert!(!cfg.export.newest_first);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.api.base_url, cfg.api.base_url);
        assert_eq!(parsed.export.html_file, cfg.export.html_file);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[api]
timeout_secs = 5

[export]
newest_first = true
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.api.timeout_secs, 5);
        assert!(cfg.export.newest_first);
        // Other fields use defaults
        assert_eq!(cfg.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.fetch.export_max_results, 50);
    }

    #[test]
    fn test_token_file_override() {
        let mut cfg = Config::default();
        cfg.api.token_file = Some(PathBuf::from("/tmp/tok.json"));
        assert_eq!(token_file_path(&cfg), PathBuf::from("/tmp/tok.json"));
    }
}
