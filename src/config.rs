// Configuration module for plex-rename
// Handles XDG-compliant config location, TOML configuration file and env overrides

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::{NonMediaPolicy, TransferMode};
use crate::scanner::default_media_extensions;
use crate::services::namer::{DEFAULT_MOVIE_TEMPLATE, DEFAULT_TV_TEMPLATE};

const APP_NAME: &str = "plex-rename";
const CONFIG_FILENAME: &str = "config.toml";

/// TOML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Metadata provider configuration
    pub metadata: MetadataConfig,

    /// Name templates
    pub naming: NamingConfig,

    /// Transfer defaults
    pub transfer: TransferConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server port (default: 3060)
    pub port: u16,

    /// Bind address (default: 0.0.0.0)
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3060,
            bind_address: "0.0.0.0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// TMDB API key (enables TMDB)
    pub tmdb_api_key: Option<String>,

    /// Language for TMDB titles (default: zh-CN)
    pub tmdb_language: String,

    /// Douban cookie (enables Douban)
    pub douban_cookie: Option<String>,

    /// Providers in the order they are tried
    pub provider_priority: Vec<String>,

    /// Minimum score in [0, 1] for a candidate to be accepted
    pub min_confidence: f64,

    /// Per-request timeout for provider calls
    pub request_timeout_secs: u64,

    /// Look up episode titles for `{episode_title}` (one extra request per episode)
    pub fetch_episode_titles: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            tmdb_language: "zh-CN".to_string(),
            douban_cookie: None,
            provider_priority: vec!["tmdb".to_string(), "douban".to_string()],
            min_confidence: 0.6,
            request_timeout_secs: 10,
            fetch_episode_titles: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub movie_template: String,
    pub tv_template: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            movie_template: DEFAULT_MOVIE_TEMPLATE.to_string(),
            tv_template: DEFAULT_TV_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Mode used when a request does not name one (default: hardlink)
    pub default_mode: TransferMode,

    /// Replace existing destinations (default: false)
    pub overwrite: bool,

    /// Non-media files in recursive transfers: "skip" or "copy"
    pub non_media: NonMediaPolicy,

    /// Media file extensions (lowercase, without dots)
    pub media_extensions: Vec<String>,

    /// Transfer unidentified media under their original name (default: false)
    pub transfer_unresolved: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            default_mode: TransferMode::Hardlink,
            overwrite: false,
            non_media: NonMediaPolicy::Skip,
            media_extensions: default_media_extensions(),
            transfer_unresolved: false,
        }
    }
}

/// Application configuration - combines TOML file with environment overrides
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory the config file was looked up in
    pub config_dir: PathBuf,
    pub server: ServerConfig,
    pub metadata: MetadataConfig,
    pub naming: NamingConfig,
    pub transfer: TransferConfig,
}

impl AppConfig {
    /// Load configuration from TOML file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. TOML config file (`config_file`, or config.toml in the config dir)
    /// 3. Default values
    pub fn load(config_file: Option<&Path>) -> Self {
        let (config_dir, config_path) = match config_file {
            Some(path) => (
                path.parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
                path.to_path_buf(),
            ),
            None => {
                let dir = Self::find_config_dir();
                let path = dir.join(CONFIG_FILENAME);
                (dir, path)
            }
        };

        let file = Self::load_config_file(&config_path);
        Self::build_with(config_dir, file, |key| std::env::var(key).ok())
    }

    /// Find the config directory (for locating config.toml)
    fn find_config_dir() -> PathBuf {
        if let Ok(path) = std::env::var("PLEX_RENAME_CONFIG_DIR") {
            return PathBuf::from(path);
        }

        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_NAME);
        }

        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    }

    /// Load and parse the TOML config file
    fn load_config_file(config_path: &Path) -> ConfigFile {
        if !config_path.exists() {
            tracing::debug!(
                "No config file found at {}, using defaults",
                config_path.display()
            );
            return ConfigFile::default();
        }

        match std::fs::read_to_string(config_path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", config_path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to parse config file {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    );
                    ConfigFile::default()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Failed to read config file {}: {}. Using defaults.",
                    config_path.display(),
                    e
                );
                ConfigFile::default()
            }
        }
    }

    /// Build configuration from a config file with overrides from `env`
    fn build_with(
        config_dir: PathBuf,
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let env_bool = |key: &str| env(key).map(|v| v.eq_ignore_ascii_case("true") || v == "1");

        let mut server = file.server;
        if let Some(port) = env("PLEX_RENAME_PORT").and_then(|p| p.parse().ok()) {
            server.port = port;
        }
        if let Some(addr) = env("PLEX_RENAME_BIND_ADDRESS") {
            server.bind_address = addr;
        }

        let mut metadata = file.metadata;
        metadata.tmdb_api_key = env("TMDB_API_KEY")
            .or(metadata.tmdb_api_key)
            .filter(|k| !k.trim().is_empty());
        if let Some(lang) = env("TMDB_LANGUAGE") {
            metadata.tmdb_language = lang;
        }
        metadata.douban_cookie = env("DOUBAN_COOKIE")
            .or(metadata.douban_cookie)
            .filter(|c| !c.trim().is_empty());
        if let Some(min) = env("MIN_CONFIDENCE").and_then(|v| v.parse::<f64>().ok()) {
            metadata.min_confidence = min;
        }
        metadata.min_confidence = metadata.min_confidence.clamp(0.0, 1.0);
        if let Some(fetch) = env_bool("FETCH_EPISODE_TITLES") {
            metadata.fetch_episode_titles = fetch;
        }

        let mut naming = file.naming;
        if let Some(tpl) = env("RENAME_MOVIE_FORMAT") {
            naming.movie_template = tpl;
        }
        if let Some(tpl) = env("RENAME_TV_FORMAT") {
            naming.tv_template = tpl;
        }

        let mut transfer = file.transfer;
        if let Some(mode) = env("TRANSFER_MODE") {
            match mode.parse::<TransferMode>() {
                Ok(mode) => transfer.default_mode = mode,
                Err(e) => tracing::warn!("Ignoring TRANSFER_MODE: {}", e),
            }
        }
        if let Some(exts) = env("PR_EXTENSIONS") {
            transfer.media_extensions = exts.split(',').map(str::to_string).collect();
        }
        transfer.media_extensions = normalize_extensions(&transfer.media_extensions);

        Self {
            config_dir,
            server,
            metadata,
            naming,
            transfer,
        }
    }

    /// Log configuration status
    pub fn log_config(&self) {
        tracing::info!("Configuration directory: {}", self.config_dir.display());

        let mut providers = Vec::new();
        for name in &self.metadata.provider_priority {
            let enabled = match name.as_str() {
                "tmdb" => self.metadata.tmdb_api_key.is_some(),
                "douban" => self.metadata.douban_cookie.is_some(),
                _ => false,
            };
            if enabled {
                providers.push(name.as_str());
            }
        }

        if providers.is_empty() {
            tracing::warn!("No metadata providers configured; files keep their original names");
            tracing::info!("Hint: Add tmdb_api_key to config.toml or set TMDB_API_KEY env var");
        } else {
            tracing::info!("Metadata providers: {}", providers.join(" -> "));
        }
        tracing::debug!(
            "Minimum confidence {:.2}, timeout {}s",
            self.metadata.min_confidence,
            self.metadata.request_timeout_secs
        );

        tracing::info!("Movie template: {}", self.naming.movie_template);
        tracing::info!("TV template: {}", self.naming.tv_template);
        tracing::info!(
            "Default transfer mode: {} (overwrite: {})",
            self.transfer.default_mode,
            self.transfer.overwrite
        );
        tracing::debug!("Media extensions: {}", self.transfer.media_extensions.join(", "));
    }
}

fn normalize_extensions(exts: &[String]) -> Vec<String> {
    exts.iter()
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
