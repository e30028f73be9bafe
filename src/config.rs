//! Run configuration.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (PLEX_ADDRESS, X_PLEX_TOKEN, PLEX_ROOT_FOLDER,
//!    FILE_ENDING_PATTERN, PLEX_EXPORT_TIMEOUT_SECS), including a `.env` file
//!    loaded by the binary
//! 2. Config file (.plex-export/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .plex-export/config.yaml
//!
//! The resolved [`ExportConfig`] is built once at startup and handed to every
//! component by reference.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;

use crate::core::retry::RetryPolicy;
use crate::domain::MediaKind;

pub const ENV_ADDRESS: &str = "PLEX_ADDRESS";
pub const ENV_TOKEN: &str = "X_PLEX_TOKEN";
pub const ENV_ROOT: &str = "PLEX_ROOT_FOLDER";
pub const ENV_TAG: &str = "FILE_ENDING_PATTERN";
pub const ENV_TIMEOUT: &str = "PLEX_EXPORT_TIMEOUT_SECS";

/// Tokens shorter than this are never partially shown
const MIN_PARTIAL_MASK_LEN: usize = 16;

/// Section kinds the exporter walks
pub const SUPPORTED_KINDS: [MediaKind; 2] = [MediaKind::Movie, MediaKind::Show];

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Base address, e.g. http://plex.local:32400
    pub address: Option<String>,
    pub token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportSettings {
    /// Prefix prepended to every library path
    pub root: Option<String>,
    /// Run tag embedded in every filename
    pub tag: Option<String>,
    /// Log a progress line every N items
    pub progress_interval: Option<usize>,
}

/// Resolved, immutable run configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Server address without trailing slash
    pub server_address: String,
    pub auth_token: String,
    /// Export root without trailing separator (may be empty)
    pub export_root: String,
    pub run_tag: String,
    pub supported_kinds: Vec<MediaKind>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub progress_interval: usize,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ExportConfig {
    /// Resolve configuration from an optional config file and an
    /// environment lookup. Environment values win over the file.
    pub fn from_sources<F>(file: Option<(&Path, ConfigFile)>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        let (config_file, file) = match file {
            Some((path, parsed)) => (Some(path.to_path_buf()), parsed),
            None => (None, ConfigFile::default()),
        };

        let server_address = lookup(ENV_ADDRESS)
            .or(file.server.address)
            .with_context(|| format!("{} is not set", ENV_ADDRESS))?
            .trim_end_matches('/')
            .to_string();

        let auth_token = lookup(ENV_TOKEN)
            .or(file.server.token)
            .with_context(|| format!("{} is not set", ENV_TOKEN))?;

        let export_root = lookup(ENV_ROOT)
            .or(file.export.root)
            .with_context(|| format!("{} is not set", ENV_ROOT))?
            .trim_end_matches('/')
            .to_string();

        let run_tag = lookup(ENV_TAG)
            .or(file.export.tag)
            .unwrap_or_else(default_run_tag);

        let timeout_seconds = match lookup(ENV_TIMEOUT) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT, raw))?,
            None => file.server.timeout_seconds.unwrap_or(60),
        };

        Ok(Self {
            server_address,
            auth_token,
            export_root,
            run_tag,
            supported_kinds: SUPPORTED_KINDS.to_vec(),
            retry: file.retry.unwrap_or_default(),
            request_timeout: Duration::from_secs(timeout_seconds),
            progress_interval: file.export.progress_interval.unwrap_or(10).max(1),
            config_file,
        })
    }

    /// Whether sections of this kind are exported
    pub fn supports(&self, kind: MediaKind) -> bool {
        self.supported_kinds.contains(&kind)
    }

    /// Token safe for printing. Short tokens are hidden entirely.
    pub fn masked_token(&self) -> String {
        if self.auth_token.chars().count() < MIN_PARTIAL_MASK_LEN {
            return "****".to_string();
        }
        let visible: String = self.auth_token.chars().take(4).collect();
        format!("{}****", visible)
    }
}

/// Tag used when none is configured: the run's start time
pub fn default_run_tag() -> String {
    Utc::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".plex-export").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Load configuration from all sources
pub fn load_config() -> Result<ExportConfig> {
    let path = find_config_file();
    let file = match &path {
        Some(p) => Some((p.as_path(), load_config_file(p)?)),
        None => None,
    };

    ExportConfig::from_sources(file, |key| std::env::var(key).ok())
}
