//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration, data, and cache, plus the
//! JSON settings file holding scan defaults. CLI flags override settings;
//! settings override the built-in defaults.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{HostPolicy, RecordType};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Global paths singleton.
static PATHS: OnceLock<Paths> = OnceLock::new();

/// Application directory paths following the XDG Base Directory
/// Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/dnsweep)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/dnsweep)
    pub data_dir: PathBuf,
    /// Cache directory (~/.cache/dnsweep)
    pub cache_dir: PathBuf,
}

impl Paths {
    /// Get the global paths instance.
    pub fn get() -> &'static Paths {
        PATHS.get_or_init(|| Self::new().expect("Failed to initialize paths"))
    }

    /// Initialize paths using XDG directories.
    fn new() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "dnsweep", "dnsweep").ok_or(ConfigError::DirectoryNotFound)?;

        let paths = Self {
            config_dir: project.config_dir().to_path_buf(),
            data_dir: project.data_dir().to_path_buf(),
            cache_dir: project.cache_dir().to_path_buf(),
        };

        // Ensure directories exist
        fs::create_dir_all(&paths.config_dir).map_err(|e| ConfigError::WriteFailed {
            path: paths.config_dir.clone(),
            reason: e.to_string(),
        })?;
        fs::create_dir_all(&paths.data_dir).map_err(|e| ConfigError::WriteFailed {
            path: paths.data_dir.clone(),
            reason: e.to_string(),
        })?;
        fs::create_dir_all(&paths.cache_dir).map_err(|e| ConfigError::WriteFailed {
            path: paths.cache_dir.clone(),
            reason: e.to_string(),
        })?;

        Ok(paths)
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Get the path to the saved-scans directory.
    pub fn scans_dir(&self) -> PathBuf {
        self.data_dir.join("scans")
    }

    /// Get the path to the live result-stream directory.
    pub fn live_dir(&self) -> PathBuf {
        self.data_dir.join("live")
    }
}

/// Application-wide defaults, overridable per invocation by CLI flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default concurrency level.
    pub default_concurrency: usize,
    /// Default per-probe timeout in milliseconds.
    pub default_timeout_ms: u64,
    /// Default record type to query.
    pub default_record_type: RecordType,
    /// Default host policy for range enumeration.
    pub default_host_policy: HostPolicy,
    /// Default output format.
    pub default_output_format: String,
    /// Maximum probe rate (probes per second), 0 for unlimited.
    pub default_rate_limit: u32,
    /// Auto-save scan results.
    pub auto_save_scans: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_concurrency: 100,
            default_timeout_ms: 2000,
            default_record_type: RecordType::A,
            default_host_policy: HostPolicy::SkipZeroOctet,
            default_output_format: "plain".to_string(),
            default_rate_limit: 0,
            auto_save_scans: true,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location.
    pub fn load() -> ConfigResult<Self> {
        let paths = Paths::get();
        let file = paths.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&file).map_err(|e| ConfigError::ReadFailed {
            path: file.clone(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))
    }

    /// Save settings to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = Paths::get();
        let file = paths.settings_file();

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&file, content).map_err(|e| ConfigError::WriteFailed {
            path: file,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.default_concurrency, 100);
        assert_eq!(settings.default_timeout_ms, 2000);
        assert_eq!(settings.default_record_type, RecordType::A);
        assert!(settings.auto_save_scans);
    }

    #[test]
    fn test_settings_serialization() {
        let settings = AppSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: AppSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.default_concurrency, settings.default_concurrency);
        assert_eq!(parsed.default_host_policy, settings.default_host_policy);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let parsed: AppSettings = serde_json::from_str(r#"{"default_concurrency": 50}"#).unwrap();
        assert_eq!(parsed.default_concurrency, 50);
        assert_eq!(parsed.default_timeout_ms, 2000);
    }
}
