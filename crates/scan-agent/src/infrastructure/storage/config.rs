//! TOML-based configuration persistence for the scan agent.
//!
//! Reads and writes [`AgentConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\IsbnScanAgent\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/isbn-scan-agent/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/IsbnScanAgent/config.toml`
//!
//! # Example (for beginners)
//!
//! ```toml
//! [agent]
//! log_level = "info"
//!
//! [scanner]
//! initial_mode = "focused_field_only"
//! persist_consent = false
//!
//! [timing]
//! keystroke_timeout_ms = 100
//! max_scan_duration_ms = 300
//! ```
//!
//! Every field is optional.  Fields annotated with
//! `#[serde(default = "some_fn")]` take the return value of `some_fn()` when
//! absent, so a first run (no file) and an old file both work.
//!
//! # Consent persistence
//!
//! The user's answer to the background-scanning question is stored only when
//! the deployment sets `persist_consent = true`.  Otherwise consent lasts for
//! one session and `consent_granted` is ignored.

use std::path::{Path, PathBuf};

use scan_core::{TimingConfig, TimingError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::mode_manager::{CaptureMode, ConsentState};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The `[timing]` section is inconsistent.
    #[error("invalid timing configuration: {0}")]
    InvalidTiming(#[from] TimingError),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level agent configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub scanner: ScannerSection,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSection {
    /// `tracing` filter directive: `"error"`, `"warn"`, `"info"`, `"debug"`,
    /// `"trace"`, or a full `EnvFilter` string.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Capture mode and consent settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerSection {
    /// Mode applied at startup.
    #[serde(default)]
    pub initial_mode: CaptureMode,
    /// Whether a consent answer survives restarts.
    #[serde(default)]
    pub persist_consent: bool,
    /// The persisted answer.  Ignored unless `persist_consent` is set.
    #[serde(default)]
    pub consent_granted: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            initial_mode: CaptureMode::default(),
            persist_consent: false,
            consent_granted: false,
        }
    }
}

impl AgentConfig {
    /// Checks the timing rules for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTiming`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()?;
        Ok(())
    }

    /// The consent state to seed the mode manager with.
    pub fn initial_consent(&self) -> ConsentState {
        ConsentState {
            background_mode_granted: self.scanner.persist_consent && self.scanner.consent_granted,
        }
    }

    /// Records a consent decision if persistence is enabled.
    ///
    /// Returns `true` when the stored value changed and should be saved.
    pub fn record_consent(&mut self, consent: ConsentState) -> bool {
        if !self.scanner.persist_consent
            || self.scanner.consent_granted == consent.background_mode_granted
        {
            return false;
        }
        self.scanner.consent_granted = consent.background_mode_granted;
        true
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AgentConfig` from `path`, returning `AgentConfig::default()` if the
/// file does not exist yet.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AgentConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AgentConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AgentConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory, including the application folder.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("IsbnScanAgent"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("IsbnScanAgent")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("isbn-scan-agent"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("scan_agent_test_{}", uuid::Uuid::new_v4()))
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_default_config_uses_documented_values() {
        // Arrange / Act
        let cfg = AgentConfig::default();

        // Assert
        assert_eq!(cfg.agent.log_level, "info");
        assert_eq!(cfg.scanner.initial_mode, CaptureMode::FocusedFieldOnly);
        assert!(!cfg.scanner.persist_consent);
        assert_eq!(cfg.timing, TimingConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_deserializes_to_defaults() {
        let cfg: AgentConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        // Arrange
        let toml_str = r#"
[scanner]
initial_mode = "background_service"

[timing]
keystroke_timeout_ms = 40
"#;

        // Act
        let cfg: AgentConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.scanner.initial_mode, CaptureMode::BackgroundService);
        assert_eq!(cfg.timing.keystroke_timeout_ms, 40);
        assert_eq!(cfg.timing.max_scan_duration_ms, 300);
        assert_eq!(cfg.agent.log_level, "info");
    }

    #[test]
    fn test_unknown_mode_is_a_parse_error() {
        let result: Result<AgentConfig, _> = toml::from_str("[scanner]\ninitial_mode = \"always\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_lengths() {
        let mut cfg = AgentConfig::default();
        cfg.timing.min_barcode_length = 20;

        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTiming(_))));
    }

    // ── Consent persistence ───────────────────────────────────────────────────

    #[test]
    fn test_persisted_consent_is_ignored_unless_opted_in() {
        let mut cfg = AgentConfig::default();
        cfg.scanner.consent_granted = true;
        assert!(!cfg.initial_consent().background_mode_granted);

        cfg.scanner.persist_consent = true;
        assert!(cfg.initial_consent().background_mode_granted);
    }

    #[test]
    fn test_record_consent_only_changes_when_opted_in() {
        // Arrange
        let granted = ConsentState {
            background_mode_granted: true,
        };
        let mut session_only = AgentConfig::default();
        let mut persisted = AgentConfig::default();
        persisted.scanner.persist_consent = true;

        // Act / Assert
        assert!(!session_only.record_consent(granted));
        assert!(!session_only.scanner.consent_granted);

        assert!(persisted.record_consent(granted));
        assert!(persisted.scanner.consent_granted);
        assert!(!persisted.record_consent(granted), "second record is a no-op");
    }

    // ── File round trip ───────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = scratch_dir().join("config.toml");
        let cfg = load_config_from(&path).expect("missing file is not an error");
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn test_save_then_load_round_trips_via_temp_dir() {
        // Arrange
        let dir = scratch_dir();
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AgentConfig::default();
        cfg.agent.log_level = "debug".to_string();
        cfg.scanner.persist_consent = true;
        cfg.scanner.consent_granted = true;
        cfg.timing.min_keys_per_second = 80;

        // Act
        save_config_to(&path, &cfg).expect("save");
        let loaded = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_from_malformed_file_is_parse_error() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    // ── Path formation ────────────────────────────────────────────────────────

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir in a stripped CI environment is also acceptable.
    }
}
