// Configuration loading and parsing (unishare.toml, credentials.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::trade::TradePolicy;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub storage: StorageConfig,
    pub trade: TradeConfig,
    pub session: SessionConfig,
    pub ai: AiConfig,
    pub credentials: CredentialsConfig,
}

impl Config {
    /// Defaults with an in-memory database. Nothing touches disk.
    pub fn ephemeral() -> Self {
        Config {
            storage: StorageConfig {
                path: ":memory:".into(),
                max_slot_bytes: None,
            },
            ..Config::default()
        }
    }
}

// ---------------------------------------------------------------------------
// unishare.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire unishare.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    storage: StorageSection,
    #[serde(default)]
    trade: TradeConfig,
    #[serde(default)]
    session: SessionConfig,
    #[serde(default)]
    ai: AiConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StorageSection {
    path: Option<String>,
    max_slot_bytes: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite file path, or `":memory:"`.
    pub path: String,
    /// Per-slot size limit in bytes. `None` disables the check.
    pub max_slot_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_slot_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeConfig {
    #[serde(default)]
    pub policy: TradePolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_scan_timeout_secs")]
    pub scan_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            scan_timeout_secs: default_scan_timeout_secs(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_scan_timeout_secs() -> u64 {
    60
}

/// `<data dir>/unishare.db` for the platform, falling back to the working
/// directory when no home directory can be determined.
fn default_db_path() -> String {
    directories::ProjectDirs::from("in.edu", "bvuniversity", "unishare")
        .map(|dirs| dirs.data_dir().join("unishare.db"))
        .unwrap_or_else(|| PathBuf::from("unishare.db"))
        .to_string_lossy()
        .into_owned()
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub gemini_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/unishare.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- unishare.toml (required) ---
    let settings_path = config_dir.join("unishare.toml");
    let settings_text = read_file(&settings_path)?;
    let settings: SettingsFile =
        toml::from_str(&settings_text).map_err(|e| ConfigError::ParseError {
            path: settings_path.clone(),
            source: e,
        })?;

    let storage = StorageConfig {
        path: settings.storage.path.unwrap_or_else(default_db_path),
        max_slot_bytes: settings.storage.max_slot_bytes,
    };

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        storage,
        trade: settings.trade,
        session: settings.session,
        ai: settings.ai,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Already present in config/, leave it alone
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.storage.path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "storage.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.storage.max_slot_bytes == Some(0) {
        return Err(ConfigError::ValidationError {
            field: "storage.max_slot_bytes".into(),
            message: "must be greater than 0 when set".into(),
        });
    }

    if config.session.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError {
            field: "session.poll_interval_ms".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.ai.scan_timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "ai.scan_timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.ai.model.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "ai.model".into(),
            message: "must not be empty".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// The workspace-level defaults/ directory.
    fn defaults_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../defaults")
    }

    /// Temp project root with config/unishare.toml holding `settings`.
    fn project_with(settings: &str) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let config_dir = tmp.path().join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("unishare.toml"), settings).unwrap();
        tmp
    }

    fn default_settings() -> String {
        fs::read_to_string(defaults_dir().join("unishare.toml")).unwrap()
    }

    #[test]
    fn load_valid_config_from_shipped_defaults() {
        let tmp = project_with(&default_settings());
        let config = load_config_from(tmp.path()).expect("should load valid config");

        assert_eq!(config.storage.path, "unishare.db");
        assert_eq!(config.storage.max_slot_bytes, Some(5_242_880));
        assert_eq!(config.trade.policy, TradePolicy::Permissive);
        assert_eq!(config.session.poll_interval_ms, 2000);
        assert_eq!(config.ai.model, "gemini-3-flash-preview");
        assert_eq!(config.ai.scan_timeout_secs, 60);
        assert!(config.credentials.gemini_api_key.is_none());
    }

    #[test]
    fn empty_settings_file_uses_defaults() {
        let tmp = project_with("");
        let config = load_config_from(tmp.path()).unwrap();
        assert!(config.storage.path.ends_with("unishare.db"));
        assert_eq!(config.storage.max_slot_bytes, None);
        assert_eq!(config.session.poll_interval_ms, 2000);
        assert_eq!(config.ai.scan_timeout_secs, 60);
    }

    #[test]
    fn strict_trade_policy_is_read() {
        let tmp = project_with("[trade]\npolicy = \"strict\"\n");
        let config = load_config_from(tmp.path()).unwrap();
        assert_eq!(config.trade.policy, TradePolicy::Strict);
    }

    #[test]
    fn credentials_toml_with_api_key() {
        let tmp = project_with(&default_settings());
        fs::write(
            tmp.path().join("config/credentials.toml"),
            "gemini_api_key = \"test-key\"\n",
        )
        .unwrap();

        let config = load_config_from(tmp.path()).unwrap();
        assert_eq!(config.credentials.gemini_api_key.as_deref(), Some("test-key"));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let tmp = project_with("[session]\npoll_interval_ms = 0\n");
        let err = load_config_from(tmp.path()).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "session.poll_interval_ms");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn rejects_zero_slot_quota() {
        let tmp = project_with("[storage]\npath = \":memory:\"\nmax_slot_bytes = 0\n");
        let err = load_config_from(tmp.path()).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "storage.max_slot_bytes");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn rejects_zero_scan_timeout() {
        let tmp = project_with("[ai]\nscan_timeout_secs = 0\n");
        let err = load_config_from(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. } if field == "ai.scan_timeout_secs"
        ));
    }

    #[test]
    fn rejects_unknown_trade_policy() {
        let tmp = project_with("[trade]\npolicy = \"anarchic\"\n");
        let err = load_config_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn file_not_found_for_missing_settings() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        let err = load_config_from(tmp.path()).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("unishare.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = project_with("this is not valid [[[ toml");
        let err = load_config_from(tmp.path()).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("unishare.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let defaults = tmp.path().join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("unishare.toml"), default_settings()).unwrap();
        fs::write(
            defaults.join("credentials.toml.example"),
            "gemini_api_key = \"...\"\n",
        )
        .unwrap();

        let copied = ensure_config_files(tmp.path()).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.path().join("config/unishare.toml").exists());
        assert!(!tmp.path().join("config/credentials.toml.example").exists());
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = project_with("# custom\n");
        let defaults = tmp.path().join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("unishare.toml"), default_settings()).unwrap();

        let copied = ensure_config_files(tmp.path()).unwrap();
        assert!(copied.is_empty());
        let content = fs::read_to_string(tmp.path().join("config/unishare.toml")).unwrap();
        assert_eq!(content, "# custom\n");
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ensure_config_files(tmp.path()).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
    }

    #[test]
    fn ephemeral_config_is_in_memory() {
        let config = Config::ephemeral();
        assert_eq!(config.storage.path, ":memory:");
        assert!(validate(&config).is_ok());
    }
}
