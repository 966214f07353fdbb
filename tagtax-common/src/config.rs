//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`TAGTAX_ROOT_FOLDER`, then `TAGTAX_ROOT`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never terminates a stage: a warning is
//! logged and compiled defaults apply.

use crate::paths::LedgerPaths;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const ENV_ROOT_FOLDER: &str = "TAGTAX_ROOT_FOLDER";
pub const ENV_ROOT: &str = "TAGTAX_ROOT";
pub const ENV_CLASSIFIER_ENDPOINT: &str = "TAGTAX_CLASSIFIER_ENDPOINT";
pub const ENV_CLASSIFIER_MODEL: &str = "TAGTAX_CLASSIFIER_MODEL";

/// Compiled fallback values for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("tagtax"))
            .unwrap_or_else(|| PathBuf::from("./tagtax_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let defaults = CompiledDefaults::for_current_platform();
        Self {
            level: defaults.log_level,
            log_file: defaults.log_file,
        }
    }
}

/// Classification (language-model) service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub model: String,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434/api/generate".to_string(),
            model: "llama3.1:8b".to_string(),
            requests_per_second: 2,
            timeout_secs: 120,
            connect_timeout_secs: 5,
        }
    }
}

impl ClassifierConfig {
    /// Environment variables take priority over TOML values
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var(ENV_CLASSIFIER_ENDPOINT) {
            if !endpoint.trim().is_empty() {
                info!("Classifier endpoint loaded from environment variable");
                self.endpoint = endpoint.trim().to_string();
            }
        }
        if let Ok(model) = std::env::var(ENV_CLASSIFIER_MODEL) {
            if !model.trim().is_empty() {
                info!("Classifier model loaded from environment variable");
                self.model = model.trim().to_string();
            }
        }
    }
}

/// Tag collector field selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// `container:field` pairs to harvest from each entity record
    pub source_fields: Vec<String>,
    /// Entity-local tag list field at the top level of each record
    pub entity_tag_field: String,
    /// Entity metadata directory, relative to the root folder
    pub entities_dir: PathBuf,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            source_fields: vec![
                "lastfm:tags".to_string(),
                "lastfm:toptags".to_string(),
                "musicbrainz:tags".to_string(),
                "musicbrainz:genres".to_string(),
            ],
            entity_tag_field: "tags".to_string(),
            entities_dir: PathBuf::from(crate::paths::ENTITIES_DIR),
        }
    }
}

/// What to do with a unit whose classification failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAction {
    /// Stop the stage; already recorded units stay valid
    Abort,
    /// Log, record nothing, continue; the unit is retried next run
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePolicyConfig {
    pub on_parse_error: Option<ErrorAction>,
    pub on_service_error: Option<ErrorAction>,
}

/// TOML configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub classifier: ClassifierConfig,
    pub collector: CollectorConfig,
    /// Per-stage error policy overrides, keyed by stage name
    pub policy: BTreeMap<String, StagePolicyConfig>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the module's config file, falling back to defaults
    pub fn load_for_module(module_name: &str) -> Self {
        match config_file_path(module_name) {
            Some(path) => match Self::load_from(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Ignoring unreadable config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            None => {
                debug!("No config file for module {}, using defaults", module_name);
                Self::default()
            }
        }
    }
}

/// Locate the module's TOML file, if one exists
///
/// `<config_dir>/tagtax/<module>.toml`, then `/etc/tagtax/<module>.toml` on Linux.
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", module_name);

    let user_config = dirs::config_dir().map(|d| d.join("tagtax").join(&file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tagtax").join(&file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Default location new config files are written to
pub fn default_config_file_path(module_name: &str) -> Result<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("tagtax").join(format!("{}.toml", module_name)))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Resolves the data root folder for a module
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            config_file: None,
        }
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    /// Read the TOML tier from this file instead of the module's default
    pub fn with_config_file(mut self, config_file: Option<PathBuf>) -> Self {
        self.config_file = config_file;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        // Priority 2: Environment variables
        for var in [ENV_ROOT_FOLDER, ENV_ROOT] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        // Priority 3: TOML config file
        let config_path = self
            .config_file
            .clone()
            .or_else(|| config_file_path(&self.module_name));
        if let Some(config_path) = config_path {
            match TomlConfig::load_from(&config_path) {
                Ok(config) => {
                    if let Some(root_folder) = config.root_folder {
                        return root_folder;
                    }
                }
                Err(e) => warn!("Ignoring unreadable config {}: {}", config_path.display(), e),
            }
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the resolved root folder for use
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder (and parents) if missing; idempotent
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
        }
        std::fs::create_dir_all(&self.root_folder)?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn ledger_paths(&self, collector: &CollectorConfig) -> LedgerPaths {
        LedgerPaths::new(&self.root_folder).with_entities_dir(&collector.entities_dir)
    }
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("toml.tmp");
    {
        let mut file = std::fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
