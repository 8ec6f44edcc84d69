//! Configuration management for modhost
//!
//! Handles loading the host configuration from TOML or JSON files. Every
//! field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::module::build::BuildCache;
use crate::module::loader::InclusionStrategy;

/// Top-level host configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Build pipeline settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Capability registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// External translator (process adapter)
    #[serde(default)]
    pub translator: Option<TranslatorConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl HostConfig {
    /// Load configuration from TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HostConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: HostConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load from either format, chosen by file extension (`.json` or TOML)
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Save configuration to JSON file
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Build pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Cache directory (None = per-host directory under the system temp dir)
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// References handed to every translation
    #[serde(default)]
    pub universal_references: Vec<PathBuf>,

    /// Translate every module regardless of cache state
    #[serde(default = "default_false")]
    pub force_rebuild: bool,

    /// Ask the translator for debug information
    #[serde(default = "default_true")]
    pub debug_info: bool,

    /// Cached artifact extension (None = `module.<dylib extension>`)
    #[serde(default)]
    pub artifact_extension: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            universal_references: Vec::new(),
            force_rebuild: false,
            debug_info: true,
            artifact_extension: None,
        }
    }
}

impl BuildConfig {
    /// Cache directory to use, falling back to
    /// `<temp>/<host executable stem>/<modhost version>`
    pub fn cache_root(&self) -> PathBuf {
        if let Some(dir) = &self.cache_dir {
            return dir.clone();
        }
        let host = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        std::env::temp_dir()
            .join(host)
            .join(env!("CARGO_PKG_VERSION"))
    }

    /// Artifact extension to use
    pub fn extension(&self) -> String {
        self.artifact_extension
            .clone()
            .unwrap_or_else(BuildCache::default_extension)
    }
}

/// Capability registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Fail registry construction when a tagged type has no constructor
    /// matching its capability's signature (false = skip the type)
    #[serde(default = "default_true")]
    pub fail_on_missing_constructor: bool,

    /// How non-selected dependencies enter the registry priority order
    #[serde(default)]
    pub inclusion: InclusionStrategy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            fail_on_missing_constructor: true,
            inclusion: InclusionStrategy::default(),
        }
    }
}

/// Process translator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    /// Program to spawn
    pub program: PathBuf,

    /// Arguments placed before everything else
    #[serde(default)]
    pub args: Vec<String>,

    /// Flag preceding the output path
    #[serde(default = "default_output_flag")]
    pub output_flag: String,

    /// Flag preceding each reference path
    #[serde(default = "default_reference_flag")]
    pub reference_flag: String,

    /// Flag added when debug information is requested
    #[serde(default)]
    pub debug_flag: Option<String>,

    /// References every translation receives first
    #[serde(default)]
    pub runtime_references: Vec<PathBuf>,
}

fn default_output_flag() -> String {
    "-o".to_string()
}

fn default_reference_flag() -> String {
    "-L".to_string()
}

impl TranslatorConfig {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output_flag: default_output_flag(),
            reference_flag: default_reference_flag(),
            debug_flag: None,
            runtime_references: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `"modhost=debug"` (RUST_LOG takes precedence)
    #[serde(default)]
    pub filter: Option<String>,

    /// Emit JSON lines (needs the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}
