//! Module discovery
//!
//! Scans a modules directory for sub-directories carrying a `module.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::module::registry::manifest::{ModuleManifest, MANIFEST_FILE};
use crate::module::traits::{Module, ModuleError};
use crate::module::validation::{ManifestValidator, ValidationResult};

/// Discovered module information
#[derive(Debug, Clone)]
pub struct DiscoveredModule {
    /// Module directory path
    pub directory: PathBuf,
    /// Module manifest
    pub manifest: ModuleManifest,
    /// Module description with paths resolved against `directory`
    pub module: Module,
}

/// Module discovery scanner
pub struct ModuleDiscovery {
    /// Base directory to scan for modules
    modules_dir: PathBuf,
    validator: ManifestValidator,
}

impl ModuleDiscovery {
    /// Create a new module discovery scanner
    pub fn new<P: AsRef<Path>>(modules_dir: P) -> Self {
        Self {
            modules_dir: modules_dir.as_ref().to_path_buf(),
            validator: ManifestValidator::new(),
        }
    }

    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Discover all modules in the modules directory
    ///
    /// Directories are visited in name order. Manifests that fail to parse or
    /// validate are skipped with a warning.
    pub fn discover_modules(&self) -> Result<Vec<DiscoveredModule>, ModuleError> {
        info!("Discovering modules in {:?}", self.modules_dir);

        if !self.modules_dir.exists() {
            debug!("Modules directory does not exist: {:?}", self.modules_dir);
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.modules_dir)
            .map_err(|e| ModuleError::io(format!("Failed to read {:?}", self.modules_dir), e))?;

        let mut directories = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModuleError::io("Failed to read directory entry", e))?;
            let path = entry.path();
            if path.is_dir() {
                directories.push(path);
            }
        }
        directories.sort();

        let mut modules = Vec::new();
        for path in directories {
            let manifest_path = path.join(MANIFEST_FILE);
            if !manifest_path.exists() {
                debug!("No {} found in {:?}, skipping", MANIFEST_FILE, path);
                continue;
            }

            match self.load(&path, &manifest_path) {
                Ok(discovered) => modules.push(discovered),
                Err(e) => {
                    warn!("Skipping module in {:?}: {}", path, e);
                    continue;
                }
            }
        }

        info!("Discovered {} modules", modules.len());
        Ok(modules)
    }

    /// Discover a specific module by directory name
    pub fn discover_module(&self, module_name: &str) -> Result<DiscoveredModule, ModuleError> {
        let module_dir = self.modules_dir.join(module_name);
        let manifest_path = module_dir.join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(ModuleError::ModuleNotFound(format!(
                "Module {} not found (no {} in {:?})",
                module_name, MANIFEST_FILE, module_dir
            )));
        }

        self.load(&module_dir, &manifest_path)
    }

    fn load(&self, directory: &Path, manifest_path: &Path) -> Result<DiscoveredModule, ModuleError> {
        let manifest = ModuleManifest::from_file(manifest_path)?;

        if let ValidationResult::Invalid(errors) = self.validator.validate(&manifest) {
            return Err(ModuleError::InvalidManifest(errors.join("; ")));
        }
        debug!("Manifest validated: {}", manifest.name);

        let module = manifest.to_module(directory)?;
        Ok(DiscoveredModule {
            directory: directory.to_path_buf(),
            manifest,
            module,
        })
    }
}
