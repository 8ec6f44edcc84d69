//! Module manifest parsing
//!
//! Handles parsing `module.toml` manifests into [`Module`] descriptions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::module::registry::version::Dependency;
use crate::module::traits::{Module, ModuleError, Version};

/// File name looked up in each module directory
pub const MANIFEST_FILE: &str = "module.toml";

/// One `[[dependencies]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    /// Unique name of the required module
    pub name: String,
    /// Requirement such as `"==1.0.0"` or `">=0.3.0"`
    pub version: String,
}

/// Module manifest (module.toml structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module name (unique identifier)
    pub name: String,
    /// Module version (semantic versioning)
    pub version: String,
    /// Human-readable description
    pub description: Option<String>,
    /// Source units, relative to the manifest directory
    #[serde(default)]
    pub sources: Vec<PathBuf>,
    /// Additional binary references, relative to the manifest directory
    #[serde(default)]
    pub references: Vec<PathBuf>,
    /// Required modules
    #[serde(default)]
    pub dependencies: Vec<DependencySpec>,
}

impl ModuleManifest {
    /// Load manifest from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModuleError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ModuleError::InvalidManifest(format!(
                "Failed to read manifest file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse manifest TOML
    pub fn from_toml_str(contents: &str) -> Result<Self, ModuleError> {
        let manifest: ModuleManifest = toml::from_str(contents).map_err(|e| {
            ModuleError::InvalidManifest(format!("Failed to parse manifest TOML: {}", e))
        })?;

        // Validate required fields
        if manifest.name.is_empty() {
            return Err(ModuleError::InvalidManifest(
                "Module name cannot be empty".to_string(),
            ));
        }

        Ok(manifest)
    }

    /// Convert to a [`Module`], resolving relative paths against `base_dir`
    pub fn to_module(&self, base_dir: &Path) -> Result<Module, ModuleError> {
        let version = Version::parse(&self.version).map_err(|e| {
            ModuleError::InvalidManifest(format!(
                "Invalid version '{}' for module {}: {}",
                self.version, self.name, e
            ))
        })?;

        let dependencies = self
            .dependencies
            .iter()
            .map(|d| Dependency::parse(d.name.clone(), &d.version))
            .collect::<Result<Vec<_>, _>>()?;

        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base_dir.join(p)
            }
        };

        Ok(Module {
            unique_name: self.name.clone(),
            version,
            dependencies,
            sources: self.sources.iter().map(resolve).collect(),
            additional_references: self.references.iter().map(resolve).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::version::Comparator;

    const MANIFEST: &str = r#"
name = "content-c"
version = "1.0.0"
description = "Overrides content-a"
sources = ["src/simple.rs", "/abs/extra.rs"]
references = ["lib/base.so"]

[[dependencies]]
name = "content-a"
version = "==1.0.0"
"#;

    #[test]
    fn test_parse_and_convert() {
        let manifest = ModuleManifest::from_toml_str(MANIFEST).unwrap();
        assert_eq!(manifest.name, "content-c");
        assert_eq!(manifest.dependencies.len(), 1);

        let module = manifest.to_module(Path::new("/mods/c")).unwrap();
        assert_eq!(module.unique_name, "content-c");
        assert_eq!(module.version, Version::new(1, 0, 0));
        assert_eq!(
            module.sources,
            vec![
                PathBuf::from("/mods/c/src/simple.rs"),
                PathBuf::from("/abs/extra.rs")
            ]
        );
        assert_eq!(
            module.additional_references,
            vec![PathBuf::from("/mods/c/lib/base.so")]
        );
        assert_eq!(module.dependencies[0].target_name, "content-a");
        assert_eq!(module.dependencies[0].comparator, Comparator::Eq);
    }

    #[test]
    fn test_minimal_manifest_defaults() {
        let manifest = ModuleManifest::from_toml_str("name = \"a\"\nversion = \"0.1.0\"").unwrap();
        assert!(manifest.sources.is_empty());
        assert!(manifest.dependencies.is_empty());
    }

    #[test]
    fn test_rejects_empty_name_and_bad_version() {
        assert!(ModuleManifest::from_toml_str("name = \"\"\nversion = \"1.0.0\"").is_err());

        let manifest = ModuleManifest::from_toml_str("name = \"a\"\nversion = \"one\"").unwrap();
        assert!(matches!(
            manifest.to_module(Path::new(".")),
            Err(ModuleError::InvalidManifest(_))
        ));
    }

    #[test]
    fn test_rejects_bad_requirement() {
        let toml = "name = \"a\"\nversion = \"1.0.0\"\n[[dependencies]]\nname = \"b\"\nversion = \"^1\"\n";
        let manifest = ModuleManifest::from_toml_str(toml).unwrap();
        assert!(manifest.to_module(Path::new(".")).is_err());
    }
}
