//! Manifest validation
//!
//! Validates module manifests for structure before they are turned into
//! modules.

use tracing::{debug, warn};

use crate::module::registry::manifest::{DependencySpec, ModuleManifest};
use crate::module::registry::version::Comparator;
use crate::module::traits::Version;

/// Validation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Manifest is valid
    Valid,
    /// Manifest is invalid with specific errors
    Invalid(Vec<String>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Manifest validator
pub struct ManifestValidator {
    /// Longest accepted module name
    max_name_len: usize,
}

impl ManifestValidator {
    /// Create a new manifest validator
    pub fn new() -> Self {
        Self { max_name_len: 64 }
    }

    /// Validate a module manifest
    ///
    /// Collects every problem rather than stopping at the first one.
    pub fn validate(&self, manifest: &ModuleManifest) -> ValidationResult {
        let mut errors = Vec::new();

        if manifest.name.is_empty() {
            errors.push("Module name cannot be empty".to_string());
        } else if !self.is_valid_name(&manifest.name) {
            errors.push(format!(
                "Invalid module name: {} (must be alphanumeric with dashes/underscores)",
                manifest.name
            ));
        }

        if manifest.version.is_empty() {
            errors.push("Module version cannot be empty".to_string());
        } else if Version::parse(&manifest.version).is_err() {
            errors.push(format!(
                "Invalid version format: {} (expected semantic versioning)",
                manifest.version
            ));
        }

        if manifest.sources.is_empty() {
            errors.push("Module must list at least one source".to_string());
        }

        if let Err(dep_errors) = self.validate_dependencies(&manifest.name, &manifest.dependencies)
        {
            errors.extend(dep_errors);
        }

        if errors.is_empty() {
            debug!("Manifest validation passed for module: {}", manifest.name);
            ValidationResult::Valid
        } else {
            warn!(
                "Manifest validation failed for module {}: {:?}",
                manifest.name, errors
            );
            ValidationResult::Invalid(errors)
        }
    }

    /// Validate module name format
    #[inline]
    fn is_valid_name(&self, name: &str) -> bool {
        if name.is_empty() || name.len() > self.max_name_len {
            return false;
        }

        // Must start with alphanumeric
        if !name.chars().next().is_some_and(|c| c.is_alphanumeric()) {
            return false;
        }

        name.chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }

    fn validate_dependencies(
        &self,
        module_name: &str,
        dependencies: &[DependencySpec],
    ) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for dep in dependencies {
            if !self.is_valid_name(&dep.name) {
                errors.push(format!("Invalid dependency name: {}", dep.name));
            }
            if dep.name == module_name {
                errors.push(format!("Module {} depends on itself", module_name));
            }
            if let Err(e) = Comparator::parse_requirement(&dep.version) {
                errors.push(format!("{} (for dependency: {})", e, dep.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ManifestValidator {
    fn default() -> Self {
        Self::new()
    }
}
