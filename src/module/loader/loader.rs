//! Module loader implementation
//!
//! Builds the selected modules and turns the resulting artifacts into an
//! [`ExtensionLoader`].

use std::collections::HashMap;
use tracing::info;

use crate::config::RegistryConfig;
use crate::extension::{CapabilityDescriptor, CapabilityRegistry, ExtensionLoader};
use crate::module::build::{Artifact, ModuleBuilder};
use crate::module::loader::artifact::ArtifactLoader;
use crate::module::registry::dependencies::ModuleDependencies;
use crate::module::traits::{Module, ModuleError, Translator};

/// Host assembly: build, order, index
pub struct ModuleLoader;

impl ModuleLoader {
    /// Build `selected` (plus whatever they need from `additional`) and
    /// index the artifacts in priority order
    ///
    /// Fails with [`ModuleError::BuildFailed`] if any module failed to build.
    pub fn assemble<T: Translator>(
        builder: &ModuleBuilder<T>,
        selected: &[Module],
        additional: &[Module],
        artifact_loader: &dyn ArtifactLoader,
        descriptors: Vec<CapabilityDescriptor>,
        config: &RegistryConfig,
    ) -> Result<ExtensionLoader, ModuleError> {
        let resolution = ModuleDependencies::resolve(selected, additional)?;
        let artifacts = builder.build(selected, additional)?;
        let order = config.inclusion.priority_order(selected, &resolution);
        info!("Registry priority order: {:?}", order);

        let ordered = Self::in_order(&artifacts, &order)?;
        let registry =
            CapabilityRegistry::from_artifacts(ordered, artifact_loader, descriptors, config)?;
        Ok(ExtensionLoader::new(registry))
    }

    /// Pick `artifacts` by name, in `order`
    pub fn in_order<'a>(
        artifacts: &'a [Artifact],
        order: &[String],
    ) -> Result<Vec<&'a Artifact>, ModuleError> {
        let by_name: HashMap<&str, &Artifact> =
            artifacts.iter().map(|a| (a.name(), a)).collect();
        order
            .iter()
            .map(|name| {
                by_name
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| ModuleError::ModuleNotFound(name.clone()))
            })
            .collect()
    }
}
