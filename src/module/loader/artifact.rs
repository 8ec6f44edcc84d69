//! Turning built artifacts into type catalogs

use std::collections::HashMap;
use tracing::debug;

use crate::extension::{RegistryError, TypeCatalog};
use crate::module::build::Artifact;

/// Produces the type catalog of a built artifact
pub trait ArtifactLoader {
    fn load(&self, artifact: &Artifact) -> Result<TypeCatalog, RegistryError>;
}

/// Catalog constructor for a module linked into the host
pub type CatalogFn = fn() -> TypeCatalog;

/// Catalogs of modules compiled into the host binary, keyed by module name
///
/// The artifact on disk only proves the module built; its types come from
/// the registered function.
#[derive(Debug, Default, Clone)]
pub struct LinkedCatalogs {
    catalogs: HashMap<String, CatalogFn>,
}

impl LinkedCatalogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, unique_name: impl Into<String>, catalog: CatalogFn) -> Self {
        self.register(unique_name, catalog);
        self
    }

    pub fn register(&mut self, unique_name: impl Into<String>, catalog: CatalogFn) {
        self.catalogs.insert(unique_name.into(), catalog);
    }

    pub fn contains(&self, unique_name: &str) -> bool {
        self.catalogs.contains_key(unique_name)
    }
}

impl ArtifactLoader for LinkedCatalogs {
    fn load(&self, artifact: &Artifact) -> Result<TypeCatalog, RegistryError> {
        let name = artifact.name();
        let catalog = self
            .catalogs
            .get(name)
            .ok_or_else(|| RegistryError::ArtifactLoad {
                artifact: name.to_string(),
                reason: "no linked catalog registered".to_string(),
            })?;
        debug!("Using linked catalog for {}", name);
        Ok(catalog().renamed(name))
    }
}

#[cfg(feature = "dylib")]
pub use self::dylib::DylibLoader;

#[cfg(feature = "dylib")]
mod dylib {
    use libloading::{Library, Symbol};
    use std::sync::Arc;
    use tracing::info;

    use super::ArtifactLoader;
    use crate::extension::{RegistryError, TypeCatalog, ABI_VERSION};
    use crate::module::build::Artifact;

    /// Loads artifacts as dynamic libraries built with
    /// [`export_catalog!`](crate::export_catalog)
    ///
    /// The library stays loaded for as long as the registry built from its
    /// catalog. Instances created from it must be dropped before the registry.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct DylibLoader;

    impl DylibLoader {
        pub fn new() -> Self {
            Self
        }
    }

    impl ArtifactLoader for DylibLoader {
        fn load(&self, artifact: &Artifact) -> Result<TypeCatalog, RegistryError> {
            let name = artifact.name().to_string();
            let fail = |reason: String| RegistryError::ArtifactLoad {
                artifact: name.clone(),
                reason,
            };
            let path = artifact
                .path
                .as_ref()
                .ok_or_else(|| RegistryError::ArtifactUnavailable(name.clone()))?;

            let lib = unsafe { Library::new(path) }
                .map_err(|e| fail(format!("Failed to load library: {}", e)))?;

            let catalog = {
                let abi: Symbol<*const u32> = unsafe { lib.get(b"MODHOST_ABI_VERSION\0") }
                    .map_err(|e| fail(format!("Missing ABI version: {}", e)))?;
                let abi_version = unsafe { **abi };
                if abi_version != ABI_VERSION {
                    return Err(fail(format!(
                        "Incompatible ABI version: host={}, artifact={}",
                        ABI_VERSION, abi_version
                    )));
                }

                let entry: Symbol<fn() -> TypeCatalog> = unsafe { lib.get(b"modhost_catalog\0") }
                    .map_err(|e| fail(format!("Missing catalog entry point: {}", e)))?;
                entry()
            };
            info!("Loaded {} from {:?}", name, path);

            Ok(catalog.renamed(name.as_str()).with_retained(Arc::new(lib)))
        }
    }
}
