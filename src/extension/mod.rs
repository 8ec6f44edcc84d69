//! Capability registry and extension loading
//!
//! Hosts describe the capabilities they accept with [`CapabilityDescriptor`]s.
//! Artifacts describe what they offer with [`TypeCatalog`]s. The
//! [`CapabilityRegistry`] joins the two once, and an [`ExtensionLoader`]
//! answers lookups against the result.

pub mod catalog;
pub mod error;
pub mod loader;
pub mod registry;

pub use catalog::{Args, CapabilityId, Constructor, ExposedType, ParamType, TagId, TypeBuilder, TypeCatalog};
pub use error::{LoaderError, RegistryError};
pub use loader::{DeepLoad, DeepLoadIter, ExtensionLoader};
pub use registry::{CapabilityDescriptor, CapabilityRegistry, ExtensionDescriptor};

/// Version of the catalog entry point exported by dynamic artifacts
pub const ABI_VERSION: u32 = 1;

/// Export a catalog from a dynamic library artifact
///
/// Defines the `modhost_catalog` entry point and the `MODHOST_ABI_VERSION`
/// static that the dynamic loader checks before calling it. The artifact and
/// the host must be built by the same compiler against the same modhost
/// version.
///
/// ```ignore
/// fn catalog() -> modhost::extension::TypeCatalog {
///     modhost::extension::TypeCatalog::new("content-a")
/// }
/// modhost::export_catalog!(catalog);
/// ```
#[macro_export]
macro_rules! export_catalog {
    ($build:path) => {
        #[no_mangle]
        pub static MODHOST_ABI_VERSION: u32 = $crate::extension::ABI_VERSION;

        #[no_mangle]
        pub fn modhost_catalog() -> $crate::extension::TypeCatalog {
            $build()
        }
    };
}
