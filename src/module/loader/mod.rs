//! Module loading system
//!
//! Turns built artifacts into type catalogs and assembles them into an
//! extension loader.

pub mod artifact;
pub mod assembly;
pub mod loader;

#[cfg(feature = "dylib")]
pub use artifact::DylibLoader;
pub use artifact::{ArtifactLoader, CatalogFn, LinkedCatalogs};
pub use assembly::InclusionStrategy;
pub use loader::ModuleLoader;
