//! modhost - module builds and capability lookup for plug-in hosts
//!
//! A host assembles itself from independently authored, versioned modules.
//! This crate provides the two pieces that make that work:
//!
//! 1. **Build pipeline** ([`module`]): resolves module dependencies with
//!    version constraints, then translates stale modules into cached
//!    artifacts, dependencies first.
//! 2. **Capability registry** ([`extension`]): indexes tagged types from the
//!    built artifacts in priority order and instantiates them by key.
//!
//! ## Flow
//!
//! ```text
//! selected + additional modules
//!   -> ModuleDependencies::resolve   (build order)
//!   -> ModuleBuilder::build          (artifacts, cached)
//!   -> ArtifactLoader::load          (type catalogs)
//!   -> CapabilityRegistry::new       (lookup table)
//!   -> ExtensionLoader::{load, deep_load, ...}
//! ```
//!
//! [`module::ModuleLoader::assemble`] runs the whole chain.

pub mod config;
pub mod extension;
pub mod module;
pub mod utils;

pub use config::HostConfig;
pub use extension::{
    Args, CapabilityDescriptor, CapabilityRegistry, ExposedType, ExtensionLoader, LoaderError,
    ParamType, RegistryError, TypeCatalog,
};
pub use module::{Module, ModuleBuilder, ModuleError, ModuleLoader};
