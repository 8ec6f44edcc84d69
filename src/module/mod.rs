//! Module system for modhost
//!
//! Modules are independently authored, versioned compilation units. This
//! part of the crate resolves their dependencies, translates them into cached
//! artifacts and hands those artifacts to the capability registry.
//!
//! ## Architecture
//!
//! - **Resolution**: dependency-first build order with version constraints
//! - **Incremental builds**: one cached artifact per module, refreshed by mtime
//! - **Translation**: an external, opaque translator behind [`Translator`]
//! - **Assembly**: artifacts become type catalogs, indexed in priority order

pub mod build;
pub mod loader;
pub mod process;
pub mod registry;
pub mod traits;
pub mod validation;

pub use build::{Artifact, BuildCache, BuildReport, ModuleBuilder, StaleReason};
pub use loader::{ArtifactLoader, InclusionStrategy, LinkedCatalogs, ModuleLoader};
pub use process::ProcessTranslator;
pub use registry::{Comparator, Dependency, DependencyResolution, ModuleDependencies};
pub use traits::{
    BuildFailure, Diagnostic, Location, Module, ModuleError, Severity, TranslateRequest,
    Translator, Version,
};
