//! Module registry and discovery
//!
//! Handles module discovery, manifest parsing, version constraints and
//! dependency resolution.

pub mod dependencies;
pub mod discovery;
pub mod manifest;
pub mod version;

pub use dependencies::{DependencyResolution, ModuleDependencies};
pub use discovery::{DiscoveredModule, ModuleDiscovery};
pub use manifest::ModuleManifest;
pub use version::{Comparator, Dependency};
