//! Incremental module build pipeline
//!
//! Resolves the build order, then reuses or refreshes one cached artifact per
//! module.

pub mod builder;
pub mod cache;

pub use builder::{Artifact, BuildReport, ModuleBuilder};
pub use cache::{BuildCache, StaleReason};
