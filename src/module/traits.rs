//! Module system traits and interfaces
//!
//! Defines the module description consumed by the resolver and build cache,
//! the error type shared by the build pipeline, and the contract of the
//! external translator that turns source units into artifacts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use semver::Version;

use crate::module::registry::version::Dependency;

/// Immutable description of one compilation unit
///
/// Created by the caller before resolution and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Global identifier, unique across a resolved set
    pub unique_name: String,
    /// Module version (semantic versioning)
    pub version: Version,
    /// Ordered dependency list
    pub dependencies: Vec<Dependency>,
    /// Source units handed to the translator
    pub sources: Vec<PathBuf>,
    /// External binary references added to this module's reference set
    pub additional_references: Vec<PathBuf>,
}

impl Module {
    /// Create a module with no sources, dependencies or references
    pub fn new(unique_name: impl Into<String>, version: Version) -> Self {
        Self {
            unique_name: unique_name.into(),
            version,
            dependencies: Vec::new(),
            sources: Vec::new(),
            additional_references: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_source<P: Into<PathBuf>>(mut self, source: P) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn with_sources<I, P>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn with_reference<P: Into<PathBuf>>(mut self, reference: P) -> Self {
        self.additional_references.push(reference.into());
        self
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.unique_name, self.version)
    }
}

/// Diagnostic severity reported by a translator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Source location attached to a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub path: PathBuf,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

/// One message produced while translating a module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, path: impl Into<PathBuf>, line: Option<u32>, column: Option<u32>) -> Self {
        self.location = Some(Location {
            path: path.into(),
            line,
            column,
        });
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.location {
            Some(loc) => {
                write!(f, "{}", loc.path.display())?;
                if let Some(line) = loc.line {
                    write!(f, ":{}", line)?;
                    if let Some(column) = loc.column {
                        write!(f, ":{}", column)?;
                    }
                }
                write!(f, ": {}: {}", severity, self.message)
            }
            None => write!(f, "{}: {}", severity, self.message),
        }
    }
}

/// Everything a translator needs to produce one artifact
#[derive(Debug, Clone)]
pub struct TranslateRequest<'a> {
    /// Module being translated
    pub module: &'a Module,
    /// Source units, in module order
    pub sources: &'a [PathBuf],
    /// Full reference set (runtime, universal, additional, dependency artifacts)
    pub references: &'a [PathBuf],
    /// Where the artifact must be written
    pub output: &'a Path,
    /// Emit debug information
    pub debug_info: bool,
}

/// Source-to-artifact translator
///
/// Treated as an opaque, synchronous black box. A translation succeeds when
/// the returned diagnostics hold no error and the artifact exists at
/// `request.output` afterwards. `Err` is reserved for failures of the
/// translator itself (it could not run at all); the builder reports those as
/// a diagnostic of the module being built.
pub trait Translator {
    /// References every translation receives ahead of any configured ones
    fn runtime_references(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Translate `request.sources` into `request.output`
    fn translate(&self, request: &TranslateRequest<'_>) -> Result<Vec<Diagnostic>, ModuleError>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn runtime_references(&self) -> Vec<PathBuf> {
        (**self).runtime_references()
    }

    fn translate(&self, request: &TranslateRequest<'_>) -> Result<Vec<Diagnostic>, ModuleError> {
        (**self).translate(request)
    }
}

/// Diagnostics of every module that failed in one build invocation
#[derive(Debug, Clone, Default)]
pub struct BuildFailure {
    /// (module name, diagnostics) in build order
    pub modules: Vec<(String, Vec<Diagnostic>)>,
}

impl fmt::Display for BuildFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.modules.iter().map(|(n, _)| n.as_str()).collect();
        write!(
            f,
            "{} module(s) failed to build: {}",
            names.len(),
            names.join(", ")
        )?;
        for (name, diagnostics) in &self.modules {
            for diagnostic in diagnostics.iter().filter(|d| d.is_error()) {
                write!(f, "\n  [{}] {}", name, diagnostic)?;
            }
        }
        Ok(())
    }
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Duplicate module name: {0}")]
    DuplicateModule(String),

    #[error("Module {module} depends on {dependency}, which is not available")]
    DependencyMissing { module: String, dependency: String },

    #[error("Module {module} requires {requirement}, found version {found}")]
    VersionIncompatible {
        module: String,
        requirement: String,
        found: Version,
    },

    #[error("Circular dependency detected: {0}")]
    CyclicDependency(String),

    #[error("Invalid module manifest: {0}")]
    InvalidManifest(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Build cache {0:?} is locked by another build")]
    CacheLocked(PathBuf),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Translator failed: {0}")]
    TranslatorFailed(String),

    #[error("{0}")]
    BuildFailed(BuildFailure),

    #[error("Registry construction failed: {0}")]
    Registry(#[from] crate::extension::RegistryError),
}

impl ModuleError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ModuleError::Io {
            context: context.into(),
            source,
        }
    }
}
