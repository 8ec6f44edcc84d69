//! Build orchestration
//!
//! Walks a resolved build order, reusing fresh cache entries and handing
//! stale modules to the translator. A build never stops at the first failing
//! module; a module whose dependency failed is reported without being
//! translated.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::module::build::cache::BuildCache;
use crate::module::registry::dependencies::ModuleDependencies;
use crate::module::traits::{
    BuildFailure, Diagnostic, Module, ModuleError, TranslateRequest, Translator,
};

/// Result of building one module in one invocation
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Module this artifact was built from
    pub module: Module,
    pub success: bool,
    /// Cached artifact path; `None` when the build failed
    pub path: Option<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    /// Whether the translator ran for this module
    pub rebuilt: bool,
}

impl Artifact {
    pub fn name(&self) -> &str {
        &self.module.unique_name
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    fn failed(module: &Module, diagnostics: Vec<Diagnostic>, rebuilt: bool) -> Self {
        Self {
            module: module.clone(),
            success: false,
            path: None,
            diagnostics,
            rebuilt,
        }
    }
}

/// Ordered artifacts of one build invocation
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// One artifact per module, in build order
    pub artifacts: Vec<Artifact>,
}

impl BuildReport {
    pub fn all_succeeded(&self) -> bool {
        self.artifacts.iter().all(|a| a.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| !a.success)
    }

    pub fn rebuilt(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.iter().filter(|a| a.rebuilt)
    }

    pub fn get(&self, unique_name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.name() == unique_name)
    }

    /// Every failing module with its diagnostics, or `None` if all succeeded
    pub fn failure(&self) -> Option<BuildFailure> {
        let modules: Vec<_> = self
            .failed()
            .map(|a| (a.name().to_string(), a.diagnostics.clone()))
            .collect();
        if modules.is_empty() {
            None
        } else {
            Some(BuildFailure { modules })
        }
    }
}

/// Incremental module builder
pub struct ModuleBuilder<T: Translator> {
    cache: BuildCache,
    translator: T,
    config: BuildConfig,
}

impl<T: Translator> ModuleBuilder<T> {
    pub fn new(cache: BuildCache, translator: T, config: BuildConfig) -> Self {
        Self {
            cache,
            translator,
            config,
        }
    }

    /// Open the cache named by `config` and build a builder around it
    pub fn from_config(config: BuildConfig, translator: T) -> Result<Self, ModuleError> {
        let cache = BuildCache::open(config.cache_root(), Some(config.extension().as_str()))?;
        Ok(Self::new(cache, translator, config))
    }

    pub fn cache(&self) -> &BuildCache {
        &self.cache
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// Resolve and build; per-module failures are reported, not returned
    ///
    /// Resolution errors and cache I/O errors are returned as `Err`.
    pub fn try_build(
        &self,
        selected: &[Module],
        additional: &[Module],
    ) -> Result<BuildReport, ModuleError> {
        let resolution = ModuleDependencies::resolve(selected, additional)?;
        self.cache.ensure_root()?;

        let runtime_references = self.translator.runtime_references();
        let mut succeeded: HashSet<String> = HashSet::new();
        let mut rebuilt: HashSet<String> = HashSet::new();
        let mut report = BuildReport::default();

        for module in resolution.build_order {
            let artifact = self.build_module(module, &runtime_references, &succeeded, &rebuilt)?;
            if artifact.success {
                succeeded.insert(module.unique_name.clone());
            }
            if artifact.rebuilt {
                rebuilt.insert(module.unique_name.clone());
            }
            report.artifacts.push(artifact);
        }

        info!(
            "Build finished: {} module(s), {} rebuilt, {} failed",
            report.artifacts.len(),
            rebuilt.len(),
            report.failed().count()
        );
        Ok(report)
    }

    /// Resolve and build, failing with every failing module's diagnostics
    pub fn build(
        &self,
        selected: &[Module],
        additional: &[Module],
    ) -> Result<Vec<Artifact>, ModuleError> {
        let report = self.try_build(selected, additional)?;
        match report.failure() {
            Some(failure) => Err(ModuleError::BuildFailed(failure)),
            None => Ok(report.artifacts),
        }
    }

    /// Remove the whole cache directory
    pub fn delete_cache(&self) -> Result<(), ModuleError> {
        self.cache.delete()
    }

    fn build_module(
        &self,
        module: &Module,
        runtime_references: &[PathBuf],
        succeeded: &HashSet<String>,
        rebuilt: &HashSet<String>,
    ) -> Result<Artifact, ModuleError> {
        let name = module.unique_name.as_str();

        if let Some(dep) = module
            .dependencies
            .iter()
            .find(|d| !succeeded.contains(&d.target_name))
        {
            warn!(
                "Skipping {}: dependency {} failed to build",
                name, dep.target_name
            );
            return Ok(Artifact::failed(
                module,
                vec![Diagnostic::error(format!(
                    "dependency {} failed to build; {} was not translated",
                    dep.target_name, name
                ))],
                false,
            ));
        }

        let output = self.cache.artifact_path(name);
        let reason = match self
            .cache
            .staleness(module, self.config.force_rebuild, rebuilt)
        {
            Some(reason) => reason,
            None => {
                debug!("Reusing cached artifact for {}", name);
                return Ok(Artifact {
                    module: module.clone(),
                    success: true,
                    path: Some(output),
                    diagnostics: Vec::new(),
                    rebuilt: false,
                });
            }
        };
        info!("Building {} ({})", module, reason);

        let references = self.references_for(module, runtime_references);
        let staging = self.cache.staging_path(name);
        remove_if_present(&staging)?;

        let request = TranslateRequest {
            module,
            sources: &module.sources,
            references: &references,
            output: &staging,
            debug_info: self.config.debug_info,
        };
        let mut diagnostics = match self.translator.translate(&request) {
            Ok(diagnostics) => diagnostics,
            Err(e) => vec![Diagnostic::error(e.to_string())],
        };

        let has_errors = diagnostics.iter().any(|d| d.is_error());
        if !has_errors && !staging.is_file() {
            diagnostics.push(Diagnostic::error(format!(
                "translator produced no artifact for {}",
                name
            )));
        }

        if diagnostics.iter().any(|d| d.is_error()) {
            remove_if_present(&staging)?;
            warn!("Failed to build {}", name);
            return Ok(Artifact::failed(module, diagnostics, true));
        }

        fs::rename(&staging, &output).map_err(|e| {
            ModuleError::io(format!("Failed to store artifact {:?}", output), e)
        })?;

        Ok(Artifact {
            module: module.clone(),
            success: true,
            path: Some(output),
            diagnostics,
            rebuilt: true,
        })
    }

    /// Runtime, universal, additional, then direct dependency artifacts;
    /// first occurrence wins
    fn references_for(&self, module: &Module, runtime_references: &[PathBuf]) -> Vec<PathBuf> {
        let dependency_artifacts = module
            .dependencies
            .iter()
            .map(|d| self.cache.artifact_path(&d.target_name));

        let mut seen = HashSet::new();
        runtime_references
            .iter()
            .chain(&self.config.universal_references)
            .chain(&module.additional_references)
            .cloned()
            .chain(dependency_artifacts)
            .filter(|p| seen.insert(p.clone()))
            .collect()
    }
}

fn remove_if_present(path: &std::path::Path) -> Result<(), ModuleError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ModuleError::io(format!("Failed to remove {:?}", path), e)),
    }
}
