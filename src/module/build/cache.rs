//! On-disk artifact cache
//!
//! One file per module at `root/<unique_name>.<extension>`. Freshness is
//! decided purely from modification times; there is no hashing and no
//! manifest next to the artifacts.
//!
//! A cache handle holds `<root>.lock` for as long as it lives, so two builds
//! never write the same root at once. The lock records the owner's pid; on
//! Linux a lock whose owner is gone is reclaimed by the next open. Elsewhere
//! a lock left by a killed build has to be deleted by hand.

use std::collections::HashSet;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

use crate::module::traits::{Module, ModuleError};

/// Why a module has to be translated again
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// No cached artifact
    Missing,
    /// Rebuild requested by configuration
    Forced,
    /// A source is at least as new as the artifact, or cannot be read
    SourceChanged(PathBuf),
    /// A dependency's artifact is at least as new as this one
    DependencyChanged(String),
    /// A dependency was rebuilt earlier in this build
    DependencyRebuilt(String),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::Missing => write!(f, "no cached artifact"),
            StaleReason::Forced => write!(f, "forced rebuild"),
            StaleReason::SourceChanged(path) => write!(f, "source {} changed", path.display()),
            StaleReason::DependencyChanged(name) => write!(f, "dependency {} changed", name),
            StaleReason::DependencyRebuilt(name) => write!(f, "dependency {} was rebuilt", name),
        }
    }
}

/// Exclusive handle on a cache directory
#[derive(Debug)]
pub struct BuildCache {
    root: PathBuf,
    extension: String,
    lock_path: PathBuf,
}

impl BuildCache {
    /// Artifact extension used when none is configured
    pub fn default_extension() -> String {
        format!("module.{}", std::env::consts::DLL_EXTENSION)
    }

    /// Open the cache at `root`, taking its lock
    ///
    /// The directory itself is created lazily by [`BuildCache::ensure_root`].
    pub fn open<P: Into<PathBuf>>(root: P, extension: Option<&str>) -> Result<Self, ModuleError> {
        let root = root.into();
        let mut lock_name = root.clone().into_os_string();
        lock_name.push(".lock");
        let lock_path = PathBuf::from(lock_name);

        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| ModuleError::io(format!("Failed to create {:?}", parent), e))?;
        }

        let acquired = match create_lock(&lock_path) {
            Err(e) if e.kind() == ErrorKind::AlreadyExists && lock_is_abandoned(&lock_path) => {
                warn!("Reclaiming cache lock {:?} left by a dead process", lock_path);
                match fs::remove_file(&lock_path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(ModuleError::io(
                            format!("Failed to remove stale lock file {:?}", lock_path),
                            e,
                        ))
                    }
                }
                create_lock(&lock_path)
            }
            other => other,
        };
        let mut lock = match acquired {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(ModuleError::CacheLocked(root));
            }
            Err(e) => {
                return Err(ModuleError::io(
                    format!("Failed to create lock file {:?}", lock_path),
                    e,
                ))
            }
        };

        let cache = Self {
            root,
            extension: extension
                .map(str::to_string)
                .unwrap_or_else(Self::default_extension),
            lock_path,
        };
        // dropping `cache` on failure releases the lock again
        writeln!(lock, "{}", std::process::id()).map_err(|e| {
            ModuleError::io(format!("Failed to write lock file {:?}", cache.lock_path), e)
        })?;

        debug!("Opened build cache at {:?}", cache.root);
        Ok(cache)
    }

    /// Lock file guarding this cache
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Cached artifact location for a module name
    pub fn artifact_path(&self, unique_name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", unique_name, self.extension))
    }

    /// Where a translator writes before the artifact replaces the cache entry
    pub(crate) fn staging_path(&self, unique_name: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}.partial", unique_name, self.extension))
    }

    /// Create the cache root if missing
    pub fn ensure_root(&self) -> Result<(), ModuleError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| ModuleError::io(format!("Failed to create cache root {:?}", self.root), e))
    }

    /// Whether a cached artifact exists for the module
    pub fn contains(&self, unique_name: &str) -> bool {
        self.artifact_path(unique_name).is_file()
    }

    /// Decide whether `module` needs translation
    ///
    /// `rebuilt` names the modules translated earlier in the same build.
    /// Checks run in order: missing artifact, forced, sources, dependencies.
    pub fn staleness(
        &self,
        module: &Module,
        force: bool,
        rebuilt: &HashSet<String>,
    ) -> Option<StaleReason> {
        let artifact_time = match modified(&self.artifact_path(&module.unique_name)) {
            Some(time) => time,
            None => return Some(StaleReason::Missing),
        };

        if force {
            return Some(StaleReason::Forced);
        }

        for source in &module.sources {
            match modified(source) {
                Some(time) if time < artifact_time => {}
                _ => return Some(StaleReason::SourceChanged(source.clone())),
            }
        }

        for dep in &module.dependencies {
            let name = &dep.target_name;
            if rebuilt.contains(name) {
                return Some(StaleReason::DependencyRebuilt(name.clone()));
            }
            match modified(&self.artifact_path(name)) {
                Some(time) if time < artifact_time => {}
                _ => return Some(StaleReason::DependencyChanged(name.clone())),
            }
        }

        None
    }

    /// Remove the whole cache directory
    pub fn delete(&self) -> Result<(), ModuleError> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                debug!("Deleted build cache {:?}", self.root);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ModuleError::io(
                format!("Failed to delete cache {:?}", self.root),
                e,
            )),
        }
    }
}

impl Drop for BuildCache {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.lock_path) {
            warn!("Failed to release cache lock {:?}: {}", self.lock_path, e);
        }
    }
}

fn create_lock(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

/// A lock is abandoned when the pid it records names no running process.
/// Unreadable or empty locks are treated as held.
fn lock_is_abandoned(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    match contents.trim().parse::<u32>() {
        Ok(pid) => !process_alive(pid),
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    let proc = Path::new("/proc");
    if !proc.join("self").exists() {
        return true;
    }
    proc.join(pid.to_string()).exists()
}

// no liveness check; stale locks are removed by hand
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
