//! Shared fixtures for integration tests
#![allow(dead_code)]

use modhost::config::{BuildConfig, RegistryConfig};
use modhost::extension::{
    Args, CapabilityDescriptor, CapabilityRegistry, ExposedType, ParamType, TypeCatalog,
};
use modhost::module::{
    BuildCache, Dependency, Diagnostic, Module, ModuleBuilder, ModuleError, TranslateRequest,
    Translator, Version,
};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

// ---- capabilities -------------------------------------------------------

pub trait SimpleBase {
    fn value(&self) -> i32;
    fn kind(&self) -> &'static str;
}

pub trait CtorBase {
    fn value(&self) -> i32;
    fn time(&self) -> SystemTime;
    fn kind(&self) -> &'static str;
}

/// Tag for [`SimpleBase`] implementations with an empty constructor
pub struct SimpleEmptyCtor;

/// Tag for [`CtorBase`] implementations taking `(i32, SystemTime)`
pub struct CtorTag;

pub fn descriptors() -> Vec<CapabilityDescriptor> {
    vec![
        CapabilityDescriptor::of::<dyn SimpleBase, SimpleEmptyCtor>(vec![]),
        CapabilityDescriptor::of::<dyn CtorBase, CtorTag>(vec![
            ParamType::of::<i32>(),
            ParamType::of::<SystemTime>(),
        ]),
    ]
}

pub fn ctor_args(value: i32, time: SystemTime) -> Args {
    Args::new().with(value).with(time)
}

// ---- content types ------------------------------------------------------

macro_rules! simple_type {
    ($name:ident) => {
        pub struct $name(i32);

        impl SimpleBase for $name {
            fn value(&self) -> i32 {
                self.0
            }

            fn kind(&self) -> &'static str {
                stringify!($name)
            }
        }
    };
}

macro_rules! ctor_type {
    ($name:ident) => {
        pub struct $name {
            value: i32,
            time: SystemTime,
        }

        impl CtorBase for $name {
            fn value(&self) -> i32 {
                self.value
            }

            fn time(&self) -> SystemTime {
                self.time
            }

            fn kind(&self) -> &'static str {
                stringify!($name)
            }
        }
    };
}

simple_type!(SimpleTestA);
simple_type!(OtherSimpleTestA);
simple_type!(SimpleTestB);
simple_type!(SimpleTestC);
ctor_type!(CtorTestA);
ctor_type!(CtorTestB);

fn ctor_params() -> [ParamType; 2] {
    [ParamType::of::<i32>(), ParamType::of::<SystemTime>()]
}

pub fn content_a() -> TypeCatalog {
    TypeCatalog::new("content-a")
        .with_type(
            ExposedType::of::<SimpleTestA>()
                .implements::<dyn SimpleBase>(|t| Box::new(t))
                .tag::<SimpleEmptyCtor>("A")
                .constructor(&[], |_: &Args| Ok(SimpleTestA(0))),
        )
        .with_type(
            ExposedType::of::<OtherSimpleTestA>()
                .implements::<dyn SimpleBase>(|t| Box::new(t))
                .tag::<SimpleEmptyCtor>("A2")
                .constructor(&[], |_: &Args| Ok(OtherSimpleTestA(0)))
                .constructor(&[ParamType::of::<i32>()], |args: &Args| {
                    Ok(OtherSimpleTestA(*args.get::<i32>(0)?))
                }),
        )
        .with_type(
            ExposedType::of::<CtorTestA>()
                .implements::<dyn CtorBase>(|t| Box::new(t))
                .tag::<CtorTag>("A")
                .constructor(&ctor_params(), |args: &Args| {
                    Ok(CtorTestA {
                        value: *args.get::<i32>(0)?,
                        time: *args.get::<SystemTime>(1)?,
                    })
                }),
        )
}

pub fn content_b() -> TypeCatalog {
    TypeCatalog::new("content-b")
        .with_type(
            ExposedType::of::<SimpleTestB>()
                .implements::<dyn SimpleBase>(|t| Box::new(t))
                .tag::<SimpleEmptyCtor>("A")
                .constructor(&[], |_: &Args| Ok(SimpleTestB(0))),
        )
        .with_type(
            ExposedType::of::<CtorTestB>()
                .implements::<dyn CtorBase>(|t| Box::new(t))
                .tag::<CtorTag>("A")
                .constructor(&ctor_params(), |args: &Args| {
                    Ok(CtorTestB {
                        value: *args.get::<i32>(0)?,
                        time: *args.get::<SystemTime>(1)?,
                    })
                }),
        )
}

/// Overrides key "A" of content-a; built against it
pub fn content_c() -> TypeCatalog {
    TypeCatalog::new("content-c").with_type(
        ExposedType::of::<SimpleTestC>()
            .implements::<dyn SimpleBase>(|t| Box::new(t))
            .tag::<SimpleEmptyCtor>("A")
            .constructor(&[], |_: &Args| Ok(SimpleTestC(0))),
    )
}

pub fn registry(catalogs: Vec<TypeCatalog>) -> CapabilityRegistry {
    CapabilityRegistry::new(catalogs, descriptors(), &RegistryConfig::default())
        .expect("fixture registry")
}

// ---- translator ---------------------------------------------------------

/// Writes `<module name>` into the output, or fails for listed modules
#[derive(Default)]
pub struct RecordingTranslator {
    pub calls: RefCell<Vec<String>>,
    pub requests: RefCell<Vec<(String, Vec<PathBuf>, bool)>>,
    pub failing: RefCell<HashSet<String>>,
}

impl RecordingTranslator {
    pub fn fail(&self, name: &str) {
        self.failing.borrow_mut().insert(name.to_string());
    }

    pub fn succeed(&self, name: &str) {
        self.failing.borrow_mut().remove(name);
    }

    pub fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.borrow_mut())
    }
}

impl Translator for RecordingTranslator {
    fn translate(&self, request: &TranslateRequest<'_>) -> Result<Vec<Diagnostic>, ModuleError> {
        let name = request.module.unique_name.clone();
        self.calls.borrow_mut().push(name.clone());
        self.requests.borrow_mut().push((
            name.clone(),
            request.references.to_vec(),
            request.debug_info,
        ));

        if self.failing.borrow().contains(&name) {
            return Ok(vec![Diagnostic::error(format!("{} does not compile", name))
                .at(request.sources.first().cloned().unwrap_or_default(), Some(1), Some(1))]);
        }
        fs::write(request.output, name.as_bytes())
            .map_err(|e| ModuleError::TranslatorFailed(e.to_string()))?;
        Ok(Vec::new())
    }
}

// ---- filesystem ---------------------------------------------------------

/// Workspace with a source directory and a cache root
pub struct Workspace {
    pub temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("temp dir"),
        }
    }

    pub fn cache_root(&self) -> PathBuf {
        self.temp.path().join("cache")
    }

    /// Create `src/<file>` aged `secs_ago` seconds
    pub fn source(&self, file: &str, secs_ago: u64) -> PathBuf {
        let dir = self.temp.path().join("src");
        fs::create_dir_all(&dir).expect("src dir");
        let path = dir.join(file);
        fs::write(&path, file.as_bytes()).expect("write source");
        set_age(&path, secs_ago);
        path
    }

    pub fn builder(
        &self,
        translator: RecordingTranslator,
        config: BuildConfig,
    ) -> ModuleBuilder<RecordingTranslator> {
        let cache = BuildCache::open(self.cache_root(), Some("bin")).expect("open cache");
        ModuleBuilder::new(cache, translator, config)
    }
}

/// Set a file's mtime to `secs_ago` seconds in the past
pub fn set_age(path: &Path, secs_ago: u64) {
    let file = File::options().append(true).open(path).expect("open for mtime");
    file.set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
        .expect("set mtime");
}

pub fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .expect("mtime")
}

pub fn module(name: &str, version: &str, deps: &[(&str, &str)]) -> Module {
    let mut m = Module::new(name, Version::parse(version).expect("version"));
    for (target, requirement) in deps {
        m = m.with_dependency(Dependency::parse(*target, requirement).expect("requirement"));
    }
    m
}
