//! Build modules from a modules directory
//!
//! Discovers `module.toml` manifests, resolves the selected modules against
//! the rest, and translates stale ones with the configured translator.
//!
//! Usage:
//!   modhost-build --modules <dir> [--config <file>] [--select <name>]... [--force]
//!   modhost-build --clean [--config <file>]

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

use modhost::config::{HostConfig, LoggingConfig, TranslatorConfig};
use modhost::module::registry::ModuleDiscovery;
use modhost::module::{BuildCache, Module, ModuleBuilder, ProcessTranslator};
use modhost::utils::init_logging_from_config;

#[derive(Parser, Debug)]
#[command(name = "modhost-build", version, about = "Incrementally build host modules")]
struct Args {
    /// Host configuration (TOML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding one subdirectory per module
    #[arg(long, default_value = "modules")]
    modules: PathBuf,

    /// Modules to build; every discovered module if omitted
    #[arg(long = "select")]
    select: Vec<String>,

    /// Translator program, overriding the configured one
    #[arg(long)]
    translator: Option<PathBuf>,

    /// Rebuild even when cached artifacts are current
    #[arg(long)]
    force: bool,

    /// Delete the build cache and exit
    #[arg(long)]
    clean: bool,

    /// Log filter, e.g. "debug" or "modhost::module=trace"
    #[arg(long)]
    log: Option<String>,
}

fn load_config(args: &Args) -> Result<HostConfig> {
    let mut config = match &args.config {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HostConfig::default(),
    };
    if args.force {
        config.build.force_rebuild = true;
    }
    if let Some(program) = &args.translator {
        let mut translator = config
            .translator
            .take()
            .unwrap_or_else(|| TranslatorConfig::new(program.clone()));
        translator.program = program.clone();
        config.translator = Some(translator);
    }
    if let Some(filter) = &args.log {
        let logging = config.logging.get_or_insert_with(LoggingConfig::default);
        logging.filter = Some(filter.clone());
    }
    Ok(config)
}

/// Split discovered modules into selected (in `names` order) and the rest
fn partition(discovered: Vec<Module>, names: &[String]) -> Result<(Vec<Module>, Vec<Module>)> {
    if names.is_empty() {
        return Ok((discovered, Vec::new()));
    }
    let mut rest = discovered;
    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let Some(index) = rest.iter().position(|m| &m.unique_name == name) else {
            bail!("Module {} was not found", name);
        };
        selected.push(rest.remove(index));
    }
    Ok((selected, rest))
}

/// Delete the configured cache, returning its root
fn clean(config: &HostConfig) -> Result<PathBuf> {
    let cache = BuildCache::open(config.build.cache_root(), Some(config.build.extension().as_str()))?;
    cache.delete()?;
    Ok(cache.root().to_path_buf())
}

/// Build and print the report; `Ok(false)` when any module failed
///
/// The builder, and with it the cache lock, is released on return.
fn build(args: &Args, config: &HostConfig) -> Result<bool> {
    let translator_config = config
        .translator
        .clone()
        .context("No translator configured; pass --translator or set [translator] in the config")?;
    let builder = ModuleBuilder::from_config(config.build.clone(), ProcessTranslator::new(translator_config))?;

    let discovery = ModuleDiscovery::new(&args.modules);
    let discovered: Vec<Module> = discovery
        .discover_modules()?
        .into_iter()
        .map(|d| d.module)
        .collect();
    info!("Discovered {} module(s) in {}", discovered.len(), args.modules.display());

    let (selected, additional) = partition(discovered, &args.select)?;
    let report = builder.try_build(&selected, &additional)?;

    for artifact in &report.artifacts {
        let status = match (artifact.success, artifact.rebuilt) {
            (true, true) => "built",
            (true, false) => "cached",
            (false, _) => "FAILED",
        };
        println!("{:>7}  {}", status, artifact.module);
        for diagnostic in &artifact.diagnostics {
            println!("         {}", diagnostic);
        }
    }

    match report.failure() {
        Some(failure) => {
            eprintln!("{}", failure);
            Ok(false)
        }
        None => Ok(true),
    }
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let config = load_config(&args)?;
    init_logging_from_config(config.logging.as_ref());
    debug!("Effective configuration: {:?}", config);

    if args.clean {
        let root = clean(&config)?;
        println!("Deleted build cache {}", root.display());
        return Ok(ExitCode::SUCCESS);
    }

    if build(&args, &config)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
