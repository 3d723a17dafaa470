//! Patch an item catalog dump with every enabled compatibility feature.
//!
//! Usage:
//!   compat-patch --items items.json --mod-root . --output items.patched.json
//!   compat-patch --items items.json --globals globals.json --report run.json --strict

use anyhow::{Context, Result, bail};
use catalog_compat::{
    ClassRegistry, Coordinator, FileClassRegistry, HostTables, NoClassRegistry, RunEnvironment,
    Settings, load_items, load_json, write_json_atomic,
};
use clap::Parser;
use std::io::{Write, stdout};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "compat-patch")]
#[command(about = "Apply ammo, weapon, plate and stim buff compatibility to an item catalog")]
struct Cli {
    /// Item catalog: a bare id map or a `{"data": ...}` host response.
    #[arg(long)]
    items: PathBuf,
    /// Optional globals document for stim buff injection.
    #[arg(long)]
    globals: Option<PathBuf>,
    /// Where to write patched globals; defaults to overwriting `--globals`.
    #[arg(long)]
    globals_output: Option<PathBuf>,
    /// Mod root holding `config/` and `StimBuffs/`.
    #[arg(long, default_value = ".")]
    mod_root: PathBuf,
    /// Settings document (defaults to `<mod-root>/config/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Class registry document (defaults to `<mod-root>/config/class_registry.json`).
    #[arg(long)]
    registry: Option<PathBuf>,
    /// Patched catalog destination; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Optional JSON run report destination.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Abort on the first per-item or per-document failure.
    #[arg(long)]
    strict: bool,
    /// Verbose summaries and per-item diagnostics.
    #[arg(long)]
    debug: bool,
}

fn setup_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.settings {
        Some(path) => {
            let mut settings = Settings::load(path)?;
            settings.apply_env_overrides();
            settings
        }
        None => Settings::load_or_default(&Settings::default_path(&cli.mod_root)),
    };
    settings.strict_mode |= cli.strict;
    settings.debug |= cli.debug;
    Ok(settings)
}

fn load_registry(cli: &Cli) -> Result<Box<dyn ClassRegistry>> {
    let registry = match &cli.registry {
        Some(path) => Some(FileClassRegistry::load(path)?),
        None => FileClassRegistry::load_optional(&FileClassRegistry::default_path(&cli.mod_root))?,
    };
    Ok(match registry {
        Some(registry) => Box::new(registry),
        None => {
            info!("no class registry found; hard plates will not be injected");
            Box::new(NoClassRegistry)
        }
    })
}

fn write_catalog(path: Option<&Path>, items: &catalog_compat::ItemMap) -> Result<()> {
    match path {
        Some(path) => write_json_atomic(path, items),
        None => {
            let mut out = stdout().lock();
            serde_json::to_writer_pretty(&mut out, items).context("writing catalog to stdout")?;
            writeln!(out)?;
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.debug);

    let settings = load_settings(&cli)?;
    let registry = load_registry(&cli)?;
    let mut items = load_items(&cli.items)?;
    let mut globals = match &cli.globals {
        Some(path) => Some(load_json(path)?),
        None => None,
    };
    if cli.globals_output.is_some() && globals.is_none() {
        bail!("--globals-output requires --globals");
    }

    let env = RunEnvironment {
        mod_root: &cli.mod_root,
        settings: &settings,
        registry: registry.as_ref(),
    };
    let mut tables = HostTables {
        items: &mut items,
        globals: globals.as_mut(),
    };
    let report = Coordinator::new()
        .run(&mut tables, &env)
        .context("compat run aborted")?
        .unwrap_or_default();

    write_catalog(cli.output.as_deref(), &items)?;
    if let (Some(globals), Some(path)) = (&globals, cli.globals_output.as_ref().or(cli.globals.as_ref())) {
        write_json_atomic(path, globals)?;
    }
    if let Some(path) = &cli.report {
        write_json_atomic(path, &report)?;
    }
    Ok(())
}
