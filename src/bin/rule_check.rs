//! Validate every weapon compatibility rule under a mod root.
//!
//! Usage:
//!   rule-check --mod-root .
//!   rule-check --dir config/compat/weapons

use anyhow::{Result, bail};
use catalog_compat::load_rules;
use catalog_compat::rules::rules_dir;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rule-check")]
#[command(about = "Validate weapon compatibility rule documents")]
struct Cli {
    /// Mod root; rules are read from `<mod-root>/config/compat/weapons`.
    #[arg(long, default_value = ".")]
    mod_root: PathBuf,
    /// Rule directory, overriding the one derived from `--mod-root`.
    #[arg(long)]
    dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let dir = cli.dir.unwrap_or_else(|| rules_dir(&cli.mod_root));
    let set = load_rules(&dir, false)?;

    for loaded in &set.rules {
        let rule = &loaded.rule;
        let caliber = rule.caliber_override().unwrap_or("-");
        println!(
            "ok\t{}\t{}\tcaliber={}\tammo={}\tmagazines={}\tstrict={}",
            loaded.source.display(),
            rule.label(),
            caliber,
            rule.allow_ammo_by_caliber,
            rule.allow_magazines_by_caliber,
            loaded.strict
        );
    }
    for rejected in &set.rejected {
        println!("rejected\t{}\t{}", rejected.source.display(), rejected.reason.replace('\n', " "));
    }

    if !set.rejected.is_empty() {
        bail!(
            "{} of {} rule documents rejected",
            set.rejected.len(),
            set.rejected.len() + set.rules.len()
        );
    }
    Ok(())
}
