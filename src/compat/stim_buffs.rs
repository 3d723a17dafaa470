//! Stimulator buff injection into the host globals document.
//!
//! Each `StimBuffs/<key>.json` file under the mod root becomes entry `<key>`
//! of the globals stimulator buff table, replacing any existing entry.

use crate::catalog::schema::json_kind;
use crate::compat::PassOptions;
use crate::error::CompatError;
use crate::jsonc;
use anyhow::Context;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const STIM_BUFFS_RELATIVE_DIR: &str = "StimBuffs";

/// Known locations of the buff table inside the globals document.
const BUFF_TABLE_POINTERS: [&str; 2] = [
    "/config/Health/Effects/Stimulator/Buffs",
    "/Configuration/Health/Effects/Stimulator/Buffs",
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StimBuffsReport {
    pub applied: usize,
    pub skipped: usize,
}

pub fn stim_buffs_dir(mod_root: &Path) -> PathBuf {
    mod_root.join(STIM_BUFFS_RELATIVE_DIR)
}

/// Inject every buff file under `dir` into `globals`.
///
/// A missing or empty directory is a no-op. A missing buff table is an
/// error; an empty table is skipped with a warning because the expected
/// payload kind cannot be inferred. Individual bad files are counted.
pub fn apply_stim_buffs(
    globals: &mut Value,
    dir: &Path,
    options: PassOptions,
) -> Result<StimBuffsReport, CompatError> {
    let mut report = StimBuffsReport::default();
    let files = buff_files(dir)?;
    if files.is_empty() {
        debug!(dir = %dir.display(), "no stim buff files");
        return Ok(report);
    }

    let table = buff_table(globals)?;
    let Some(expected) = table.values().find(|value| !value.is_null()).map(json_kind) else {
        warn!("cannot infer stim buff payload kind from an empty table; stim buffs skipped");
        return Ok(report);
    };

    for path in files {
        let Some(key) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.trim().is_empty())
        else {
            report.skipped += 1;
            continue;
        };
        match read_payload(&path, expected) {
            Ok(Some(payload)) => {
                table.insert(key.to_string(), payload);
                report.applied += 1;
            }
            Ok(None) => report.skipped += 1,
            Err(err) => {
                report.skipped += 1;
                warn!(key, file = %path.display(), error = %format!("{err:#}"), "stim buff not loaded");
            }
        }
    }

    if options.debug {
        info!(applied = report.applied, skipped = report.skipped, "stim buffs applied");
    }
    Ok(report)
}

// Top-level `*.json` files, sorted ignoring case.
fn buff_files(dir: &Path) -> Result<Vec<PathBuf>, CompatError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|err| CompatError::StimBuff {
        detail: format!("reading {}: {err}", dir.display()),
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort_by_cached_key(|path| path.to_string_lossy().to_lowercase());
    Ok(files)
}

fn buff_table(globals: &mut Value) -> Result<&mut Map<String, Value>, CompatError> {
    let Some(pointer) = BUFF_TABLE_POINTERS
        .iter()
        .copied()
        .find(|pointer| globals.pointer(pointer).is_some())
    else {
        return Err(CompatError::StimBuff {
            detail: "globals have no Health/Effects/Stimulator/Buffs table".to_string(),
        });
    };
    match globals.pointer_mut(pointer) {
        Some(Value::Object(table)) => Ok(table),
        Some(other) => Err(CompatError::StimBuff {
            detail: format!("{pointer} is {} rather than an object", json_kind(other)),
        }),
        None => Err(CompatError::StimBuff {
            detail: format!("{pointer} disappeared"),
        }),
    }
}

// `Ok(None)` for blank files.
fn read_payload(path: &Path, expected: &'static str) -> anyhow::Result<Option<Value>> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(None);
    }
    let payload = jsonc::parse(&raw).with_context(|| format!("parsing {}", path.display()))?;
    let kind = json_kind(&payload);
    if kind != expected {
        anyhow::bail!("payload is {kind}, existing buffs are {expected}");
    }
    Ok(Some(payload))
}
