//! Weapon compatibility rule documents.
//!
//! Rules live under `config/compat/weapons/` as `.json` or `.jsonc` files,
//! one rule per file. Loading walks the directory recursively, orders files
//! by path (case-insensitive) so application order is deterministic, lowers
//! property names so authors can use any casing, validates each document
//! against the bundled JSON Schema, and only then deserializes it.

use crate::catalog::{Exclusions, TemplateId};
use crate::error::CompatError;
use crate::jsonc;
use anyhow::{Context, Result, anyhow, bail};
use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Rule directory relative to the mod root.
pub const RULES_RELATIVE_DIR: &str = "config/compat/weapons";

const RULE_SCHEMA_SOURCE: &str = include_str!("../schema/weapon_compat_rule.schema.json");
const RULE_EXTENSIONS: [&str; 2] = ["json", "jsonc"];

/// One authored override for a single weapon template.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WeaponCompatRule {
    #[serde(rename = "weapontpl")]
    pub weapon_tpl: TemplateId,
    #[serde(default, rename = "displayname")]
    pub display_name: Option<String>,
    /// Replaces the weapon's own caliber hint when present.
    #[serde(default, rename = "caliberoverride")]
    pub caliber_override: Option<String>,
    #[serde(default = "enabled", rename = "allowammobycaliber")]
    pub allow_ammo_by_caliber: bool,
    #[serde(default = "enabled", rename = "allowmagazinesbycaliber")]
    pub allow_magazines_by_caliber: bool,
    #[serde(default, rename = "excludeammotpls")]
    pub exclude_ammo_tpls: Option<Exclusions>,
    #[serde(default, rename = "excludemagazinetpls")]
    pub exclude_magazine_tpls: Option<Exclusions>,
    /// Overrides the global strict flag for this rule only.
    #[serde(default)]
    pub strict: Option<bool>,
}

fn enabled() -> bool {
    true
}

impl WeaponCompatRule {
    /// Non-blank caliber override.
    pub fn caliber_override(&self) -> Option<&str> {
        self.caliber_override
            .as_deref()
            .filter(|caliber| !caliber.trim().is_empty())
    }

    pub fn ammo_exclusions(&self) -> Exclusions {
        self.exclude_ammo_tpls.clone().unwrap_or_default()
    }

    pub fn magazine_exclusions(&self) -> Exclusions {
        self.exclude_magazine_tpls.clone().unwrap_or_default()
    }

    /// Label used in log lines: display name when given, else the weapon id.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(self.weapon_tpl.as_str())
    }
}

/// A rule together with where it came from and its effective strictness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRule {
    pub source: PathBuf,
    pub rule: WeaponCompatRule,
    pub strict: bool,
}

/// A document that could not be turned into a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRule {
    pub source: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default, Clone)]
pub struct RuleSet {
    pub rules: Vec<LoadedRule>,
    pub rejected: Vec<RejectedRule>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub fn rules_dir(mod_root: &Path) -> PathBuf {
    mod_root.join(RULES_RELATIVE_DIR)
}

/// Load every rule document under `dir`.
///
/// A missing directory yields an empty set. Unreadable or invalid documents
/// are logged and recorded in [`RuleSet::rejected`]; with `strict` the first
/// one aborts loading instead.
pub fn load_rules(dir: &Path, strict: bool) -> Result<RuleSet, CompatError> {
    let mut set = RuleSet::default();
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "no weapon rule directory");
        return Ok(set);
    }

    for path in rule_files(dir) {
        match load_rule_file(&path) {
            Ok(rule) => {
                let effective = rule.strict.unwrap_or(strict);
                set.rules.push(LoadedRule {
                    source: path,
                    rule,
                    strict: effective,
                });
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(file = %path.display(), error = %reason, "weapon rule rejected");
                if strict {
                    return Err(CompatError::RuleSource {
                        path,
                        message: reason,
                    });
                }
                set.rejected.push(RejectedRule {
                    source: path,
                    reason,
                });
            }
        }
    }
    Ok(set)
}

/// Rule files under `dir`, sorted by path ignoring case.
pub fn rule_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable rule directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_rule_extension(path))
        .collect();
    files.sort_by_cached_key(|path| path.to_string_lossy().to_lowercase());
    files
}

fn has_rule_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            RULE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

pub fn load_rule_file(path: &Path) -> Result<WeaponCompatRule> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading rule {}", path.display()))?;
    parse_rule(&raw).with_context(|| format!("parsing rule {}", path.display()))
}

/// Parse one rule document (comments and trailing commas allowed).
pub fn parse_rule(raw: &str) -> Result<WeaponCompatRule> {
    let value = jsonc::parse(raw).context("rule is not valid JSON")?;
    let Value::Object(object) = value else {
        bail!("rule document must be a JSON object");
    };
    let normalized = Value::Object(lowercase_keys(object));
    validate_rule_document(&normalized)?;
    serde_json::from_value(normalized).context("rule does not match the expected shape")
}

fn lowercase_keys(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect()
}

fn rule_schema() -> Result<&'static JSONSchema> {
    static SCHEMA_VALUE: OnceLock<Result<Value, String>> = OnceLock::new();
    static COMPILED: OnceLock<Result<JSONSchema, String>> = OnceLock::new();

    let compiled = COMPILED.get_or_init(|| {
        let value = SCHEMA_VALUE
            .get_or_init(|| {
                serde_json::from_str(RULE_SCHEMA_SOURCE)
                    .map_err(|err| format!("parsing bundled weapon rule schema: {err}"))
            })
            .as_ref()
            .map_err(Clone::clone)?;
        JSONSchema::compile(value)
            .map_err(|err| format!("compiling bundled weapon rule schema: {err}"))
    });
    compiled.as_ref().map_err(|msg| anyhow!("{msg}"))
}

fn validate_rule_document(document: &Value) -> Result<()> {
    let schema = rule_schema()?;
    if let Err(errors) = schema.validate(document) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        bail!("rule failed schema validation:\n{}", details);
    }
    Ok(())
}
