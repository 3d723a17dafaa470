//! Item catalog compatibility patching.
//!
//! The host owns an item catalog (template id to template JSON). This crate
//! indexes it, infers which ammunition, magazines, plates and inserts belong
//! together, and inserts the missing cross-references into slot filters.
//! Every mutation is an idempotent set union, so repeated runs never grow
//! the catalog. [`Coordinator`] sequences the passes once per process.

pub mod catalog;
pub mod compat;
pub mod coordinator;
pub mod error;
pub mod jsonc;
pub mod registry;
pub mod rules;
pub mod settings;

pub use catalog::{CaliberIndex, CaliberResolver, CatalogAccessor, SchemaView, TemplateId};
pub use coordinator::{Coordinator, Feature, HostTables, RunEnvironment, RunReport};
pub use error::{CompatError, SchemaDrift};
pub use registry::{ClassRegistry, FileClassRegistry, NoClassRegistry};
pub use rules::{RuleSet, WeaponCompatRule, load_rules};
pub use settings::Settings;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{BufReader, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Template id to raw template, in catalog order.
pub type ItemMap = serde_json::Map<String, Value>;

/// Key under which host responses wrap their payload.
const HOST_DATA_KEY: &str = "data";

pub fn load_json(path: &Path) -> Result<Value> {
    let file = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

/// Load an item catalog, either a bare id map or a `{"data": {...}}` wrapper.
pub fn load_items(path: &Path) -> Result<ItemMap> {
    items_from_value(load_json(path)?).with_context(|| format!("reading items from {}", path.display()))
}

pub fn items_from_value(value: Value) -> Result<ItemMap> {
    let Value::Object(mut object) = value else {
        bail!("item catalog must be a JSON object");
    };
    let wrapped = object.len() == 1 && object.get(HOST_DATA_KEY).is_some_and(Value::is_object);
    if !wrapped {
        return Ok(object);
    }
    match object.remove(HOST_DATA_KEY) {
        Some(Value::Object(inner)) => Ok(inner),
        _ => bail!("host data envelope is not an object"),
    }
}

/// Write `value` as pretty JSON, replacing `path` only once fully written.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .with_context(|| format!("serializing {}", path.display()))?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
