//! Schema adapters over raw catalog templates.
//!
//! Hosts have shipped the same template data under different field names
//! (`_props` on disk, `Properties` in the server object model, `filters` vs
//! `Filters`, ...). Callers never index templates directly; they go through a
//! [`SchemaView`], which tries each known spelling of a field and reports
//! "absent" instead of failing when none matches. Only structurally wrong
//! containers (a slot list that is not a list, a filter that is not a list)
//! come back as [`SchemaDrift`].

use crate::ItemMap;
use crate::error::SchemaDrift;
use serde_json::{Map, Value};
use std::fmt;

/// Logical template fields the engine reads or writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Properties,
    Name,
    Parent,
    Caliber,
    AmmoCaliber,
    Slots,
    Chambers,
    Cartridges,
    Filters,
    Filter,
}

/// The three slot sequences a template may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotGroup {
    Slots,
    Chambers,
    Cartridges,
}

impl SlotGroup {
    pub fn field(self) -> Field {
        match self {
            SlotGroup::Slots => Field::Slots,
            SlotGroup::Chambers => Field::Chambers,
            SlotGroup::Cartridges => Field::Cartridges,
        }
    }
}

impl fmt::Display for SlotGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotGroup::Slots => "slots",
            SlotGroup::Chambers => "chambers",
            SlotGroup::Cartridges => "cartridges",
        };
        f.write_str(name)
    }
}

/// Read/write capability over one catalog schema version.
///
/// Implementors only name their field spellings; traversal is shared.
pub trait SchemaView: Send + Sync {
    fn label(&self) -> &'static str;

    /// Candidate keys for `field`, tried in order.
    fn keys(&self, field: Field) -> &'static [&'static str];

    fn lookup<'v>(&self, node: &'v Value, field: Field) -> Option<&'v Value> {
        let object = node.as_object()?;
        self.keys(field).iter().find_map(|key| object.get(*key))
    }

    fn lookup_mut<'v>(&self, node: &'v mut Value, field: Field) -> Option<&'v mut Value> {
        let object = node.as_object_mut()?;
        let key = self
            .keys(field)
            .iter()
            .copied()
            .find(|key| object.contains_key(*key))?;
        object.get_mut(key)
    }

    /// Non-blank string value of `field`.
    fn text<'v>(&self, node: &'v Value, field: Field) -> Option<&'v str> {
        self.lookup(node, field)?
            .as_str()
            .filter(|value| !value.trim().is_empty())
    }

    fn properties<'v>(&self, item: &'v Value) -> Option<&'v Value> {
        self.lookup(item, Field::Properties)
            .filter(|props| props.is_object())
    }

    fn caliber<'v>(&self, item: &'v Value) -> Option<&'v str> {
        self.text(self.properties(item)?, Field::Caliber)
    }

    fn ammo_caliber<'v>(&self, item: &'v Value) -> Option<&'v str> {
        self.text(self.properties(item)?, Field::AmmoCaliber)
    }

    fn parent_id<'v>(&self, item: &'v Value) -> Option<&'v str> {
        self.text(item, Field::Parent)
    }

    fn display_name<'v>(&self, item: &'v Value) -> Option<&'v str> {
        self.text(item, Field::Name)
    }

    fn slot_name<'v>(&self, slot: &'v Value) -> Option<&'v str> {
        self.text(slot, Field::Name)
    }

    /// Overwrite the weapon caliber hint, reusing whichever spelling exists.
    fn set_ammo_caliber(&self, item: &mut Value, caliber: &str) -> Result<(), SchemaDrift> {
        let keys = self.keys(Field::AmmoCaliber);
        let props = self
            .lookup_mut(item, Field::Properties)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| SchemaDrift::new("template has no properties object"))?;
        let key = keys
            .iter()
            .copied()
            .find(|key| props.contains_key(*key))
            .or_else(|| keys.first().copied())
            .ok_or_else(|| SchemaDrift::new("schema declares no ammo caliber field"))?;
        props.insert(key.to_string(), Value::String(caliber.to_string()));
        Ok(())
    }

    /// Slot sequence for `group`; `Ok(None)` when the template declares none.
    fn slots<'v>(
        &self,
        item: &'v Value,
        group: SlotGroup,
    ) -> Result<Option<&'v Vec<Value>>, SchemaDrift> {
        let Some(props) = self.properties(item) else {
            return Ok(None);
        };
        as_list(self.lookup(props, group.field()), group)
    }

    fn slots_mut<'v>(
        &self,
        item: &'v mut Value,
        group: SlotGroup,
    ) -> Result<Option<&'v mut Vec<Value>>, SchemaDrift> {
        let Some(props) = self
            .lookup_mut(item, Field::Properties)
            .filter(|props| props.is_object())
        else {
            return Ok(None);
        };
        as_list_mut(self.lookup_mut(props, group.field()), group)
    }

    /// First filter group's id list of a slot.
    ///
    /// Only the first declared filter group is ever considered.
    fn first_filter<'v>(&self, slot: &'v Value) -> Result<Option<&'v Vec<Value>>, SchemaDrift> {
        if !check_slot(slot)? {
            return Ok(None);
        }
        let Some(props) = self.lookup(slot, Field::Properties) else {
            return Ok(None);
        };
        let Some(first) = as_list(self.lookup(props, Field::Filters), "filters")?
            .and_then(|groups| groups.first())
        else {
            return Ok(None);
        };
        as_list(self.lookup(first, Field::Filter), "filter")
    }

    fn first_filter_mut<'v>(
        &self,
        slot: &'v mut Value,
    ) -> Result<Option<&'v mut Vec<Value>>, SchemaDrift> {
        if !check_slot(slot)? {
            return Ok(None);
        }
        let Some(props) = self.lookup_mut(slot, Field::Properties) else {
            return Ok(None);
        };
        let Some(first) = as_list_mut(self.lookup_mut(props, Field::Filters), "filters")?
            .and_then(|groups| groups.first_mut())
        else {
            return Ok(None);
        };
        as_list_mut(self.lookup_mut(first, Field::Filter), "filter")
    }
}

/// On-disk database layout (`_props`, `_name`, `_parent`, `filters`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SptDatabaseSchema;

impl SchemaView for SptDatabaseSchema {
    fn label(&self) -> &'static str {
        "spt-database"
    }

    fn keys(&self, field: Field) -> &'static [&'static str] {
        match field {
            Field::Properties => &["_props"],
            Field::Name => &["_name"],
            Field::Parent => &["_parent"],
            Field::Caliber => &["Caliber", "caliber"],
            Field::AmmoCaliber => &["ammoCaliber", "AmmoCaliber"],
            Field::Slots => &["Slots", "slots"],
            Field::Chambers => &["Chambers", "chambers"],
            Field::Cartridges => &["Cartridges", "cartridges"],
            Field::Filters => &["filters", "Filters"],
            Field::Filter => &["Filter", "filter"],
        }
    }
}

/// Server object-model layout (`Properties`, `Name`, `Parent`, `Filters`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerModelSchema;

impl SchemaView for ServerModelSchema {
    fn label(&self) -> &'static str {
        "server-model"
    }

    fn keys(&self, field: Field) -> &'static [&'static str] {
        match field {
            Field::Properties => &["Properties", "Props"],
            Field::Name => &["Name"],
            Field::Parent => &["Parent", "ParentId"],
            Field::Caliber => &["Caliber"],
            Field::AmmoCaliber => &["AmmoCaliber"],
            Field::Slots => &["Slots"],
            Field::Chambers => &["Chambers"],
            Field::Cartridges => &["Cartridges"],
            Field::Filters => &["Filters", "filters"],
            Field::Filter => &["Filter", "filter"],
        }
    }
}

static SPT_DATABASE: SptDatabaseSchema = SptDatabaseSchema;
static SERVER_MODEL: ServerModelSchema = ServerModelSchema;

/// How many templates to sample before settling on a schema.
const DETECT_SAMPLE_LIMIT: usize = 64;

/// Pick the adapter matching the catalog by probing its first templates.
///
/// Falls back to the on-disk layout when nothing conclusive is found.
pub fn detect_schema(items: &ItemMap) -> &'static dyn SchemaView {
    for template in items.values().take(DETECT_SAMPLE_LIMIT) {
        let Some(object) = template.as_object() else {
            continue;
        };
        if has_any(object, SPT_DATABASE.keys(Field::Properties)) {
            return &SPT_DATABASE;
        }
        if has_any(object, SERVER_MODEL.keys(Field::Properties)) {
            return &SERVER_MODEL;
        }
    }
    &SPT_DATABASE
}

/// Resolve an adapter by its label (`spt-database`, `server-model`).
pub fn schema_by_label(label: &str) -> Option<&'static dyn SchemaView> {
    match label {
        "spt-database" => Some(&SPT_DATABASE),
        "server-model" => Some(&SERVER_MODEL),
        _ => None,
    }
}

fn has_any(object: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().any(|key| object.contains_key(*key))
}

// Null and non-object slots are skipped; scalars in a slot list are drift.
fn check_slot(slot: &Value) -> Result<bool, SchemaDrift> {
    match slot {
        Value::Null => Ok(false),
        Value::Object(_) => Ok(true),
        other => Err(SchemaDrift::new(format!(
            "slot entry is {} rather than an object",
            json_kind(other)
        ))),
    }
}

fn as_list(
    value: Option<&Value>,
    what: impl fmt::Display,
) -> Result<Option<&Vec<Value>>, SchemaDrift> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(list)) => Ok(Some(list)),
        Some(other) => Err(SchemaDrift::new(format!(
            "{what} is {} rather than an array",
            json_kind(other)
        ))),
    }
}

fn as_list_mut(
    value: Option<&mut Value>,
    what: impl fmt::Display,
) -> Result<Option<&mut Vec<Value>>, SchemaDrift> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(list)) => Ok(Some(list)),
        Some(other) => Err(SchemaDrift::new(format!(
            "{what} is {} rather than an array",
            json_kind(other)
        ))),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
