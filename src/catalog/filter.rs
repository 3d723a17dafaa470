//! Slot filter patching: the only way passes mutate filter sets.
//!
//! Patching is a set union that appends missing ids at the end of the
//! existing list. It never removes or reorders members, so a second
//! application with the same inputs adds nothing.

use crate::catalog::TemplateId;
use crate::catalog::schema::{SchemaView, SlotGroup, json_kind};
use crate::error::SchemaDrift;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};

/// Ids never to insert.
pub type Exclusions = BTreeSet<TemplateId>;

/// Append every candidate not already in `filter` and not excluded.
///
/// An absent filter is a no-op. Returns how many ids were inserted.
pub fn patch_filter(
    filter: Option<&mut Vec<Value>>,
    candidates: &[TemplateId],
    excludes: &Exclusions,
) -> usize {
    let Some(filter) = filter else {
        return 0;
    };
    let mut present: HashSet<String> = filter
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    let mut added = 0;
    for candidate in candidates {
        if excludes.contains(candidate) {
            continue;
        }
        if present.insert(candidate.as_str().to_string()) {
            filter.push(Value::String(candidate.as_str().to_string()));
            added += 1;
        }
    }
    added
}

/// Rewrite scalar members (numbers, booleans) as strings in place.
///
/// Hosts have emitted ids as bare numbers; those still name templates.
/// Null, array and object members cannot be interpreted and are drift.
pub fn normalize_filter(filter: &mut [Value]) -> Result<(), SchemaDrift> {
    for member in filter.iter_mut() {
        match member {
            Value::String(_) => {}
            Value::Number(number) => *member = Value::String(number.to_string()),
            Value::Bool(flag) => *member = Value::String(flag.to_string()),
            other => {
                return Err(SchemaDrift::new(format!(
                    "filter member is {} rather than a template id",
                    json_kind(other)
                )));
            }
        }
    }
    Ok(())
}

/// Read-only check that `slot` can be patched without drift.
pub fn check_slot(schema: &dyn SchemaView, slot: &Value) -> Result<(), SchemaDrift> {
    let Some(filter) = schema.first_filter(slot)? else {
        return Ok(());
    };
    match filter.iter().find(|member| !is_id_member(member)) {
        Some(member) => Err(SchemaDrift::new(format!(
            "filter member is {} rather than a template id",
            json_kind(member)
        ))),
        None => Ok(()),
    }
}

/// Read-only check of every slot in `group` of `item`.
///
/// Passes run this before writing so a drifted template is left untouched.
pub fn check_slot_group(
    schema: &dyn SchemaView,
    item: &Value,
    group: SlotGroup,
) -> Result<(), SchemaDrift> {
    let Some(slots) = schema.slots(item, group)? else {
        return Ok(());
    };
    slots.iter().try_for_each(|slot| check_slot(schema, slot))
}

fn is_id_member(member: &Value) -> bool {
    matches!(member, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Patch one slot's first filter group.
pub fn patch_slot(
    schema: &dyn SchemaView,
    slot: &mut Value,
    candidates: &[TemplateId],
    excludes: &Exclusions,
) -> Result<usize, SchemaDrift> {
    let Some(filter) = schema.first_filter_mut(slot)? else {
        return Ok(0);
    };
    normalize_filter(filter)?;
    Ok(patch_filter(Some(filter), candidates, excludes))
}

/// Outcome of patching every slot of one group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GroupPatch {
    pub slots_patched: usize,
    pub added: usize,
}

impl GroupPatch {
    pub fn merge(&mut self, other: GroupPatch) {
        self.slots_patched += other.slots_patched;
        self.added += other.added;
    }
}

/// Patch every slot in `group` of `item` with `candidates`.
pub fn patch_slot_group(
    schema: &dyn SchemaView,
    item: &mut Value,
    group: SlotGroup,
    candidates: &[TemplateId],
    excludes: &Exclusions,
) -> Result<GroupPatch, SchemaDrift> {
    let mut outcome = GroupPatch::default();
    if candidates.is_empty() {
        return Ok(outcome);
    }
    check_slot_group(schema, item, group)?;
    let Some(slots) = schema.slots_mut(item, group)? else {
        return Ok(outcome);
    };
    for slot in slots.iter_mut() {
        let added = patch_slot(schema, slot, candidates, excludes)?;
        if added > 0 {
            outcome.slots_patched += 1;
            outcome.added += added;
        }
    }
    Ok(outcome)
}
