//! Armor slot and insert classification.
//!
//! Pure functions; nothing here touches the catalog mutably.

use crate::ItemMap;
use crate::catalog::{SchemaView, TemplateId};
use serde::Serialize;

pub const HARD_PLATE_SLOT_NAMES: [&str; 4] = [
    "front_plate",
    "back_plate",
    "left_side_plate",
    "right_side_plate",
];

pub const SOFT_INSERT_SLOT_NAMES: [&str; 6] = [
    "soft_armor_front",
    "soft_armor_back",
    "soft_armor_left",
    "soft_armor_right",
    "soft_insert",
    "soft_inserts",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmorSlotClass {
    HardPlate,
    SoftInsert,
}

/// Classify a slot by name.
///
/// Order: exact hard-plate names, exact soft-insert names, then substring
/// rules. A name containing "plate" but not "soft" is a hard-plate slot; a
/// name containing "soft" and either "armor" or "insert" is a soft-insert
/// slot. Everything else is `None`.
pub fn classify_slot(name: &str) -> Option<ArmorSlotClass> {
    let lower = name.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    if HARD_PLATE_SLOT_NAMES.contains(&lower.as_str()) {
        return Some(ArmorSlotClass::HardPlate);
    }
    if SOFT_INSERT_SLOT_NAMES.contains(&lower.as_str()) {
        return Some(ArmorSlotClass::SoftInsert);
    }
    if lower.contains("plate") && !lower.contains("soft") {
        return Some(ArmorSlotClass::HardPlate);
    }
    if is_soft_insert_name(&lower) {
        return Some(ArmorSlotClass::SoftInsert);
    }
    None
}

/// Name heuristic shared by soft-insert slots and soft-insert templates.
pub fn is_soft_insert_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("soft") && (lower.contains("armor") || lower.contains("insert"))
}

/// How the soft-insert candidate set was found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertSource {
    #[default]
    None,
    BaseClass,
    NameHeuristic,
}

/// Templates whose parent class equals `parent` (ASCII case-insensitive).
pub fn collect_by_parent(
    items: &ItemMap,
    schema: &dyn SchemaView,
    parent: &TemplateId,
) -> Vec<TemplateId> {
    items
        .iter()
        .filter(|(_, template)| {
            schema
                .parent_id(template)
                .is_some_and(|declared| declared.eq_ignore_ascii_case(parent.as_str()))
        })
        .filter_map(|(id, _)| TemplateId::new(id.as_str()).ok())
        .collect()
}

/// Soft-insert candidates: by base class first, by display name otherwise.
pub fn collect_soft_inserts(
    items: &ItemMap,
    schema: &dyn SchemaView,
    insert_parent: Option<&TemplateId>,
) -> (Vec<TemplateId>, InsertSource) {
    if let Some(parent) = insert_parent {
        let by_parent = collect_by_parent(items, schema, parent);
        if !by_parent.is_empty() {
            return (by_parent, InsertSource::BaseClass);
        }
    }

    let by_name: Vec<TemplateId> = items
        .iter()
        .filter(|(_, template)| schema.display_name(template).is_some_and(is_soft_insert_name))
        .filter_map(|(id, _)| TemplateId::new(id.as_str()).ok())
        .collect();
    if by_name.is_empty() {
        (by_name, InsertSource::None)
    } else {
        (by_name, InsertSource::NameHeuristic)
    }
}
