//! Armor plate and soft insert pass.

use crate::catalog::{
    CatalogAccessor, Exclusions, SchemaView, SlotGroup, TemplateId, check_slot, patch_slot,
};
use crate::compat::armor_class::{
    ArmorSlotClass, InsertSource, classify_slot, collect_by_parent, collect_soft_inserts,
};
use crate::compat::{PassOptions, record_drift};
use crate::error::{CompatError, SchemaDrift};
use crate::registry::{BaseClass, ClassRegistry};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

const PASS: &str = "plates";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatesReport {
    pub hard_plates: usize,
    pub soft_inserts: usize,
    pub insert_source: InsertSource,
    pub items_patched: usize,
    pub slots_patched: usize,
    pub entries_added: usize,
    pub items_failed: usize,
}

struct Candidates {
    hard: Vec<TemplateId>,
    soft: Vec<TemplateId>,
}

impl Candidates {
    fn for_class(&self, class: ArmorSlotClass) -> &[TemplateId] {
        match class {
            ArmorSlotClass::HardPlate => &self.hard,
            ArmorSlotClass::SoftInsert => &self.soft,
        }
    }
}

/// Inject plates and soft inserts into every classified armor slot.
///
/// Without a registered plate base class no hard plates are injected.
/// Soft inserts fall back to a display-name heuristic.
pub fn apply_plates_compat(
    catalog: &mut CatalogAccessor<'_>,
    registry: &dyn ClassRegistry,
    options: PassOptions,
) -> Result<PlatesReport, CompatError> {
    let schema = catalog.schema();
    let plate_base = registry.base_class(BaseClass::ArmorPlate);
    let insert_base = registry.base_class(BaseClass::ArmorInsert);

    let hard = match &plate_base {
        Some(base) => collect_by_parent(catalog.items(), schema, base),
        None => {
            debug!("no armor plate base class registered; hard plates skipped");
            Vec::new()
        }
    };
    let (soft, insert_source) = collect_soft_inserts(catalog.items(), schema, insert_base.as_ref());
    let candidates = Candidates { hard, soft };

    let mut report = PlatesReport {
        hard_plates: candidates.hard.len(),
        soft_inserts: candidates.soft.len(),
        insert_source,
        ..PlatesReport::default()
    };

    if candidates.hard.is_empty() && candidates.soft.is_empty() {
        if options.debug {
            info!("plates compat found no candidates");
        }
        return Ok(report);
    }

    for (id, template) in catalog.templates_mut() {
        match patch_armor_slots(schema, template, &candidates) {
            Ok((0, _)) => {}
            Ok((added, slots)) => {
                if options.debug {
                    debug!(item = %id, slots, added, "armor slots patched");
                }
                report.items_patched += 1;
                report.slots_patched += slots;
                report.entries_added += added;
            }
            Err(drift) => {
                record_drift(PASS, id, drift, options.strict, &mut report.items_failed)?;
            }
        }
    }

    if options.debug || report.entries_added > 0 {
        info!(
            hard_plates = report.hard_plates,
            soft_inserts = report.soft_inserts,
            insert_source = ?report.insert_source,
            items = report.items_patched,
            slots = report.slots_patched,
            entries = report.entries_added,
            failed = report.items_failed,
            "plates compat applied"
        );
    }
    Ok(report)
}

// Candidates for `slot`, or None when it is not an armor slot or has nothing to gain.
fn slot_candidates<'c>(
    schema: &dyn SchemaView,
    slot: &Value,
    candidates: &'c Candidates,
) -> Option<&'c [TemplateId]> {
    let class = schema.slot_name(slot).and_then(classify_slot)?;
    let ids = candidates.for_class(class);
    (!ids.is_empty()).then_some(ids)
}

fn check_armor_slots(
    schema: &dyn SchemaView,
    template: &Value,
    candidates: &Candidates,
) -> Result<(), SchemaDrift> {
    let Some(slots) = schema.slots(template, SlotGroup::Slots)? else {
        return Ok(());
    };
    slots
        .iter()
        .filter(|slot| slot_candidates(schema, slot, candidates).is_some())
        .try_for_each(|slot| check_slot(schema, slot))
}

// Returns (entries added, slots changed) for one template. A template with
// any drifted armor slot is left as it was.
fn patch_armor_slots(
    schema: &dyn SchemaView,
    template: &mut Value,
    candidates: &Candidates,
) -> Result<(usize, usize), SchemaDrift> {
    check_armor_slots(schema, template, candidates)?;
    let Some(slots) = schema.slots_mut(template, SlotGroup::Slots)? else {
        return Ok((0, 0));
    };
    let no_exclusions = Exclusions::new();
    let mut added = 0;
    let mut changed = 0;
    for slot in slots.iter_mut() {
        let Some(ids) = slot_candidates(schema, slot, candidates) else {
            continue;
        };
        let delta = patch_slot(schema, slot, ids, &no_exclusions)?;
        if delta > 0 {
            added += delta;
            changed += 1;
        }
    }
    Ok((added, changed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ItemMap;
    use crate::catalog::SptDatabaseSchema;
    use crate::registry::{FileClassRegistry, NoClassRegistry};
    use serde_json::json;

    fn vest() -> Value {
        json!({
            "_name": "vest",
            "_parent": "vest_base",
            "_props": {"Slots": [
                {"_name": "Front_Plate", "_props": {"filters": [{"Filter": []}]}},
                {"_name": "soft_armor_front", "_props": {"filters": [{"Filter": ["s_old"]}]}},
                {"_name": "mod_equipment", "_props": {"filters": [{"Filter": []}]}}
            ]}
        })
    }

    fn catalog() -> ItemMap {
        let mut items = ItemMap::new();
        items.insert("p1".into(), json!({"_name": "plate_1", "_parent": "plate_base", "_props": {}}));
        items.insert("s1".into(), json!({"_name": "Soft_Armor_Insert_1", "_parent": "x", "_props": {}}));
        items.insert("v1".into(), vest());
        items
    }

    fn registry() -> FileClassRegistry {
        FileClassRegistry {
            armor_plate: Some(TemplateId::new("plate_base").unwrap()),
            armor_insert: None,
        }
    }

    #[test]
    fn injects_plates_and_inserts() {
        let mut items = catalog();
        let mut accessor = CatalogAccessor::new(&mut items, &SptDatabaseSchema);
        let report = apply_plates_compat(&mut accessor, &registry(), PassOptions::default()).unwrap();
        assert_eq!(report.hard_plates, 1);
        assert_eq!(report.insert_source, InsertSource::NameHeuristic);
        assert_eq!(report.items_patched, 1);
        assert_eq!(report.slots_patched, 2);
        assert_eq!(report.entries_added, 2);

        let slots = &items["v1"]["_props"]["Slots"];
        assert_eq!(slots[0]["_props"]["filters"][0]["Filter"], json!(["p1"]));
        assert_eq!(slots[1]["_props"]["filters"][0]["Filter"], json!(["s_old", "s1"]));
        assert_eq!(slots[2]["_props"]["filters"][0]["Filter"], json!([]));
    }

    #[test]
    fn no_registry_means_no_hard_plates() {
        let mut items = catalog();
        let mut accessor = CatalogAccessor::new(&mut items, &SptDatabaseSchema);
        let report = apply_plates_compat(&mut accessor, &NoClassRegistry, PassOptions::default()).unwrap();
        assert_eq!(report.hard_plates, 0);
        assert_eq!(report.entries_added, 1);
        assert_eq!(items["v1"]["_props"]["Slots"][0]["_props"]["filters"][0]["Filter"], json!([]));
    }

    #[test]
    fn reapplying_adds_nothing() {
        let mut items = catalog();
        let mut accessor = CatalogAccessor::new(&mut items, &SptDatabaseSchema);
        apply_plates_compat(&mut accessor, &registry(), PassOptions::default()).unwrap();
        let again = apply_plates_compat(&mut accessor, &registry(), PassOptions::default()).unwrap();
        assert_eq!(again.entries_added, 0);
        assert_eq!(again.items_patched, 0);
    }

    #[test]
    fn malformed_slots_are_counted_or_fatal() {
        let mut items = catalog();
        items.insert(
            "bad".into(),
            json!({"_props": {"Slots": [{"_name": "back_plate", "_props": {"filters": [{"Filter": {}}]}}]}}),
        );
        let mut accessor = CatalogAccessor::new(&mut items, &SptDatabaseSchema);
        let report = apply_plates_compat(&mut accessor, &registry(), PassOptions::default()).unwrap();
        assert_eq!(report.items_failed, 1);
        assert_eq!(report.items_patched, 1);

        let strict = PassOptions::default().with_strict(true);
        let err = apply_plates_compat(&mut accessor, &registry(), strict).unwrap_err();
        assert!(matches!(err, CompatError::SchemaDrift { ref item, .. } if item == "bad"));
    }

    #[test]
    fn drifted_vest_keeps_its_good_plate_slot() {
        let mut items = catalog();
        items.insert(
            "v_bad".into(),
            json!({"_props": {"Slots": [
                {"_name": "front_plate", "_props": {"filters": [{"Filter": []}]}},
                {"_name": "back_plate", "_props": {"filters": [{"Filter": [{"id": "p0"}]}]}}
            ]}}),
        );
        let before = items["v_bad"].clone();
        let mut accessor = CatalogAccessor::new(&mut items, &SptDatabaseSchema);
        let report = apply_plates_compat(&mut accessor, &registry(), PassOptions::default()).unwrap();
        assert_eq!(report.items_failed, 1);
        assert_eq!(items["v_bad"], before);
    }
}
