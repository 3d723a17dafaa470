//! Ammunition inference pass.
//!
//! Weapons that declare a caliber get every ammunition template of that
//! caliber in their chamber and internal cartridge filters. Magazines, which
//! declare no caliber, get the same treatment through the caliber resolved
//! from their own cartridge filter.

use crate::catalog::{
    CaliberIndex, CatalogAccessor, Exclusions, SchemaView, SlotGroup, TemplateId,
    check_slot_group, patch_slot_group,
};
use crate::compat::{PassOptions, record_drift};
use crate::error::{CompatError, SchemaDrift};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

const PASS: &str = "ammo";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AmmoReport {
    pub weapons_patched: usize,
    pub weapon_entries_added: usize,
    pub magazines_patched: usize,
    pub magazine_entries_added: usize,
    pub items_failed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Consumer {
    Weapon,
    Magazine,
}

impl Consumer {
    fn groups(self) -> &'static [SlotGroup] {
        match self {
            Consumer::Weapon => &[SlotGroup::Chambers, SlotGroup::Cartridges],
            Consumer::Magazine => &[SlotGroup::Cartridges],
        }
    }
}

/// Apply ammunition compatibility to every template once.
pub fn apply_ammo_compat(
    catalog: &mut CatalogAccessor<'_>,
    index: &CaliberIndex,
    options: PassOptions,
) -> Result<AmmoReport, CompatError> {
    let mut report = AmmoReport::default();
    let plan = plan_consumers(catalog, &mut report, options)?;

    let schema = catalog.schema();
    let no_exclusions = Exclusions::new();
    for (id, consumer, caliber) in plan {
        let Some(candidates) = index.ammo_for(&caliber) else {
            continue;
        };
        let Some(template) = catalog.template_mut(&id) else {
            continue;
        };
        let added = match patch_groups(schema, template, consumer.groups(), candidates, &no_exclusions) {
            Ok(added) => added,
            Err(drift) => {
                record_drift(PASS, &id, drift, options.strict, &mut report.items_failed)?;
                continue;
            }
        };
        if added == 0 {
            continue;
        }
        if options.debug {
            debug!(item = %id, ?consumer, caliber = %caliber, added, "ammo filters patched");
        }
        match consumer {
            Consumer::Weapon => {
                report.weapons_patched += 1;
                report.weapon_entries_added += added;
            }
            Consumer::Magazine => {
                report.magazines_patched += 1;
                report.magazine_entries_added += added;
            }
        }
    }

    if options.debug {
        info!(
            weapons = report.weapons_patched,
            weapon_entries = report.weapon_entries_added,
            magazines = report.magazines_patched,
            magazine_entries = report.magazine_entries_added,
            failed = report.items_failed,
            "ammo compat applied"
        );
    }
    Ok(report)
}

// Every group is checked before the first write.
fn patch_groups(
    schema: &dyn SchemaView,
    template: &mut Value,
    groups: &[SlotGroup],
    candidates: &[TemplateId],
    excludes: &Exclusions,
) -> Result<usize, SchemaDrift> {
    check_groups(schema, template, groups)?;
    let mut added = 0;
    for group in groups {
        added += patch_slot_group(schema, template, *group, candidates, excludes)?.added;
    }
    Ok(added)
}

fn check_groups(
    schema: &dyn SchemaView,
    template: &Value,
    groups: &[SlotGroup],
) -> Result<(), SchemaDrift> {
    groups
        .iter()
        .try_for_each(|group| check_slot_group(schema, template, *group))
}

// Read-only phase: decide which templates consume which caliber.
fn plan_consumers(
    catalog: &CatalogAccessor<'_>,
    report: &mut AmmoReport,
    options: PassOptions,
) -> Result<Vec<(String, Consumer, String)>, CompatError> {
    let schema = catalog.schema();
    let resolver = catalog.resolver();
    let mut plan = Vec::new();

    for (id, template) in catalog.items() {
        let consumer = if schema.ammo_caliber(template).is_some() {
            Consumer::Weapon
        } else {
            match schema.slots(template, SlotGroup::Cartridges) {
                Ok(Some(_)) => Consumer::Magazine,
                Ok(None) => continue,
                Err(drift) => {
                    record_drift(PASS, id, drift, options.strict, &mut report.items_failed)?;
                    continue;
                }
            }
        };
        // The resolver treats unreadable filters as "no caliber"; surface them here.
        if let Err(drift) = check_groups(schema, template, consumer.groups()) {
            record_drift(PASS, id, drift, options.strict, &mut report.items_failed)?;
            continue;
        }
        let caliber = match consumer {
            Consumer::Weapon => schema.ammo_caliber(template),
            Consumer::Magazine => resolver.resolve(template),
        };
        match caliber {
            Some(caliber) => plan.push((id.clone(), consumer, caliber.to_string())),
            None => {
                if options.debug {
                    debug!(item = %id, "magazine caliber unresolved");
                }
            }
        }
    }
    Ok(plan)
}
