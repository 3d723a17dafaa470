//! Rule-driven weapon pass.
//!
//! Applies each loaded [`WeaponCompatRule`](crate::rules::WeaponCompatRule)
//! in load order. Rules naming the same weapon compose: filters only grow.

use crate::catalog::{
    CaliberIndex, CaliberKey, CatalogAccessor, Exclusions, SchemaView, SlotGroup, TemplateId,
    check_slot, check_slot_group, patch_slot, patch_slot_group,
};
use crate::compat::{PassOptions, record_drift};
use crate::error::{CompatError, SchemaDrift};
use crate::rules::{LoadedRule, RuleSet};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

const PASS: &str = "weapons";
const MAGAZINE_SLOT: &str = "mod_magazine";
const AMMO_GROUPS: [SlotGroup; 2] = [SlotGroup::Chambers, SlotGroup::Cartridges];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeaponsReport {
    pub rules_loaded: usize,
    pub rules_rejected: usize,
    pub rules_applied: usize,
    pub rules_skipped: usize,
    pub calibers_overridden: usize,
    pub ammo_entries_added: usize,
    pub magazine_entries_added: usize,
    pub weapons_failed: usize,
}

#[derive(Debug, Default)]
struct RulePatch {
    overridden: bool,
    ammo_added: usize,
    magazines_added: usize,
}

/// Apply every rule in `rules` against the catalog.
///
/// Unknown weapons and weapons without any caliber are skipped with a
/// warning and never escalate. Structural failures follow each rule's
/// effective strictness.
pub fn apply_weapons_compat(
    catalog: &mut CatalogAccessor<'_>,
    index: &CaliberIndex,
    rules: &RuleSet,
    options: PassOptions,
) -> Result<WeaponsReport, CompatError> {
    let mut report = WeaponsReport {
        rules_loaded: rules.rules.len(),
        rules_rejected: rules.rejected.len(),
        ..WeaponsReport::default()
    };
    if rules.is_empty() {
        if options.debug {
            info!(rejected = report.rules_rejected, "no weapon compat rules found");
        }
        return Ok(report);
    }

    let schema = catalog.schema();
    for loaded in &rules.rules {
        let rule = &loaded.rule;
        let weapon_id = rule.weapon_tpl.as_str();

        let Some(caliber) = effective_caliber(catalog, loaded) else {
            report.rules_skipped += 1;
            continue;
        };
        let ammo = if rule.allow_ammo_by_caliber {
            index.ammo_for(&caliber).unwrap_or(&[])
        } else {
            &[]
        };
        let magazines = if rule.allow_magazines_by_caliber {
            magazines_for(catalog, &caliber)
        } else {
            Vec::new()
        };

        let Some(weapon) = catalog.template_mut(weapon_id) else {
            report.rules_skipped += 1;
            continue;
        };
        match patch_weapon(schema, weapon, loaded, ammo, &magazines) {
            Ok(patch) => {
                if options.debug {
                    debug!(
                        rule = rule.label(),
                        weapon = weapon_id,
                        caliber = %caliber,
                        ammo = patch.ammo_added,
                        magazines = patch.magazines_added,
                        "weapon rule applied"
                    );
                }
                report.rules_applied += 1;
                report.calibers_overridden += usize::from(patch.overridden);
                report.ammo_entries_added += patch.ammo_added;
                report.magazine_entries_added += patch.magazines_added;
            }
            Err(drift) => {
                record_drift(PASS, weapon_id, drift, loaded.strict, &mut report.weapons_failed)?;
            }
        }
    }

    info!(
        rules = report.rules_loaded,
        rejected = report.rules_rejected,
        applied = report.rules_applied,
        skipped = report.rules_skipped,
        ammo_entries = report.ammo_entries_added,
        magazine_entries = report.magazine_entries_added,
        failed = report.weapons_failed,
        "weapons compat applied"
    );
    Ok(report)
}

// Override first, then the weapon's own hint. Warns on the reference errors.
fn effective_caliber(catalog: &CatalogAccessor<'_>, loaded: &LoadedRule) -> Option<String> {
    let rule = &loaded.rule;
    let Some(weapon) = catalog.template(rule.weapon_tpl.as_str()) else {
        warn!(
            rule = rule.label(),
            weapon = %rule.weapon_tpl,
            file = %loaded.source.display(),
            "weapon template not found; rule skipped"
        );
        return None;
    };
    let caliber = rule
        .caliber_override()
        .or_else(|| catalog.schema().ammo_caliber(weapon));
    if caliber.is_none() {
        warn!(
            rule = rule.label(),
            weapon = %rule.weapon_tpl,
            "weapon has no ammo caliber and the rule gives no override; rule skipped"
        );
    }
    caliber.map(str::to_string)
}

/// Every template whose cartridge slots accept ammunition of `caliber`.
fn magazines_for(catalog: &CatalogAccessor<'_>, caliber: &str) -> Vec<TemplateId> {
    let Some(key) = CaliberKey::new(caliber) else {
        return Vec::new();
    };
    let resolver = catalog.resolver();
    catalog
        .items()
        .iter()
        .filter(|(_, template)| resolver.accepts_caliber(template, &key))
        .filter_map(|(id, _)| TemplateId::new(id.as_str()).ok())
        .collect()
}

// Checks everything it will touch first, so a drifted weapon stays as it was.
fn patch_weapon(
    schema: &dyn SchemaView,
    weapon: &mut Value,
    loaded: &LoadedRule,
    ammo: &[TemplateId],
    magazines: &[TemplateId],
) -> Result<RulePatch, SchemaDrift> {
    let rule = &loaded.rule;
    check_weapon(schema, weapon, loaded, ammo, magazines)?;
    let mut patch = RulePatch::default();

    if !ammo.is_empty() {
        let excludes = rule.ammo_exclusions();
        for group in AMMO_GROUPS {
            patch.ammo_added += patch_slot_group(schema, weapon, group, ammo, &excludes)?.added;
        }
    }

    if !magazines.is_empty() {
        patch.magazines_added =
            patch_magazine_slot(schema, weapon, magazines, &rule.magazine_exclusions())?;
    }

    if let Some(caliber) = rule.caliber_override() {
        schema.set_ammo_caliber(weapon, caliber)?;
        patch.overridden = true;
    }
    Ok(patch)
}

fn check_weapon(
    schema: &dyn SchemaView,
    weapon: &Value,
    loaded: &LoadedRule,
    ammo: &[TemplateId],
    magazines: &[TemplateId],
) -> Result<(), SchemaDrift> {
    if loaded.rule.caliber_override().is_some() && schema.properties(weapon).is_none() {
        return Err(SchemaDrift::new("template has no properties object"));
    }
    if !ammo.is_empty() {
        for group in AMMO_GROUPS {
            check_slot_group(schema, weapon, group)?;
        }
    }
    if !magazines.is_empty() {
        if let Some(slot) = magazine_slot(schema, weapon)? {
            check_slot(schema, slot)?;
        }
    }
    Ok(())
}

fn is_magazine_slot(schema: &dyn SchemaView, slot: &Value) -> bool {
    schema
        .slot_name(slot)
        .is_some_and(|name| name.eq_ignore_ascii_case(MAGAZINE_SLOT))
}

fn magazine_slot<'v>(
    schema: &dyn SchemaView,
    weapon: &'v Value,
) -> Result<Option<&'v Value>, SchemaDrift> {
    let Some(slots) = schema.slots(weapon, SlotGroup::Slots)? else {
        return Ok(None);
    };
    Ok(slots.iter().find(|slot| is_magazine_slot(schema, slot)))
}

fn patch_magazine_slot(
    schema: &dyn SchemaView,
    weapon: &mut Value,
    magazines: &[TemplateId],
    excludes: &Exclusions,
) -> Result<usize, SchemaDrift> {
    let Some(slots) = schema.slots_mut(weapon, SlotGroup::Slots)? else {
        return Ok(0);
    };
    match slots.iter_mut().find(|slot| is_magazine_slot(schema, slot)) {
        Some(slot) => patch_slot(schema, slot, magazines, excludes),
        None => Ok(0),
    }
}
