//! Once-per-process orchestration of the compatibility passes.
//!
//! The coordinator owns the latches: each feature applies at most once until
//! [`Coordinator::reset`] is called, and [`Coordinator::run`] itself is a
//! no-op after the first call. Features run in [`Feature::ALL`] order
//! against the same catalog, so later passes see earlier additions.

use crate::ItemMap;
use crate::catalog::{CaliberIndex, CatalogAccessor, SchemaView, detect_schema};
use crate::compat::stim_buffs::stim_buffs_dir;
use crate::compat::{
    AmmoReport, PassOptions, PlatesReport, StimBuffsReport, WeaponsReport, apply_ammo_compat,
    apply_plates_compat, apply_stim_buffs, apply_weapons_compat,
};
use crate::error::CompatError;
use crate::registry::ClassRegistry;
use crate::rules::{load_rules, rules_dir};
use crate::settings::Settings;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Ammo,
    Weapons,
    Plates,
    StimBuffs,
}

impl Feature {
    /// Application order.
    pub const ALL: [Feature; 4] = [
        Feature::Ammo,
        Feature::Weapons,
        Feature::Plates,
        Feature::StimBuffs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Ammo => "ammo",
            Feature::Weapons => "weapons",
            Feature::Plates => "plates",
            Feature::StimBuffs => "stim_buffs",
        }
    }

    pub fn enabled(&self, settings: &Settings) -> bool {
        match self {
            Feature::Ammo => settings.enable_ammo_compat,
            Feature::Weapons => settings.enable_weapons_compat,
            Feature::Plates => settings.enable_plates_compat,
            Feature::StimBuffs => settings.enable_stim_buffs,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-owned tables the run mutates in place.
pub struct HostTables<'h> {
    pub items: &'h mut ItemMap,
    pub globals: Option<&'h mut Value>,
}

/// Everything the run reads but never writes.
pub struct RunEnvironment<'e> {
    pub mod_root: &'e Path,
    pub settings: &'e Settings,
    pub registry: &'e dyn ClassRegistry,
}

impl RunEnvironment<'_> {
    fn options(&self) -> PassOptions {
        PassOptions {
            strict: self.settings.strict_mode,
            debug: self.settings.debug,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct RunReport {
    pub schema: &'static str,
    pub ammo: Option<AmmoReport>,
    pub weapons: Option<WeaponsReport>,
    pub plates: Option<PlatesReport>,
    pub stim_buffs: Option<StimBuffsReport>,
    pub features_applied: usize,
    /// Disabled by settings, already latched, or missing their input.
    pub skipped: Vec<Feature>,
    pub failed: Vec<Feature>,
    pub warnings: usize,
}

impl RunReport {
    /// Per-item and per-document problems counted by the passes.
    pub fn item_failures(&self) -> usize {
        let ammo = self.ammo.map_or(0, |r| r.items_failed);
        let plates = self.plates.map_or(0, |r| r.items_failed);
        let weapons = self
            .weapons
            .map_or(0, |r| r.weapons_failed + r.rules_rejected + r.rules_skipped);
        let stim = self.stim_buffs.map_or(0, |r| r.skipped);
        ammo + plates + weapons + stim
    }

    /// Log the run summary. [`Coordinator::run_selected`] calls this once per run.
    pub fn emit(&self) {
        info!(
            schema = self.schema,
            applied = self.features_applied,
            skipped = ?self.skipped,
            failed = ?self.failed,
            warnings = self.warnings,
            "compat run finished"
        );
    }
}

#[derive(Debug, Default)]
pub struct Coordinator {
    ran: bool,
    applied: BTreeSet<Feature>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every enabled feature once. `Ok(None)` when already run.
    pub fn run(
        &mut self,
        tables: &mut HostTables<'_>,
        env: &RunEnvironment<'_>,
    ) -> Result<Option<RunReport>, CompatError> {
        if self.ran {
            debug!("compat run already applied; skipping");
            return Ok(None);
        }
        self.ran = true;
        self.run_selected(tables, env, &Feature::ALL).map(Some)
    }

    /// Run `features` in the given order, honoring per-feature latches.
    pub fn run_selected(
        &mut self,
        tables: &mut HostTables<'_>,
        env: &RunEnvironment<'_>,
        features: &[Feature],
    ) -> Result<RunReport, CompatError> {
        let options = env.options();
        let schema = detect_schema(tables.items);
        let mut report = RunReport {
            schema: schema.label(),
            ..RunReport::default()
        };
        let mut index = None;

        for &feature in features {
            if !feature.enabled(env.settings) {
                debug!(%feature, "feature disabled");
                report.skipped.push(feature);
                continue;
            }
            if !self.applied.insert(feature) {
                debug!(%feature, "feature already applied; skipping");
                report.skipped.push(feature);
                continue;
            }
            self.guard(feature, options, &mut report, |report| {
                execute(feature, &mut *tables, env, schema, &mut index, report)
            })?;
        }

        report.warnings += report.item_failures();
        report.emit();
        Ok(report)
    }

    /// Clear every latch.
    pub fn reset(&mut self) {
        self.ran = false;
        self.applied.clear();
    }

    pub fn has_run(&self, feature: Feature) -> bool {
        self.applied.contains(&feature)
    }

    // A failing feature stays latched and is reported; strict mode aborts.
    fn guard(
        &self,
        feature: Feature,
        options: PassOptions,
        report: &mut RunReport,
        body: impl FnOnce(&mut RunReport) -> Result<bool, CompatError>,
    ) -> Result<(), CompatError> {
        match body(report) {
            Ok(true) => report.features_applied += 1,
            Ok(false) => report.skipped.push(feature),
            Err(err) if options.strict => {
                return Err(CompatError::Feature {
                    feature: feature.as_str(),
                    source: Box::new(err),
                });
            }
            Err(err) => {
                warn!(%feature, error = %err, "feature failed; disabled for this run");
                report.failed.push(feature);
                report.warnings += 1;
            }
        }
        Ok(())
    }
}

// Returns false when the feature had nothing to work on.
fn execute(
    feature: Feature,
    tables: &mut HostTables<'_>,
    env: &RunEnvironment<'_>,
    schema: &'static dyn SchemaView,
    index: &mut Option<CaliberIndex>,
    report: &mut RunReport,
) -> Result<bool, CompatError> {
    let options = env.options();
    match feature {
        Feature::Ammo => {
            let mut catalog = CatalogAccessor::new(tables.items, schema);
            let index = index.get_or_insert_with(|| catalog.caliber_index());
            report.ammo = Some(apply_ammo_compat(&mut catalog, index, options)?);
        }
        Feature::Weapons => {
            let rules = load_rules(&rules_dir(env.mod_root), options.strict)?;
            let mut catalog = CatalogAccessor::new(tables.items, schema);
            let index = index.get_or_insert_with(|| catalog.caliber_index());
            report.weapons = Some(apply_weapons_compat(&mut catalog, index, &rules, options)?);
        }
        Feature::Plates => {
            let mut catalog = CatalogAccessor::new(tables.items, schema);
            report.plates = Some(apply_plates_compat(&mut catalog, env.registry, options)?);
        }
        Feature::StimBuffs => {
            let Some(globals) = tables.globals.as_deref_mut() else {
                debug!("no globals supplied; stim buffs skipped");
                return Ok(false);
            };
            let dir = stim_buffs_dir(env.mod_root);
            report.stim_buffs = Some(apply_stim_buffs(globals, &dir, options)?);
        }
    }
    Ok(true)
}
