//! Compatibility passes.
//!
//! Each pass scans the catalog once and writes only through
//! [`crate::catalog::filter`]. Passes share one policy for structural
//! failures on a single template: count and log it, or abort when strict.

pub mod ammo;
pub mod armor_class;
pub mod plates;
pub mod stim_buffs;
pub mod weapons;

pub use ammo::{AmmoReport, apply_ammo_compat};
pub use armor_class::{ArmorSlotClass, InsertSource, classify_slot, is_soft_insert_name};
pub use plates::{PlatesReport, apply_plates_compat};
pub use stim_buffs::{StimBuffsReport, apply_stim_buffs};
pub use weapons::{WeaponsReport, apply_weapons_compat};

use crate::error::{CompatError, SchemaDrift};
use tracing::warn;

/// Run policy handed to every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassOptions {
    pub strict: bool,
    pub debug: bool,
}

impl PassOptions {
    pub fn with_strict(self, strict: bool) -> Self {
        Self { strict, ..self }
    }
}

/// Count a per-template failure, or escalate it when `strict`.
pub(crate) fn record_drift(
    pass: &'static str,
    item: &str,
    drift: SchemaDrift,
    strict: bool,
    failures: &mut usize,
) -> Result<(), CompatError> {
    *failures += 1;
    if strict {
        return Err(drift.on_item(item));
    }
    warn!(pass, item, error = %drift, "template skipped");
    Ok(())
}
