//! Caliber inference for templates that accept ammunition but declare none.

use crate::ItemMap;
use crate::catalog::CaliberKey;
use crate::catalog::schema::{SchemaView, SlotGroup};

/// Read-only view used to infer magazine calibers from their own filters.
#[derive(Clone, Copy)]
pub struct CaliberResolver<'c> {
    items: &'c ItemMap,
    schema: &'c dyn SchemaView,
}

impl<'c> CaliberResolver<'c> {
    pub fn new(items: &'c ItemMap, schema: &'c dyn SchemaView) -> Self {
        Self { items, schema }
    }

    /// Single-hop caliber of a cartridge-holding template.
    ///
    /// Follows the first member of the first cartridge slot's filter to an
    /// ammunition template and returns its caliber. The cartridge filter is
    /// assumed to hold one caliber only; later members are never inspected.
    /// Templates declaring their own caliber are not resolved.
    pub fn resolve(&self, item: &'c serde_json::Value) -> Option<&'c str> {
        if self.schema.caliber(item).is_some() {
            return None;
        }
        let cartridges = self.schema.slots(item, SlotGroup::Cartridges).ok()??;
        let first_slot = cartridges.first()?;
        let filter = self.schema.first_filter(first_slot).ok()??;
        let first_ammo = filter.first()?.as_str()?;
        let ammo = self.items.get(first_ammo)?;
        self.schema.caliber(ammo)
    }

    /// Whether any cartridge slot of `magazine` accepts ammunition of `caliber`.
    ///
    /// Unlike [`resolve`](Self::resolve) this scans every member of every
    /// cartridge slot's first filter group.
    pub fn accepts_caliber(&self, magazine: &serde_json::Value, caliber: &CaliberKey) -> bool {
        let Ok(Some(cartridges)) = self.schema.slots(magazine, SlotGroup::Cartridges) else {
            return false;
        };
        cartridges.iter().any(|slot| {
            let Ok(Some(filter)) = self.schema.first_filter(slot) else {
                return false;
            };
            filter
                .iter()
                .filter_map(serde_json::Value::as_str)
                .filter_map(|id| self.items.get(id))
                .filter_map(|ammo| self.schema.caliber(ammo))
                .any(|declared| caliber.matches(declared))
        })
    }
}
