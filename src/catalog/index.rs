//! Caliber index: which ammunition templates share a caliber.
//!
//! The index is rebuilt for every run because the catalog may have changed
//! between runs in the same process. Keys are compared case-insensitively;
//! members keep catalog iteration order and never repeat.

use crate::ItemMap;
use crate::catalog::schema::SchemaView;
use crate::catalog::{CaliberKey, TemplateId};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
/// Ammunition ids grouped by normalized caliber.
pub struct CaliberIndex {
    by_caliber: BTreeMap<CaliberKey, Vec<TemplateId>>,
}

impl CaliberIndex {
    /// Build the index in one scan over `items`.
    ///
    /// Templates without a caliber (or with a blank one) are skipped, as are
    /// catalog keys that are not valid template ids.
    pub fn build(items: &ItemMap, schema: &dyn SchemaView) -> Self {
        let mut by_caliber: BTreeMap<CaliberKey, Vec<TemplateId>> = BTreeMap::new();
        for (id, template) in items {
            let Some(key) = schema.caliber(template).and_then(CaliberKey::new) else {
                continue;
            };
            let Ok(id) = TemplateId::new(id.as_str()) else {
                continue;
            };
            let members = by_caliber.entry(key).or_default();
            if !members.contains(&id) {
                members.push(id);
            }
        }
        Self { by_caliber }
    }

    /// Ammunition ids for `caliber`, if any template declares it.
    pub fn ammo_for(&self, caliber: &str) -> Option<&[TemplateId]> {
        let key = CaliberKey::new(caliber)?;
        self.by_caliber.get(&key).map(Vec::as_slice)
    }

    /// Iterates calibers in stable order.
    pub fn calibers(&self) -> impl Iterator<Item = &CaliberKey> {
        self.by_caliber.keys()
    }

    pub fn len(&self) -> usize {
        self.by_caliber.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_caliber.is_empty()
    }
}
