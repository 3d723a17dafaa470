//! Item catalog wiring.
//!
//! The catalog itself belongs to the host: a map from template id to the raw
//! template JSON. This module wraps it so passes read through a
//! [`SchemaView`] and write only slot filter sets and the weapon caliber hint.
//! Use [`CaliberIndex`] for caliber lookups and [`CaliberResolver`] to infer
//! the caliber of cartridge-holding templates.

pub mod filter;
pub mod identity;
pub mod index;
pub mod resolver;
pub mod schema;

pub use filter::{
    Exclusions, GroupPatch, check_slot, check_slot_group, patch_filter, patch_slot,
    patch_slot_group,
};
pub use identity::{CaliberKey, InvalidTemplateId, TemplateId};
pub use index::CaliberIndex;
pub use resolver::CaliberResolver;
pub use schema::{
    Field, SchemaView, ServerModelSchema, SlotGroup, SptDatabaseSchema, detect_schema,
    schema_by_label,
};

use crate::ItemMap;
use serde_json::Value;

/// Read/write facade over the host's template map.
pub struct CatalogAccessor<'c> {
    items: &'c mut ItemMap,
    schema: &'c dyn SchemaView,
}

impl<'c> CatalogAccessor<'c> {
    pub fn new(items: &'c mut ItemMap, schema: &'c dyn SchemaView) -> Self {
        Self { items, schema }
    }

    /// Wrap `items` using whichever schema adapter matches its templates.
    pub fn detect(items: &'c mut ItemMap) -> Self {
        let schema = detect_schema(items);
        Self { items, schema }
    }

    pub fn schema(&self) -> &'c dyn SchemaView {
        self.schema
    }

    /// Every template keyed by id, in catalog order.
    pub fn items(&self) -> &ItemMap {
        self.items
    }

    pub fn template(&self, id: &str) -> Option<&Value> {
        self.items.get(id)
    }

    pub fn template_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.items.get_mut(id)
    }

    pub fn templates_mut(&mut self) -> impl Iterator<Item = (&String, &mut Value)> {
        self.items.iter_mut()
    }

    pub fn caliber_index(&self) -> CaliberIndex {
        CaliberIndex::build(self.items, self.schema)
    }

    pub fn resolver(&self) -> CaliberResolver<'_> {
        CaliberResolver::new(self.items, self.schema)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
