//! Base-class lookups supplied by an external class registry.
//!
//! The registry is optional. When it is missing, or does not know a class,
//! callers fall back to heuristics or inject nothing.

use crate::catalog::TemplateId;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Registry document location relative to the mod root.
pub const REGISTRY_RELATIVE_PATH: &str = "config/class_registry.json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BaseClass {
    ArmorPlate,
    ArmorInsert,
}

impl BaseClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseClass::ArmorPlate => "ARMOR_PLATE",
            BaseClass::ArmorInsert => "ARMOR_INSERT",
        }
    }
}

pub trait ClassRegistry {
    /// Template id of the base class, or `None` when unknown.
    fn base_class(&self, class: BaseClass) -> Option<TemplateId>;
}

/// Stand-in used when no registry collaborator is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClassRegistry;

impl ClassRegistry for NoClassRegistry {
    fn base_class(&self, _class: BaseClass) -> Option<TemplateId> {
        None
    }
}

/// Registry constants read from a JSON document.
#[derive(Debug, Default, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct FileClassRegistry {
    #[serde(alias = "ARMOR_PLATE")]
    pub armor_plate: Option<TemplateId>,
    #[serde(alias = "ARMOR_INSERT")]
    pub armor_insert: Option<TemplateId>,
}

impl FileClassRegistry {
    pub fn default_path(mod_root: &Path) -> PathBuf {
        mod_root.join(REGISTRY_RELATIVE_PATH)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading class registry {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing class registry {}", path.display()))
    }

    /// `Ok(None)` when the document does not exist.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }
}

impl ClassRegistry for FileClassRegistry {
    fn base_class(&self, class: BaseClass) -> Option<TemplateId> {
        match class {
            BaseClass::ArmorPlate => self.armor_plate.clone(),
            BaseClass::ArmorInsert => self.armor_insert.clone(),
        }
    }
}
