#![allow(dead_code)]

use anyhow::{Context, Result};
use catalog_compat::ItemMap;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn slot(name: &str, filter: Value) -> Value {
    json!({"_name": name, "_props": {"filters": [{"Filter": filter}]}})
}

pub fn ammo(caliber: &str) -> Value {
    json!({"_name": "ammo", "_parent": "ammo_base", "_props": {"Caliber": caliber}})
}

pub fn magazine(filter: Value) -> Value {
    json!({
        "_name": "magazine",
        "_parent": "magazine_base",
        "_props": {"Cartridges": [slot("cartridges", filter)]}
    })
}

pub fn weapon(caliber: &str) -> Value {
    json!({
        "_name": "weapon",
        "_parent": "weapon_base",
        "_props": {
            "ammoCaliber": caliber,
            "Chambers": [slot("patron_in_weapon", json!([]))],
            "Slots": [slot("mod_magazine", json!([]))]
        }
    })
}

pub fn vest(slot_names: &[&str]) -> Value {
    let slots: Vec<Value> = slot_names.iter().map(|name| slot(name, json!([]))).collect();
    json!({"_name": "vest", "_parent": "vest_base", "_props": {"Slots": slots}})
}

/// First filter of `group[index]` on `id`.
pub fn filter_of(items: &ItemMap, id: &str, group: &str, index: usize) -> Value {
    items[id]["_props"][group][index]["_props"]["filters"][0]["Filter"].clone()
}

/// Every id listed more than once in any first filter group of the catalog.
pub fn duplicate_members(items: &ItemMap) -> Vec<(String, String)> {
    let mut duplicates = Vec::new();
    for (id, template) in items {
        for group in ["Slots", "Chambers", "Cartridges"] {
            let Some(slots) = template["_props"][group].as_array() else {
                continue;
            };
            for slot in slots {
                let Some(filter) = slot["_props"]["filters"][0]["Filter"].as_array() else {
                    continue;
                };
                let mut seen = BTreeSet::new();
                for member in filter.iter().filter_map(Value::as_str) {
                    if !seen.insert(member) {
                        duplicates.push((id.clone(), member.to_string()));
                    }
                }
            }
        }
    }
    duplicates
}

pub fn total_filter_len(items: &ItemMap) -> usize {
    items
        .values()
        .flat_map(|template| {
            ["Slots", "Chambers", "Cartridges"]
                .into_iter()
                .filter_map(move |group| template["_props"][group].as_array())
        })
        .flatten()
        .filter_map(|slot| slot["_props"]["filters"][0]["Filter"].as_array())
        .map(Vec::len)
        .sum()
}

/// Temporary mod root with helpers for the documents the engine reads.
pub struct ModRoot {
    dir: TempDir,
}

impl ModRoot {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: TempDir::new().context("allocating mod root")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }

    pub fn rule(&self, file: &str, contents: &str) -> Result<PathBuf> {
        self.write(&format!("config/compat/weapons/{file}"), contents)
    }

    pub fn settings(&self, value: &Value) -> Result<PathBuf> {
        self.write("config/settings.json", &value.to_string())
    }

    pub fn registry(&self, value: &Value) -> Result<PathBuf> {
        self.write("config/class_registry.json", &value.to_string())
    }

    pub fn stim_buff(&self, key: &str, contents: &str) -> Result<PathBuf> {
        self.write(&format!("StimBuffs/{key}.json"), contents)
    }

    pub fn json(&self, relative: &str, value: &Value) -> Result<PathBuf> {
        self.write(relative, &value.to_string())
    }
}
