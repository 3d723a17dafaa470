// Growth, duplication and indexing guarantees across whole runs.
mod support;

use anyhow::Result;
use catalog_compat::catalog::{CaliberKey, SptDatabaseSchema};
use catalog_compat::{
    CatalogAccessor, Coordinator, FileClassRegistry, HostTables, ItemMap, RunEnvironment,
    SchemaView, Settings,
};
use serde_json::json;

use support::{ModRoot, ammo, duplicate_members, filter_of, magazine, total_filter_len, vest, weapon};

fn mixed_catalog() -> ItemMap {
    let mut items = ItemMap::new();
    items.insert("a9_1".into(), ammo("Caliber9x19PARA"));
    items.insert("a9_2".into(), ammo("caliber9x19para"));
    items.insert("a5_1".into(), ammo("Caliber545x39"));
    items.insert("a5_2".into(), ammo("Caliber545x39"));
    items.insert("m9".into(), magazine(json!(["a9_1"])));
    items.insert("m5".into(), magazine(json!(["a5_1", "a5_1"])));
    items.insert("m_empty".into(), magazine(json!([])));
    items.insert("w9".into(), weapon("Caliber9x19PARA"));
    items.insert("w5".into(), weapon("Caliber545x39"));
    items.insert(
        "plate".into(),
        json!({"_name": "plate", "_parent": "plate_class", "_props": {}}),
    );
    items.insert(
        "insert".into(),
        json!({"_name": "soft_armor_insert", "_parent": "misc", "_props": {}}),
    );
    items.insert(
        "v1".into(),
        vest(&["front_plate", "back_plate", "soft_armor_front", "collar"]),
    );
    items
}

fn registry() -> Result<FileClassRegistry> {
    Ok(serde_json::from_value(json!({"ARMOR_PLATE": "plate_class"}))?)
}

#[test]
fn full_run_twice_adds_nothing_the_second_time() -> Result<()> {
    let root = ModRoot::new()?;
    root.rule("w5.json", r#"{"weaponTpl": "w5"}"#)?;
    let settings = Settings::default();
    let registry = registry()?;
    let env = RunEnvironment {
        mod_root: root.path(),
        settings: &settings,
        registry: &registry,
    };

    let mut items = mixed_catalog();
    let before = total_filter_len(&items);
    let mut coordinator = Coordinator::new();
    {
        let mut tables = HostTables {
            items: &mut items,
            globals: None,
        };
        coordinator.run(&mut tables, &env)?;
    }
    let after_first = total_filter_len(&items);
    assert!(after_first > before);

    coordinator.reset();
    {
        let mut tables = HostTables {
            items: &mut items,
            globals: None,
        };
        let report = coordinator.run(&mut tables, &env)?.unwrap_or_default();
        assert_eq!(report.ammo.map(|r| r.weapon_entries_added + r.magazine_entries_added), Some(0));
        assert_eq!(report.plates.map(|r| r.entries_added), Some(0));
    }
    assert_eq!(total_filter_len(&items), after_first);
    Ok(())
}

#[test]
fn no_filter_gains_a_duplicate() -> Result<()> {
    let root = ModRoot::new()?;
    root.rule("w9.json", r#"{"weaponTpl": "w9", "caliberOverride": "Caliber545x39"}"#)?;
    let settings = Settings::default();
    let registry = registry()?;
    let env = RunEnvironment {
        mod_root: root.path(),
        settings: &settings,
        registry: &registry,
    };

    let mut items = mixed_catalog();
    let mut tables = HostTables {
        items: &mut items,
        globals: None,
    };
    Coordinator::new().run(&mut tables, &env)?;

    // m5 was seeded with a duplicate; the engine neither adds nor removes one.
    assert_eq!(duplicate_members(&items), vec![("m5".to_string(), "a5_1".to_string())]);
    assert_eq!(filter_of(&items, "m5", "Cartridges", 0), json!(["a5_1", "a5_1", "a5_2"]));
    assert_eq!(filter_of(&items, "v1", "Slots", 0), json!(["plate"]));
    assert_eq!(filter_of(&items, "v1", "Slots", 2), json!(["insert"]));
    assert_eq!(filter_of(&items, "v1", "Slots", 3), json!([]));
    Ok(())
}

#[test]
fn exclusions_hold_after_a_full_run() -> Result<()> {
    let root = ModRoot::new()?;
    root.rule(
        "w5.json",
        r#"{"weaponTpl": "w5", "excludeAmmoTpls": ["a5_2"], "excludeMagazineTpls": ["m5"]}"#,
    )?;
    let mut settings = Settings::default();
    settings.enable_ammo_compat = false;
    let registry = registry()?;
    let env = RunEnvironment {
        mod_root: root.path(),
        settings: &settings,
        registry: &registry,
    };

    let mut items = mixed_catalog();
    let mut tables = HostTables {
        items: &mut items,
        globals: None,
    };
    Coordinator::new().run(&mut tables, &env)?;

    let chamber = filter_of(&items, "w5", "Chambers", 0);
    assert_eq!(chamber, json!(["a5_1"]));
    assert_eq!(filter_of(&items, "w5", "Slots", 0), json!([]));
    Ok(())
}

#[test]
fn caliber_index_lists_each_ammo_under_its_caliber_only() {
    let mut items = mixed_catalog();
    let catalog = CatalogAccessor::new(&mut items, &SptDatabaseSchema);
    let index = catalog.caliber_index();
    assert_eq!(index.len(), 2);

    for (id, template) in catalog.items() {
        let Some(caliber) = SptDatabaseSchema.caliber(template) else {
            continue;
        };
        let own = CaliberKey::new(caliber).unwrap();
        for key in index.calibers() {
            let members = index.ammo_for(key.as_str()).unwrap();
            let listed = members.iter().any(|member| member.as_str() == id.as_str());
            assert_eq!(listed, *key == own, "{id} under {key}");
        }
    }

    let nine: Vec<&str> = index
        .ammo_for("CALIBER9X19PARA")
        .unwrap()
        .iter()
        .map(|id| id.as_str())
        .collect();
    assert_eq!(nine, vec!["a9_1", "a9_2"]);
}

#[test]
fn resolver_follows_first_member_only() {
    let mut items = mixed_catalog();
    let catalog = CatalogAccessor::new(&mut items, &SptDatabaseSchema);
    let resolver = catalog.resolver();
    assert_eq!(resolver.resolve(&catalog.items()["m9"]), Some("Caliber9x19PARA"));
    assert_eq!(resolver.resolve(&catalog.items()["m_empty"]), None);
    assert_eq!(resolver.resolve(&catalog.items()["a9_1"]), None);
}
