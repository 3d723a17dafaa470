// Binary behavior: compat-patch and rule-check against temporary mod roots.
mod support;

use anyhow::{Context, Result};
use catalog_compat::load_items;
use serde_json::{Value, json};
use std::fs;
use std::process::Command;

use support::{ModRoot, ammo, magazine, weapon};

fn compat_patch() -> Command {
    Command::new(env!("CARGO_BIN_EXE_compat-patch"))
}

fn rule_check() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rule-check"))
}

#[test]
fn compat_patch_writes_catalog_and_report() -> Result<()> {
    let root = ModRoot::new()?;
    let items_path = root.json(
        "items.json",
        &json!({"data": {
            "a1": ammo("9x19"),
            "m1": magazine(json!(["a1"])),
            "w1": weapon("9x19")
        }}),
    )?;
    root.rule("w1.json", r#"{"weaponTpl": "w1"}"#)?;
    let output = root.path().join("patched.json");
    let report = root.path().join("report.json");

    let status = compat_patch()
        .arg("--items")
        .arg(&items_path)
        .arg("--mod-root")
        .arg(root.path())
        .arg("--output")
        .arg(&output)
        .arg("--report")
        .arg(&report)
        .env_remove("RUST_LOG")
        .status()
        .context("running compat-patch")?;
    assert!(status.success());

    let patched = load_items(&output)?;
    assert_eq!(
        patched["w1"]["_props"]["Chambers"][0]["_props"]["filters"][0]["Filter"],
        json!(["a1"])
    );
    assert_eq!(
        patched["w1"]["_props"]["Slots"][0]["_props"]["filters"][0]["Filter"],
        json!(["m1"])
    );

    let report: Value = serde_json::from_str(&fs::read_to_string(&report)?)?;
    assert_eq!(report["schema"], json!("spt-database"));
    assert_eq!(report["weapons"]["rules_applied"], json!(1));
    assert_eq!(report["skipped"], json!(["stim_buffs"]));
    Ok(())
}

#[test]
fn debug_run_logs_one_summary() -> Result<()> {
    let root = ModRoot::new()?;
    let items_path = root.json("items.json", &json!({"a1": ammo("9x19"), "w1": weapon("9x19")}))?;

    let output = compat_patch()
        .arg("--items")
        .arg(&items_path)
        .arg("--mod-root")
        .arg(root.path())
        .arg("--output")
        .arg(root.path().join("patched.json"))
        .arg("--debug")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .context("running compat-patch")?;
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("compat run finished").count(), 1);
    Ok(())
}

#[test]
fn compat_patch_strict_fails_on_bad_rule() -> Result<()> {
    let root = ModRoot::new()?;
    let items_path = root.json("items.json", &json!({"w1": weapon("9x19")}))?;
    root.rule("broken.json", "{ not json")?;

    let output = compat_patch()
        .arg("--items")
        .arg(&items_path)
        .arg("--mod-root")
        .arg(root.path())
        .arg("--strict")
        .output()
        .context("running compat-patch")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("compat run aborted"), "stderr: {stderr}");
    Ok(())
}

#[test]
fn rule_check_lists_rules_and_flags_rejects() -> Result<()> {
    let root = ModRoot::new()?;
    root.rule("a.json", r#"{"weaponTpl": "w_a", "displayName": "Rifle A"}"#)?;
    let ok = rule_check()
        .arg("--mod-root")
        .arg(root.path())
        .output()
        .context("running rule-check")?;
    assert!(ok.status.success());
    let stdout = String::from_utf8_lossy(&ok.stdout);
    assert!(stdout.contains("Rifle A"), "stdout: {stdout}");

    root.rule("b.json", r#"{"weaponTpl": "w_b", "allowAmmoByCaliber": "yes"}"#)?;
    let bad = rule_check()
        .arg("--mod-root")
        .arg(root.path())
        .output()
        .context("running rule-check")?;
    assert!(!bad.status.success());
    let stdout = String::from_utf8_lossy(&bad.stdout);
    assert!(stdout.contains("rejected"), "stdout: {stdout}");
    Ok(())
}
