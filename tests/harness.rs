use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use webbasics::harness::{HarnessOptions, run_harness};
use webbasics::site::discover_pages;

#[test]
fn harness_passes_every_reference_scenario() -> Result<()> {
    let temp = tempdir()?;
    let report = run_harness(&HarnessOptions {
        site_dir: site_dir(),
        store_path: temp.path().join("state/storage.json"),
    })?;

    for check in &report.checks {
        assert!(check.passed, "{} failed: {}", check.name, check.detail);
    }
    assert!(report.all_passed());
    assert_eq!(report.passed, 10);
    assert!(report.check("checklist_persistence").is_some());

    Ok(())
}

#[test]
fn harness_starts_from_a_clean_store() -> Result<()> {
    let temp = tempdir()?;
    let store_path = temp.path().join("storage.json");
    std::fs::write(&store_path, r#"{"progress-html":"{\"step-2\":true}"}"#)?;

    let report = run_harness(&HarnessOptions {
        site_dir: site_dir(),
        store_path: store_path.clone(),
    })?;

    assert!(report.all_passed());
    let stored: BTreeMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(&store_path)?)?;
    assert_eq!(stored.get("progress-html").map(String::as_str), Some("{}"));

    Ok(())
}

#[test]
fn fixture_site_declares_every_page() -> Result<()> {
    let pages = discover_pages(&site_dir())?;
    let mut names: Vec<&str> = pages.iter().map(|page| page.name.as_str()).collect();
    names.sort();

    assert_eq!(names, vec!["css", "home", "html", "js", "playground"]);

    Ok(())
}

fn site_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("site")
}
