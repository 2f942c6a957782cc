use crate::checklist::storage_key;
use crate::config::{SiteConfig, StorageBackend};
use crate::dom::{HeadlessDom, Surface};
use crate::model::{ChecklistState, ProfileState};
use crate::page::PageSession;
use crate::site::read_page;
use crate::store::{MemoryBackend, PersistedStore};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub site_dir: PathBuf,
    pub store_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessCheck {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub passed: usize,
    pub failed: usize,
    pub checks: Vec<HarnessCheck>,
}

impl HarnessReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn check(&self, name: &str) -> Option<&HarnessCheck> {
        self.checks.iter().find(|check| check.name == name)
    }
}

/// Replays the site's reference scenarios against a fresh file-backed store.
pub fn run_harness(options: &HarnessOptions) -> Result<HarnessReport> {
    if options.store_path.exists() {
        std::fs::remove_file(&options.store_path)?;
    }

    let mut config = SiteConfig::default();
    config.site.root = options.site_dir.clone();
    config.storage.backend = StorageBackend::File;
    config.storage.path = options.store_path.clone();

    let html_page = load(&options.site_dir, "html.html")?;
    let playground_page = load(&options.site_dir, "playground.html")?;

    let checks = vec![
        store_round_trip(&config),
        fallback_purity(),
        checklist_persistence(&config, &html_page)?,
        checklist_reset(&config, &html_page)?,
        like_dual_trigger(&config, &playground_page)?,
        dark_dual_trigger(&config, &playground_page)?,
        links_coercion(&config, &playground_page)?,
        numeric_fallback(&config, &playground_page)?,
        playground_reset(&config, &playground_page)?,
        render_idempotence(&config, &playground_page),
    ];

    let passed = checks.iter().filter(|check| check.passed).count();
    let failed = checks.len() - passed;
    info!(passed, failed, "harness complete");

    Ok(HarnessReport {
        passed,
        failed,
        checks,
    })
}

fn load(site_dir: &std::path::Path, file: &str) -> Result<HeadlessDom> {
    let path = site_dir.join(file);
    let page = read_page(&path).with_context(|| format!("harness page {file} missing"))?;
    Ok(page.dom)
}

fn check(name: &'static str, passed: bool, detail: impl Into<String>) -> HarnessCheck {
    HarnessCheck {
        name,
        passed,
        detail: detail.into(),
    }
}

fn store_round_trip(config: &SiteConfig) -> HarnessCheck {
    let mut store = config.open_store();
    let checklist = ChecklistState::from([("step-1", true), ("step-2", false)]);
    let profile = ProfileState::default();

    store.save("harness-checklist", &checklist);
    store.save("harness-profile", &profile);
    let loaded_checklist: ChecklistState =
        store.load("harness-checklist", ChecklistState::default());
    let loaded_profile: ProfileState = store.load("harness-profile", ProfileState {
        name: String::new(),
        ..ProfileState::default()
    });

    let available = store.is_available();
    check(
        "store_round_trip",
        available && loaded_checklist == checklist && loaded_profile == profile,
        format!("available={available} checklist={loaded_checklist:?}"),
    )
}

fn fallback_purity() -> HarnessCheck {
    let fallback = ChecklistState::from([("fallback", true)]);

    let unavailable = PersistedStore::probe(Box::new(MemoryBackend::blocked()));
    let from_unavailable = unavailable.load("progress-html", fallback.clone());

    let mut malformed = PersistedStore::in_memory();
    let wrote = malformed.write_raw("progress-html", "{\"step-1\":").is_ok();
    let from_malformed = malformed.load("progress-html", fallback.clone());
    let from_empty = PersistedStore::in_memory().load("progress-html", fallback.clone());

    check(
        "fallback_purity",
        wrote
            && from_unavailable == fallback
            && from_malformed == fallback
            && from_empty == fallback,
        "unavailable, malformed and empty stores all return the fallback",
    )
}

fn checklist_persistence(config: &SiteConfig, page: &HeadlessDom) -> Result<HarnessCheck> {
    let mut session = PageSession::open(page.clone(), config.open_store(), config);
    let step = session
        .dom()
        .first_attr_value("data-progress", "step-1", None)
        .context("html page has no step-1 toggle")?;
    session.toggle(step, true);
    drop(session);

    let reloaded = PageSession::open(page.clone(), config.open_store(), config);
    let state = reloaded
        .checklist()
        .map(|c| c.state().clone())
        .unwrap_or_default();
    let shown = reloaded.dom().checked(step);

    Ok(check(
        "checklist_persistence",
        state == ChecklistState::from([("step-1", true)]) && shown,
        format!("reloaded {state:?}, toggle checked={shown}"),
    ))
}

fn checklist_reset(config: &SiteConfig, page: &HeadlessDom) -> Result<HarnessCheck> {
    let mut session = PageSession::open(page.clone(), config.open_store(), config);
    let toggles = session.dom().query_attr("data-progress", None);
    for toggle in &toggles {
        session.toggle(*toggle, true);
    }
    let reset = session
        .dom()
        .query_attr("data-reset", None)
        .into_iter()
        .next()
        .context("html page has no reset button")?;
    session.click(reset);

    let state = session
        .checklist()
        .map(|c| c.state().clone())
        .unwrap_or_default();
    let any_checked = toggles.iter().any(|toggle| session.dom().checked(*toggle));
    let stored = session.store().raw(&storage_key(session.page()));

    Ok(check(
        "checklist_reset",
        state.items.is_empty() && !any_checked && stored.as_deref() == Some("{}"),
        format!("stored={stored:?} any_checked={any_checked}"),
    ))
}

fn playground_session(config: &SiteConfig, page: &HeadlessDom) -> PageSession<HeadlessDom> {
    PageSession::open(page.clone(), PersistedStore::in_memory(), config)
}

fn control(session: &PageSession<HeadlessDom>, name: &str) -> Result<crate::dom::NodeId> {
    session
        .dom()
        .first_attr_value("data-profile", name, None)
        .with_context(|| format!("playground has no {name} control"))
}

fn profile(session: &PageSession<HeadlessDom>) -> ProfileState {
    session
        .playground()
        .map(|p| p.state().clone())
        .unwrap_or_default()
}

fn like_dual_trigger(config: &SiteConfig, page: &HeadlessDom) -> Result<HarnessCheck> {
    let mut session = playground_session(config, page);
    session.click(control(&session, "like")?);
    session.click(control(&session, "like-display")?);

    let likes = profile(&session).like_count;
    let shown: Vec<String> = session
        .dom()
        .query_attr_value("data-slot", "likes", None)
        .into_iter()
        .map(|node| session.dom().text(node))
        .collect();

    Ok(check(
        "like_dual_trigger",
        likes == 2 && !shown.is_empty() && shown.iter().all(|text| text == "2"),
        format!("likes={likes} shown={shown:?}"),
    ))
}

fn dark_dual_trigger(config: &SiteConfig, page: &HeadlessDom) -> Result<HarnessCheck> {
    let mut session = playground_session(config, page);
    let checkbox = control(&session, "dark")?;
    session.click(control(&session, "dark-display")?);

    let dark = profile(&session).dark_mode;
    let checked = session.dom().checked(checkbox);

    Ok(check(
        "dark_dual_trigger",
        dark && checked,
        format!("dark={dark} checkbox={checked}"),
    ))
}

fn links_coercion(config: &SiteConfig, page: &HeadlessDom) -> Result<HarnessCheck> {
    let mut session = playground_session(config, page);
    session.input(control(&session, "links")?, "Docs, Music,  , Snacks");
    let links = profile(&session).links;

    Ok(check(
        "links_coercion",
        links == ["Docs", "Music", "Snacks"],
        format!("links={links:?}"),
    ))
}

fn numeric_fallback(config: &SiteConfig, page: &HeadlessDom) -> Result<HarnessCheck> {
    let mut session = playground_session(config, page);
    let pad = control(&session, "pad")?;
    session.input(pad, "24");
    session.input(pad, "twenty");
    let padding = profile(&session).padding;

    Ok(check(
        "numeric_fallback",
        padding == 24,
        format!("padding={padding} after non-numeric input"),
    ))
}

fn playground_reset(config: &SiteConfig, page: &HeadlessDom) -> Result<HarnessCheck> {
    let mut session = playground_session(config, page);
    session.input(control(&session, "name")?, "Jo");
    session.input(control(&session, "radius")?, "30");
    session.toggle(control(&session, "dark")?, true);
    session.click(control(&session, "like")?);

    let reset = session
        .dom()
        .query_attr("data-reset", None)
        .into_iter()
        .next()
        .context("playground has no reset button")?;
    session.click(reset);

    let defaults = &config.playground.profile;
    let state = profile(&session);
    let dom = session.dom();
    let controls_match = dom.value(control(&session, "name")?) == defaults.name
        && dom.value(control(&session, "radius")?) == defaults.corner_radius.to_string()
        && dom.value(control(&session, "links")?) == defaults.links.join(",")
        && dom.checked(control(&session, "dark")?) == defaults.dark_mode;

    let state_matches = state == *defaults;
    Ok(check(
        "playground_reset",
        state_matches && controls_match,
        format!("state={state_matches} controls={controls_match}"),
    ))
}

fn render_idempotence(config: &SiteConfig, page: &HeadlessDom) -> HarnessCheck {
    let mut session = playground_session(config, page);
    session.render();
    let first = session.dom().clone();
    session.render();

    check(
        "render_idempotence",
        *session.dom() == first,
        "second render leaves the view unchanged",
    )
}
