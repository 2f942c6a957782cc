use anyhow::{Context, Result};
use std::path::Path;
use webbasics::config::{NumericFallback, SiteConfig};
use webbasics::dom::{HeadlessDom, NodeId, Surface};
use webbasics::model::{ProfileField, ProfileState};
use webbasics::page::{PageSession, Step};
use webbasics::record::Command;
use webbasics::site::read_page;
use webbasics::store::PersistedStore;

#[test]
fn like_buttons_share_one_counter() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    assert_eq!(profile(&session).like_count, 0);

    session.click(control(&session, "like")?);
    session.click(control(&session, "like-display")?);

    assert_eq!(profile(&session).like_count, 2);
    let slots = session.dom().query_attr_value("data-slot", "likes", None);
    assert_eq!(slots.len(), 2);
    for slot in slots {
        assert_eq!(session.dom().text(slot), "2");
    }

    Ok(())
}

#[test]
fn clicks_inside_the_like_button_bubble_up() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    let button = control(&session, "like-display")?;
    let slots = session.dom().query_attr_value("data-slot", "likes", None);
    let inner = slots
        .iter()
        .copied()
        .find(|slot| session.dom().contains(button, *slot))
        .context("likes slot inside the card button")?;
    let outer = slots
        .iter()
        .copied()
        .find(|slot| *slot != inner)
        .context("second likes slot")?;

    let step: Step = "click:data-slot=likes".parse()?;
    assert!(session.apply_step(&step)?);
    assert_eq!(profile(&session).like_count, 1);
    assert_eq!(session.dom().text(inner), "1");

    assert!(!session.click(outer));
    assert_eq!(profile(&session).like_count, 1);

    Ok(())
}

#[test]
fn card_theme_button_keeps_checkbox_in_sync() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    let checkbox = control(&session, "dark")?;
    let theme_button = control(&session, "dark-display")?;
    let card = card(&session)?;

    session.click(theme_button);
    assert!(profile(&session).dark_mode);
    assert!(session.dom().checked(checkbox));
    assert!(session.dom().has_class(card, "dark"));

    session.toggle(checkbox, false);
    assert!(!profile(&session).dark_mode);
    assert!(!session.dom().has_class(card, "dark"));

    session.click(theme_button);
    session.click(theme_button);
    assert!(!profile(&session).dark_mode);
    assert!(!session.dom().checked(checkbox));

    Ok(())
}

#[test]
fn text_inputs_render_into_the_card() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    let card = card(&session)?;

    session.input(control(&session, "name")?, "sam lee");
    session.input(control(&session, "bio")?, "Draws tiny robots.");
    session.input(control(&session, "color")?, "#ff8800");

    let dom = session.dom();
    let name = dom
        .first_attr_value("data-slot", "name", Some(card))
        .context("name slot")?;
    let bio = dom
        .first_attr_value("data-slot", "bio", Some(card))
        .context("bio slot")?;
    let avatar = dom.query_class("avatar", Some(card))[0];

    assert_eq!(dom.text(name), "sam lee");
    assert_eq!(dom.text(bio), "Draws tiny robots.");
    assert_eq!(dom.text(avatar), "S");
    assert_eq!(card_style(&session, "--profile-color"), "#ff8800");

    session.input(control(&session, "name")?, "");
    assert_eq!(session.dom().text(avatar), "A");

    Ok(())
}

#[test]
fn links_input_becomes_chips() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    session.input(control(&session, "links")?, "Docs, Music,  , Snacks");

    assert_eq!(profile(&session).links, vec!["Docs", "Music", "Snacks"]);
    let list = session
        .dom()
        .first_attr_value("data-slot", "links", None)
        .context("links slot")?;
    assert_eq!(session.dom().items(list), vec!["Docs", "Music", "Snacks"]);

    Ok(())
}

#[test]
fn pixel_fields_render_with_units() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    let card = card(&session)?;

    session.input(control(&session, "pad")?, "24");
    session.input(control(&session, "radius")?, "7.6");

    assert_eq!(profile(&session).padding, 24);
    assert_eq!(profile(&session).corner_radius, 8);
    assert_eq!(card_style(&session, "--profile-pad"), "24px");
    assert_eq!(card_style(&session, "--profile-radius"), "8px");

    Ok(())
}

#[test]
fn bad_numbers_are_rejected_by_default() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    let card = card(&session)?;
    let pad = control(&session, "pad")?;

    assert!(!session.input(pad, "lots"));
    assert!(!session.input(pad, "-4"));
    assert_eq!(profile(&session).padding, 16);
    assert_eq!(card_style(&session, "--profile-pad"), "16px");

    Ok(())
}

#[test]
fn zero_policy_turns_bad_numbers_into_zero() -> Result<()> {
    let mut config = SiteConfig::default();
    config.input.numeric_fallback = NumericFallback::Zero;
    let mut session = open(&config)?;
    let card = card(&session)?;

    assert!(session.input(control(&session, "radius")?, "round"));
    assert_eq!(profile(&session).corner_radius, 0);
    assert_eq!(card_style(&session, "--profile-radius"), "0px");

    Ok(())
}

#[test]
fn reset_restores_defaults_and_controls() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    session.input(control(&session, "name")?, "Jo");
    session.input(control(&session, "links")?, "One, Two");
    session.input(control(&session, "pad")?, "30");
    session.toggle(control(&session, "dark")?, true);
    session.click(control(&session, "like")?);

    let reset = session.dom().query_attr("data-reset", None)[0];
    session.click(reset);

    assert_eq!(profile(&session), ProfileState::default());
    let dom = session.dom();
    assert_eq!(dom.value(control(&session, "name")?), "Alex Kim");
    assert_eq!(dom.value(control(&session, "links")?), "Docs,Music,Snacks");
    assert_eq!(dom.value(control(&session, "pad")?), "16");
    assert_eq!(dom.value(control(&session, "color")?), "#4b8df8");
    assert!(!dom.checked(control(&session, "dark")?));

    Ok(())
}

#[test]
fn configured_defaults_drive_initial_view_and_reset() -> Result<()> {
    let mut config = SiteConfig::default();
    config.playground.profile.name = "Rin".to_string();
    config.playground.profile.padding = 8;
    let mut session = open(&config)?;

    assert_eq!(session.dom().value(control(&session, "name")?), "Rin");
    assert_eq!(session.dom().value(control(&session, "pad")?), "8");

    session.input(control(&session, "name")?, "Someone else");
    let reset = session.dom().query_attr("data-reset", None)[0];
    session.click(reset);
    assert_eq!(profile(&session).name, "Rin");

    Ok(())
}

#[test]
fn render_twice_changes_nothing() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    session.input(control(&session, "links")?, "A, B");
    session.click(control(&session, "like")?);

    session.render();
    let first: HeadlessDom = session.dom().clone();
    session.render();
    assert_eq!(*session.dom(), first);

    Ok(())
}

#[test]
fn profile_is_never_persisted() -> Result<()> {
    let mut session = open(&SiteConfig::default())?;
    session.input(control(&session, "name")?, "Temporary");
    let store = session.into_store();

    let page = read_page(&site_file("playground.html"))?;
    let reopened = PageSession::open(page.dom, store, &SiteConfig::default());
    assert!(reopened.playground().is_some());
    assert_eq!(profile(&reopened).name, "Alex Kim");

    Ok(())
}

#[test]
fn commands_drive_the_record_without_events() -> Result<()> {
    let page = read_page(&site_file("playground.html"))?;
    let mut dom = page.dom;
    let mut store = PersistedStore::in_memory();
    let mut playground = webbasics::playground::setup_playground(
        &mut dom,
        &store,
        &ProfileState::default(),
        NumericFallback::Reject,
    )
    .context("playground card")?;

    assert!(playground.dispatch(
        Command::Increment {
            field: ProfileField::LikeCount,
            by: -5,
        },
        &mut store,
        &mut dom,
    ));
    assert_eq!(playground.state().like_count, 0);

    assert!(!playground.dispatch(
        Command::SetText {
            field: ProfileField::Padding,
            value: "12".to_string(),
        },
        &mut store,
        &mut dom,
    ));

    assert!(playground.dispatch(
        Command::ToggleField {
            field: ProfileField::DarkMode,
            checked: None,
        },
        &mut store,
        &mut dom,
    ));
    let checkbox = dom
        .first_attr_value("data-profile", "dark", None)
        .context("dark checkbox")?;
    assert!(dom.checked(checkbox));

    playground.dispatch(Command::ResetToDefault, &mut store, &mut dom);
    assert_eq!(*playground.state(), ProfileState::default());
    assert!(!dom.checked(checkbox));

    Ok(())
}

fn open(config: &SiteConfig) -> Result<PageSession<HeadlessDom>> {
    let page = read_page(&site_file("playground.html"))?;
    Ok(PageSession::open(
        page.dom,
        PersistedStore::in_memory(),
        config,
    ))
}

fn site_file(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("site")
        .join(name)
}

fn control(session: &PageSession<HeadlessDom>, name: &str) -> Result<NodeId> {
    session
        .dom()
        .first_attr_value("data-profile", name, None)
        .with_context(|| format!("no {name} control"))
}

fn card(session: &PageSession<HeadlessDom>) -> Result<NodeId> {
    session
        .dom()
        .element_by_id("profile-card")
        .context("no profile card")
}

fn card_style(session: &PageSession<HeadlessDom>, property: &str) -> String {
    card(session)
        .ok()
        .and_then(|card| session.dom().style(card, property))
        .unwrap_or_default()
}

fn profile(session: &PageSession<HeadlessDom>) -> ProfileState {
    session
        .playground()
        .map(|p| p.state().clone())
        .unwrap_or_default()
}
