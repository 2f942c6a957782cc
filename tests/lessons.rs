use anyhow::{Context, Result};
use std::path::Path;
use tempfile::tempdir;
use webbasics::config::{SiteConfig, StorageBackend};
use webbasics::dom::{HeadlessDom, NodeId, Surface};
use webbasics::page::{PageSession, Step};
use webbasics::site::read_page;
use webbasics::store::PersistedStore;
use webbasics::todo::{TODO_KEY, TodoBoard};

#[test]
fn live_card_mirrors_editor_fields() -> Result<()> {
    let mut session = open("html.html", PersistedStore::in_memory())?;
    let preview = by_id(&session, "html-preview")?;
    let title = session.dom().query_tag("h3", Some(preview))[0];
    let button = session.dom().query_tag("button", Some(preview))[0];

    assert_eq!(session.dom().text(title), "Hello, web!");
    assert_eq!(session.dom().text(button), "Say hi");

    let field = session
        .dom()
        .first_attr_value("data-field", "title", None)
        .context("title field")?;
    assert!(session.input(field, "My first page"));
    assert_eq!(session.dom().text(title), "My first page");

    Ok(())
}

#[test]
fn box_sliders_set_custom_properties() -> Result<()> {
    let mut session = open("css.html", PersistedStore::in_memory())?;
    let preview = by_id(&session, "box-preview")?;

    assert_eq!(style(&session, preview, "--pad"), "20px");
    assert_eq!(style(&session, preview, "--hue"), "210");

    let radius = session
        .dom()
        .first_attr_value("data-var", "radius", None)
        .context("radius slider")?;
    session.input(radius, "30");
    assert_eq!(style(&session, preview, "--radius"), "30px");

    Ok(())
}

#[test]
fn flex_selects_drive_alignment() -> Result<()> {
    let mut session = open("css.html", PersistedStore::in_memory())?;
    let demo = by_id(&session, "flex-demo")?;

    assert_eq!(style(&session, demo, "justify-content"), "space-between");
    assert_eq!(style(&session, demo, "align-items"), "center");

    let justify = session
        .dom()
        .first_attr_value("data-flex", "justify", None)
        .context("justify select")?;
    session.select(justify, "center");
    assert_eq!(style(&session, demo, "justify-content"), "center");

    Ok(())
}

#[test]
fn counter_buttons_add_their_delta() -> Result<()> {
    let mut session = open("js.html", PersistedStore::in_memory())?;
    let root = by_id(&session, "js-counter")?;
    let output = session.dom().query_tag("output", Some(root))[0];
    let plus_five = session
        .dom()
        .first_attr_value("data-change", "5", None)
        .context("+5 button")?;
    let minus_one = session
        .dom()
        .first_attr_value("data-change", "-1", None)
        .context("-1 button")?;

    session.click(plus_five);
    session.click(minus_one);
    session.click(minus_one);

    assert_eq!(session.counter().map(|c| *c.state()), Some(3));
    assert_eq!(session.dom().text(output), "3");

    Ok(())
}

#[test]
fn char_counter_counts_characters() -> Result<()> {
    let mut session = open("js.html", PersistedStore::in_memory())?;
    let input = by_id(&session, "char-input")?;
    let count = by_id(&session, "char-count")?;

    assert_eq!(session.dom().text(count), "0");
    session.input(input, "héllo");
    assert_eq!(session.dom().text(count), "5");

    Ok(())
}

#[test]
fn todos_are_added_trimmed_and_persisted() -> Result<()> {
    let temp = tempdir()?;
    let mut config = SiteConfig::default();
    config.storage.backend = StorageBackend::File;
    config.storage.path = temp.path().join("storage.json");

    let mut session = open_with("js.html", config.open_store(), &config)?;
    let form = by_id(&session, "todo-form")?;
    let task = session
        .dom()
        .first_attr_value("name", "task", Some(form))
        .context("task input")?;
    let list = by_id(&session, "todo-list")?;

    session.input(task, "  water the plants ");
    assert!(session.submit(form));
    assert_eq!(session.dom().value(task), "");

    session.input(task, "   ");
    session.submit(form);
    session.input(task, "call grandma");
    session.submit(form);

    assert_eq!(
        session.dom().items(list),
        vec!["water the plants", "call grandma"]
    );
    drop(session);

    let reloaded = open_with("js.html", config.open_store(), &config)?;
    let tasks = reloaded.todos().context("todo board")?.tasks().to_vec();
    assert_eq!(tasks, vec!["water the plants", "call grandma"]);
    assert_eq!(reloaded.dom().items(list), tasks);

    Ok(())
}

#[test]
fn submitted_form_resets_to_the_default_task() -> Result<()> {
    let dom = HeadlessDom::parse(
        r#"<html><body data-page="js">
          <form id="todo-form"><input name="task" value="New task"></form>
          <ul id="todo-list"></ul>
        </body></html>"#,
    )?;
    let config = SiteConfig::default();
    let mut session = PageSession::open(dom, PersistedStore::in_memory(), &config);
    let form = by_id(&session, "todo-form")?;
    let task = session
        .dom()
        .first_attr_value("name", "task", Some(form))
        .context("task input")?;
    assert_eq!(session.dom().value(task), "New task");

    session.input(task, "feed the cat");
    assert!(session.submit(form));

    assert_eq!(session.dom().value(task), "New task");
    let board = session.todos().context("todo board")?;
    assert_eq!(board.tasks(), ["feed the cat"]);

    Ok(())
}

#[test]
fn removing_a_todo_rerenders_and_saves() -> Result<()> {
    let mut store = PersistedStore::in_memory();
    store.save(TODO_KEY, &vec!["one", "two", "three"]);

    let mut session = open("js.html", store)?;
    assert_eq!(session.remove_todo(1).as_deref(), Some("two"));
    assert_eq!(session.remove_todo(9), None);

    let list = by_id(&session, "todo-list")?;
    assert_eq!(session.dom().items(list), vec!["one", "three"]);
    assert_eq!(
        session.store().raw(TODO_KEY).as_deref(),
        Some(r#"["one","three"]"#)
    );

    Ok(())
}

#[test]
fn detached_board_shares_the_stored_list() -> Result<()> {
    let mut store = PersistedStore::in_memory();
    let mut board = TodoBoard::detached(&store);
    assert!(board.add("read chapter 2", &mut store));
    assert!(!board.add("  ", &mut store));

    let again = TodoBoard::detached(&store);
    assert_eq!(again.tasks(), ["read chapter 2"]);

    Ok(())
}

#[test]
fn steps_replay_against_a_page() -> Result<()> {
    let mut session = open("playground.html", PersistedStore::in_memory())?;
    for raw in [
        "input:data-profile=name:Mika",
        "click:data-profile=like",
        "check:data-profile=dark",
    ] {
        let step: Step = raw.parse()?;
        assert!(session.apply_step(&step)?, "{raw} was not handled");
    }

    let report = session.report();
    let profile = report.profile.context("profile")?;
    assert_eq!(profile.name, "Mika");
    assert_eq!(profile.like_count, 1);
    assert!(profile.dark_mode);

    let missing: Step = "click:#nowhere".parse()?;
    assert!(session.apply_step(&missing).is_err());

    Ok(())
}

fn open(file: &str, store: PersistedStore) -> Result<PageSession<HeadlessDom>> {
    open_with(file, store, &SiteConfig::default())
}

fn open_with(
    file: &str,
    store: PersistedStore,
    config: &SiteConfig,
) -> Result<PageSession<HeadlessDom>> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("site")
        .join(file);
    let page = read_page(&path)?;
    Ok(PageSession::open(page.dom, store, config))
}

fn style(session: &PageSession<HeadlessDom>, node: NodeId, property: &str) -> String {
    session.dom().style(node, property).unwrap_or_default()
}

fn by_id(session: &PageSession<HeadlessDom>, id: &str) -> Result<NodeId> {
    session
        .dom()
        .element_by_id(id)
        .with_context(|| format!("no #{id}"))
}
