use crate::checklist::{Checklist, setup_checklist};
use crate::config::SiteConfig;
use crate::dom::{DomEvent, Element, EventKind, HeadlessDom, NodeId, Surface};
use crate::lessons::{CharCounter, Counter, CssBox, FlexDemo, LiveCard, setup_counter};
use crate::model::{ChecklistState, ProfileState};
use crate::playground::{Playground, setup_playground};
use crate::store::PersistedStore;
use crate::todo::TodoBoard;
use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_PAGE: &str = "home";

/// One loaded page: its surface, the store, and every component bound to it.
pub struct PageSession<D: Surface> {
    page: String,
    dom: D,
    store: PersistedStore,
    checklist: Option<Checklist>,
    playground: Option<Playground>,
    live_card: Option<LiveCard>,
    css_box: Option<CssBox>,
    flex: Option<FlexDemo>,
    counter: Option<Counter>,
    char_counter: Option<CharCounter>,
    todos: Option<TodoBoard>,
}

impl<D: Surface> PageSession<D> {
    pub fn open(mut dom: D, store: PersistedStore, config: &SiteConfig) -> Self {
        let page = page_name(&dom);
        let numbers = config.input.numeric_fallback;

        let checklist = setup_checklist(&page, &mut dom, &store);
        let mut session = Self {
            page,
            dom,
            store,
            checklist,
            playground: None,
            live_card: None,
            css_box: None,
            flex: None,
            counter: None,
            char_counter: None,
            todos: None,
        };

        match session.page.as_str() {
            "html" => session.live_card = LiveCard::setup(&mut session.dom),
            "css" => {
                session.css_box = CssBox::setup(&mut session.dom);
                session.flex = FlexDemo::setup(&mut session.dom);
            }
            "js" => {
                session.counter = setup_counter(&mut session.dom, &session.store, numbers);
                session.char_counter = CharCounter::setup(&mut session.dom);
                session.todos = TodoBoard::setup(&mut session.dom, &session.store);
            }
            _ => {}
        }
        session.playground = setup_playground(
            &mut session.dom,
            &session.store,
            &config.playground.profile,
            numbers,
        );

        info!(
            page = %session.page,
            storage = session.store.is_available(),
            checklist = session.checklist.is_some(),
            playground = session.playground.is_some(),
            "page initialised"
        );
        session
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    pub fn store(&self) -> &PersistedStore {
        &self.store
    }

    pub fn into_store(self) -> PersistedStore {
        self.store
    }

    pub fn checklist(&self) -> Option<&Checklist> {
        self.checklist.as_ref()
    }

    pub fn playground(&self) -> Option<&Playground> {
        self.playground.as_ref()
    }

    pub fn counter(&self) -> Option<&Counter> {
        self.counter.as_ref()
    }

    pub fn todos(&self) -> Option<&TodoBoard> {
        self.todos.as_ref()
    }

    /// Delivers one event to every component, in page initialisation order.
    pub fn dispatch(&mut self, event: DomEvent) -> bool {
        let mut handled = false;

        if let Some(checklist) = self.checklist.as_mut() {
            handled |= checklist.handle_event(event, &mut self.store, &mut self.dom);
        }
        if let Some(card) = &self.live_card {
            handled |= card.handle_event(event, &mut self.dom);
        }
        if let Some(css_box) = &self.css_box {
            handled |= css_box.handle_event(event, &mut self.dom);
        }
        if let Some(flex) = &self.flex {
            handled |= flex.handle_event(event, &mut self.dom);
        }
        if let Some(counter) = self.counter.as_mut() {
            handled |= counter.handle_event(event, &mut self.store, &mut self.dom);
        }
        if let Some(chars) = &self.char_counter {
            handled |= chars.handle_event(event, &mut self.dom);
        }
        if let Some(todos) = self.todos.as_mut() {
            handled |= todos.handle_event(event, &mut self.store, &mut self.dom);
        }
        if let Some(playground) = self.playground.as_mut() {
            handled |= playground.handle_event(event, &mut self.store, &mut self.dom);
        }

        if !handled {
            debug!(target_node = event.target.index(), kind = ?event.kind, "event had no listener");
        }
        handled
    }

    pub fn click(&mut self, node: NodeId) -> bool {
        self.dispatch(DomEvent::new(node, EventKind::Click))
    }

    /// Types `value` into a text-like control and fires `input`.
    pub fn input(&mut self, node: NodeId, value: &str) -> bool {
        self.dom.set_value(node, value);
        self.dispatch(DomEvent::new(node, EventKind::Input))
    }

    pub fn toggle(&mut self, node: NodeId, checked: bool) -> bool {
        self.dom.set_checked(node, checked);
        self.dispatch(DomEvent::new(node, EventKind::Change))
    }

    pub fn select(&mut self, node: NodeId, value: &str) -> bool {
        self.dom.set_value(node, value);
        self.dispatch(DomEvent::new(node, EventKind::Change))
    }

    pub fn submit(&mut self, form: NodeId) -> bool {
        self.dispatch(DomEvent::new(form, EventKind::Submit))
    }

    pub fn remove_todo(&mut self, index: usize) -> Option<String> {
        let todos = self.todos.as_mut()?;
        todos.remove_and_render(index, &mut self.store, &mut self.dom)
    }

    /// Re-renders every record-backed component without changing state.
    pub fn render(&mut self) {
        if let Some(checklist) = &self.checklist {
            checklist.render(&mut self.dom);
        }
        if let Some(counter) = &self.counter {
            counter.render(&mut self.dom);
        }
        if let Some(todos) = &self.todos {
            todos.render(&mut self.dom);
        }
        if let Some(playground) = &self.playground {
            playground.render(&mut self.dom);
        }
    }

    pub fn apply_step(&mut self, step: &Step) -> Result<bool> {
        if let Step::RemoveTodo(index) = step {
            return Ok(self.remove_todo(*index).is_some());
        }

        let target = step.target().context("step has no target")?;
        let node = target
            .resolve(&self.dom)
            .ok_or_else(|| anyhow!("no element matches {target}"))?;

        let handled = match step {
            Step::Click(_) => self.click(node),
            Step::Input(_, value) => self.input(node, value),
            Step::Toggle(_, checked) => self.toggle(node, *checked),
            Step::Select(_, value) => self.select(node, value),
            Step::Submit(_) => self.submit(node),
            Step::RemoveTodo(_) => false,
        };
        Ok(handled)
    }
}

#[derive(Debug, Serialize)]
pub struct PageReport<'a> {
    pub page: &'a str,
    pub storage_available: bool,
    pub checklist: Option<&'a ChecklistState>,
    pub profile: Option<&'a ProfileState>,
    pub counter: Option<i64>,
    pub todos: Option<&'a [String]>,
    pub view: BTreeMap<String, &'a Element>,
}

impl PageSession<HeadlessDom> {
    pub fn report(&self) -> PageReport<'_> {
        PageReport {
            page: &self.page,
            storage_available: self.store.is_available(),
            checklist: self.checklist.as_ref().map(|c| c.state()),
            profile: self.playground.as_ref().map(|p| p.state()),
            counter: self.counter.as_ref().map(|c| *c.state()),
            todos: self.todos.as_ref().map(|t| t.tasks()),
            view: self
                .dom
                .snapshot()
                .into_iter()
                .filter(|(label, _)| label.contains('#') || label.contains('['))
                .collect(),
        }
    }
}

pub fn page_name(surface: &dyn Surface) -> String {
    surface
        .body_attr("data-page")
        .filter(|page| !page.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PAGE.to_string())
}

/// Locates one element: `#id` or `attr=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Id(String),
    Attr { name: String, value: String },
}

impl Target {
    pub fn resolve(&self, surface: &dyn Surface) -> Option<NodeId> {
        match self {
            Target::Id(id) => surface.element_by_id(id),
            Target::Attr { name, value } => surface.first_attr_value(name, value, None),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Id(id) => write!(f, "#{id}"),
            Target::Attr { name, value } => write!(f, "{name}={value}"),
        }
    }
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(id) = s.strip_prefix('#') {
            if id.is_empty() {
                bail!("empty id in target {s}");
            }
            return Ok(Target::Id(id.to_string()));
        }
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("target must be #id or attr=value, got {s}"))?;
        if name.is_empty() {
            bail!("empty attribute name in target {s}");
        }
        Ok(Target::Attr {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// One simulated user interaction, written `kind:target[:argument]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Click(Target),
    Input(Target, String),
    Toggle(Target, bool),
    Select(Target, String),
    Submit(Target),
    RemoveTodo(usize),
}

impl Step {
    pub fn target(&self) -> Option<&Target> {
        match self {
            Step::Click(target)
            | Step::Input(target, _)
            | Step::Toggle(target, _)
            | Step::Select(target, _)
            | Step::Submit(target) => Some(target),
            Step::RemoveTodo(_) => None,
        }
    }
}

impl FromStr for Step {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ':');
        let kind = parts.next().unwrap_or_default();
        let target = parts
            .next()
            .ok_or_else(|| anyhow!("step {s} is missing a target"))?;
        let argument = parts.next();

        let step = match kind {
            "click" => Step::Click(target.parse()?),
            "check" => Step::Toggle(target.parse()?, true),
            "uncheck" => Step::Toggle(target.parse()?, false),
            "submit" => Step::Submit(target.parse()?),
            "input" => Step::Input(target.parse()?, argument.unwrap_or_default().to_string()),
            "select" => Step::Select(
                target.parse()?,
                argument
                    .ok_or_else(|| anyhow!("select step {s} needs a value"))?
                    .to_string(),
            ),
            "remove-todo" => Step::RemoveTodo(
                target
                    .parse()
                    .with_context(|| format!("invalid todo index in {s}"))?,
            ),
            other => bail!("unknown step kind {other}"),
        };
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_parse_with_colons_in_text() {
        let step: Step = "input:data-profile=bio:Loves: code".parse().unwrap();
        assert_eq!(
            step,
            Step::Input(
                Target::Attr {
                    name: "data-profile".to_string(),
                    value: "bio".to_string(),
                },
                "Loves: code".to_string()
            )
        );

        let step: Step = "submit:#todo-form".parse().unwrap();
        assert_eq!(step, Step::Submit(Target::Id("todo-form".to_string())));

        let step: Step = "remove-todo:2".parse().unwrap();
        assert_eq!(step, Step::RemoveTodo(2));
    }

    #[test]
    fn malformed_steps_are_rejected() {
        assert!("wiggle:#x".parse::<Step>().is_err());
        assert!("click".parse::<Step>().is_err());
        assert!("click:noequals".parse::<Step>().is_err());
        assert!("select:data-flex=align".parse::<Step>().is_err());
        assert!("remove-todo:first".parse::<Step>().is_err());
    }
}
