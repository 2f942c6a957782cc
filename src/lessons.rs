use crate::config::NumericFallback;
use crate::dom::{DomEvent, EventKind, NodeId, Surface};
use crate::model::CounterField;
use crate::record::{Binding, Command, ControlValue, ObservableRecord, RecordSchema, coerce_number};
use crate::store::PersistedStore;
use tracing::debug;

/// Editor inputs copied into the preview card's title, text and button.
#[derive(Debug, Clone)]
pub struct LiveCard {
    editor: NodeId,
    parts: Vec<(String, NodeId)>,
}

impl LiveCard {
    pub fn setup(surface: &mut dyn Surface) -> Option<Self> {
        let editor = surface.element_by_id("html-editor")?;
        let preview = surface.element_by_id("html-preview")?;

        let mut parts = Vec::new();
        for (field, tag) in [("title", "h3"), ("text", "p"), ("button", "button")] {
            if let Some(node) = surface.query_tag(tag, Some(preview)).into_iter().next() {
                parts.push((field.to_string(), node));
            }
        }

        let card = Self { editor, parts };
        card.update(surface);
        Some(card)
    }

    pub fn handle_event(&self, event: DomEvent, surface: &mut dyn Surface) -> bool {
        if event.kind != EventKind::Input || !surface.contains(self.editor, event.target) {
            return false;
        }
        self.update(surface);
        true
    }

    fn update(&self, surface: &mut dyn Surface) {
        for input in surface.query_attr("data-field", Some(self.editor)) {
            if surface.tag(input) != "input" {
                continue;
            }
            let Some(key) = surface.attr(input, "data-field") else {
                continue;
            };
            if let Some((_, part)) = self.parts.iter().find(|(field, _)| *field == key) {
                let value = surface.value(input);
                surface.set_text(*part, &value);
            }
        }
    }
}

/// Range inputs written as `--<name>` custom properties on the box preview.
#[derive(Debug, Clone)]
pub struct CssBox {
    preview: NodeId,
    inputs: Vec<(NodeId, String)>,
}

impl CssBox {
    pub fn setup(surface: &mut dyn Surface) -> Option<Self> {
        let preview = surface.element_by_id("box-preview")?;
        let controls = surface.element_by_id("box-controls")?;

        let inputs: Vec<(NodeId, String)> = surface
            .query_attr("data-var", Some(controls))
            .into_iter()
            .filter(|node| surface.tag(*node) == "input")
            .filter_map(|node| {
                let name = surface.attr(node, "data-var")?;
                Some((node, name))
            })
            .collect();

        let css_box = Self { preview, inputs };
        for (input, name) in &css_box.inputs {
            css_box.apply(*input, name, surface);
        }
        Some(css_box)
    }

    pub fn handle_event(&self, event: DomEvent, surface: &mut dyn Surface) -> bool {
        if event.kind != EventKind::Input {
            return false;
        }
        let Some((input, name)) = self.inputs.iter().find(|(node, _)| *node == event.target) else {
            return false;
        };
        self.apply(*input, name, surface);
        true
    }

    fn apply(&self, input: NodeId, name: &str, surface: &mut dyn Surface) {
        let unit = if name == "hue" { "" } else { "px" };
        let value = format!("{}{unit}", surface.value(input));
        surface.set_style(self.preview, &format!("--{name}"), &value);
    }
}

#[derive(Debug, Clone)]
pub struct FlexDemo {
    demo: NodeId,
    controls: NodeId,
    justify: Option<NodeId>,
    align: Option<NodeId>,
}

impl FlexDemo {
    pub fn setup(surface: &mut dyn Surface) -> Option<Self> {
        let demo = surface.element_by_id("flex-demo")?;
        let controls = surface.element_by_id("flex-controls")?;
        let flex = Self {
            demo,
            controls,
            justify: surface.first_attr_value("data-flex", "justify", Some(controls)),
            align: surface.first_attr_value("data-flex", "align", Some(controls)),
        };
        flex.apply(surface);
        Some(flex)
    }

    pub fn handle_event(&self, event: DomEvent, surface: &mut dyn Surface) -> bool {
        if event.kind != EventKind::Change || !surface.contains(self.controls, event.target) {
            return false;
        }
        self.apply(surface);
        true
    }

    fn apply(&self, surface: &mut dyn Surface) {
        if let Some(justify) = self.justify {
            let value = surface.value(justify);
            surface.set_style(self.demo, "justify-content", &value);
        }
        if let Some(align) = self.align {
            let value = surface.value(align);
            surface.set_style(self.demo, "align-items", &value);
        }
    }
}

/// Shows how many characters the input holds, counted as Unicode scalar values.
#[derive(Debug, Clone)]
pub struct CharCounter {
    input: NodeId,
    output: NodeId,
}

impl CharCounter {
    pub fn setup(surface: &mut dyn Surface) -> Option<Self> {
        let counter = Self {
            input: surface.element_by_id("char-input")?,
            output: surface.element_by_id("char-count")?,
        };
        counter.update(surface);
        Some(counter)
    }

    pub fn handle_event(&self, event: DomEvent, surface: &mut dyn Surface) -> bool {
        if event.kind != EventKind::Input || event.target != self.input {
            return false;
        }
        self.update(surface);
        true
    }

    fn update(&self, surface: &mut dyn Surface) {
        let count = surface.value(self.input).chars().count();
        surface.set_text(self.output, &count.to_string());
    }
}

#[derive(Debug, Clone)]
pub struct CounterSchema {
    output: NodeId,
}

impl RecordSchema for CounterSchema {
    type Field = CounterField;
    type State = i64;

    fn default_state(&self) -> i64 {
        0
    }

    fn apply(&self, state: &mut i64, command: &Command<CounterField>) -> bool {
        match command {
            Command::Increment { by, .. } => {
                *state = state.saturating_add(*by);
                true
            }
            Command::SetNumber { value, .. } => {
                *state = *value;
                true
            }
            _ => false,
        }
    }

    fn control_value(&self, _state: &i64, _field: &CounterField) -> Option<ControlValue> {
        None
    }

    fn render(&self, state: &i64, surface: &mut dyn Surface) {
        surface.set_text(self.output, &state.to_string());
    }
}

pub type Counter = ObservableRecord<CounterSchema>;

/// Buttons under `#js-counter` add their `data-change` delta to an in-memory count.
pub fn setup_counter(
    surface: &mut dyn Surface,
    store: &PersistedStore,
    numbers: NumericFallback,
) -> Option<Counter> {
    let root = surface.element_by_id("js-counter")?;
    let output = surface.query_tag("output", Some(root)).into_iter().next()?;

    let mut bindings = Vec::new();
    for button in surface.query_attr("data-change", Some(root)) {
        if surface.tag(button) != "button" {
            continue;
        }
        let raw = surface.attr(button, "data-change").unwrap_or_default();
        match coerce_number(&raw, i64::MIN, i64::MAX, numbers) {
            Some(delta) => bindings.push(Binding::increment(button, CounterField::Count, delta)),
            None => debug!(delta = %raw, "counter button has no usable delta; not bound"),
        }
    }

    let counter = ObservableRecord::open(CounterSchema { output }, bindings, None, numbers, store);
    counter.mount(surface);
    Some(counter)
}
