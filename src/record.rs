//! The observable local record: one owned state value, a table of control
//! bindings resolved at setup, optional mirroring into the persisted store,
//! and a render projection onto the page.
//!
//! Every interaction becomes a [`Command`] and goes through
//! [`ObservableRecord::dispatch`], so the update protocol can be driven
//! without a page as well as from control events.

use crate::config::NumericFallback;
use crate::dom::{DomEvent, EventKind, NodeId, Surface};
use crate::store::PersistedStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Command<F> {
    /// `Some` sets the flag from a checkbox, `None` flips it.
    ToggleField { field: F, checked: Option<bool> },
    SetText { field: F, value: String },
    SetNumber { field: F, value: i64 },
    SetList { field: F, items: Vec<String> },
    Increment { field: F, by: i64 },
    ResetToDefault,
}

impl<F> Command<F> {
    pub fn field(&self) -> Option<&F> {
        match self {
            Command::ToggleField { field, .. }
            | Command::SetText { field, .. }
            | Command::SetNumber { field, .. }
            | Command::SetList { field, .. }
            | Command::Increment { field, .. } => Some(field),
            Command::ResetToDefault => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Text,
    Number { min: i64, max: i64 },
    List,
    Checked,
}

impl Coercion {
    pub fn non_negative() -> Self {
        Coercion::Number {
            min: 0,
            max: i64::from(u32::MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BindingAction<F> {
    Read { field: F, coercion: Coercion },
    Increment { field: F, by: i64 },
    Flip { field: F },
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding<F> {
    pub control: NodeId,
    pub event: EventKind,
    pub action: BindingAction<F>,
}

impl<F> Binding<F> {
    pub fn read(control: NodeId, event: EventKind, field: F, coercion: Coercion) -> Self {
        Self {
            control,
            event,
            action: BindingAction::Read { field, coercion },
        }
    }

    pub fn increment(control: NodeId, field: F, by: i64) -> Self {
        Self {
            control,
            event: EventKind::Click,
            action: BindingAction::Increment { field, by },
        }
    }

    pub fn flip(control: NodeId, field: F) -> Self {
        Self {
            control,
            event: EventKind::Click,
            action: BindingAction::Flip { field },
        }
    }

    pub fn reset(control: NodeId) -> Self {
        Self {
            control,
            event: EventKind::Click,
            action: BindingAction::Reset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Text(String),
    Checked(bool),
}

pub trait RecordSchema {
    type Field: Clone + Debug + PartialEq;
    type State: Clone + Debug + PartialEq + Serialize + DeserializeOwned;

    fn default_state(&self) -> Self::State;

    /// Writes an already coerced value into `state`. Returns false when the
    /// command does not fit the field, leaving `state` untouched.
    fn apply(&self, state: &mut Self::State, command: &Command<Self::Field>) -> bool;

    /// What a control bound to `field` should show for `state`.
    fn control_value(&self, state: &Self::State, field: &Self::Field) -> Option<ControlValue>;

    /// Pure projection of `state` onto display nodes; must be idempotent.
    fn render(&self, state: &Self::State, surface: &mut dyn Surface);
}

pub struct ObservableRecord<S: RecordSchema> {
    schema: S,
    state: S::State,
    bindings: Vec<Binding<S::Field>>,
    storage_key: Option<String>,
    numbers: NumericFallback,
}

impl<S: RecordSchema> ObservableRecord<S> {
    /// Builds the record, loading its state from `store` when `storage_key` is set.
    pub fn open(
        schema: S,
        bindings: Vec<Binding<S::Field>>,
        storage_key: Option<String>,
        numbers: NumericFallback,
        store: &PersistedStore,
    ) -> Self {
        let state = match &storage_key {
            Some(key) => store.load(key, schema.default_state()),
            None => schema.default_state(),
        };

        Self {
            schema,
            state,
            bindings,
            storage_key,
            numbers,
        }
    }

    pub fn state(&self) -> &S::State {
        &self.state
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    pub fn bindings(&self) -> &[Binding<S::Field>] {
        &self.bindings
    }

    pub fn storage_key(&self) -> Option<&str> {
        self.storage_key.as_deref()
    }

    /// Establishes the initial view: controls from state, then render.
    pub fn mount(&self, surface: &mut dyn Surface) {
        self.sync_controls(surface, None, None);
        self.render(surface);
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        self.schema.render(&self.state, surface);
    }

    pub fn handle_event(
        &mut self,
        event: DomEvent,
        store: &mut PersistedStore,
        surface: &mut dyn Surface,
    ) -> bool {
        // Events bubble: a click on a child of a bound control reaches the control.
        let actions: Vec<(NodeId, BindingAction<S::Field>)> = self
            .bindings
            .iter()
            .filter(|binding| {
                binding.event == event.kind && surface.contains(binding.control, event.target)
            })
            .map(|binding| (binding.control, binding.action.clone()))
            .collect();

        let mut handled = false;
        for (control, action) in actions {
            let Some(command) = self.coerce(&action, control, surface) else {
                continue;
            };
            handled |= self.dispatch_from(command, Some(control), store, surface);
        }
        handled
    }

    pub fn dispatch(
        &mut self,
        command: Command<S::Field>,
        store: &mut PersistedStore,
        surface: &mut dyn Surface,
    ) -> bool {
        self.dispatch_from(command, None, store, surface)
    }

    pub fn reset(&mut self, store: &mut PersistedStore, surface: &mut dyn Surface) {
        self.state = self.schema.default_state();
        self.persist(store);
        self.sync_controls(surface, None, None);
        self.render(surface);
    }

    fn dispatch_from(
        &mut self,
        command: Command<S::Field>,
        origin: Option<NodeId>,
        store: &mut PersistedStore,
        surface: &mut dyn Surface,
    ) -> bool {
        if command == Command::ResetToDefault {
            self.reset(store, surface);
            return true;
        }

        if !self.schema.apply(&mut self.state, &command) {
            debug!(command = ?command, "command does not fit the record; ignored");
            return false;
        }

        self.persist(store);
        // The originating control already shows the value the user typed.
        self.sync_controls(surface, command.field(), origin);
        self.render(surface);
        true
    }

    fn persist(&self, store: &mut PersistedStore) {
        if let Some(key) = &self.storage_key {
            store.save(key, &self.state);
        }
    }

    fn sync_controls(
        &self,
        surface: &mut dyn Surface,
        field: Option<&S::Field>,
        skip: Option<NodeId>,
    ) {
        for binding in &self.bindings {
            if Some(binding.control) == skip {
                continue;
            }
            let BindingAction::Read { field: bound, .. } = &binding.action else {
                continue;
            };
            if field.is_some_and(|field| field != bound) {
                continue;
            }

            match self.schema.control_value(&self.state, bound) {
                Some(ControlValue::Text(text)) => surface.set_value(binding.control, &text),
                Some(ControlValue::Checked(on)) => surface.set_checked(binding.control, on),
                None => {}
            }
        }
    }

    fn coerce(
        &self,
        action: &BindingAction<S::Field>,
        control: NodeId,
        surface: &dyn Surface,
    ) -> Option<Command<S::Field>> {
        let command = match action {
            BindingAction::Read { field, coercion } => {
                let field = field.clone();
                match *coercion {
                    Coercion::Text => Command::SetText {
                        field,
                        value: surface.value(control),
                    },
                    Coercion::List => Command::SetList {
                        field,
                        items: split_links(&surface.value(control)),
                    },
                    Coercion::Checked => Command::ToggleField {
                        field,
                        checked: Some(surface.checked(control)),
                    },
                    Coercion::Number { min, max } => {
                        let raw = surface.value(control);
                        let Some(value) = coerce_number(&raw, min, max, self.numbers) else {
                            debug!(field = ?field, raw = %raw, "numeric input rejected");
                            return None;
                        };
                        Command::SetNumber { field, value }
                    }
                }
            }
            BindingAction::Increment { field, by } => Command::Increment {
                field: field.clone(),
                by: *by,
            },
            BindingAction::Flip { field } => Command::ToggleField {
                field: field.clone(),
                checked: None,
            },
            BindingAction::Reset => Command::ResetToDefault,
        };
        Some(command)
    }
}

/// Comma-separated input to a list: segments trimmed, empty ones dropped.
pub fn split_links(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Parses numeric control text into `[min, max]`, rounding fractions.
/// Text that is empty, not finite, or out of range follows `fallback`:
/// `Reject` yields `None`, `Zero` yields zero clamped into range.
pub fn coerce_number(raw: &str, min: i64, max: i64, fallback: NumericFallback) -> Option<i64> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(f64::round)
        .filter(|value| *value >= min as f64 && *value <= max as f64)
        .map(|value| value as i64);

    match (parsed, fallback) {
        (Some(value), _) => Some(value),
        (None, NumericFallback::Reject) => None,
        (None, NumericFallback::Zero) => Some(0.clamp(min, max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_trimmed_and_empties_dropped() {
        assert_eq!(
            split_links("Docs, Music,  , Snacks"),
            vec!["Docs", "Music", "Snacks"]
        );
        assert!(split_links(" , ,").is_empty());
    }

    #[test]
    fn numbers_round_and_respect_bounds() {
        let reject = NumericFallback::Reject;
        assert_eq!(coerce_number(" 24 ", 0, 64, reject), Some(24));
        assert_eq!(coerce_number("12.6", 0, 64, reject), Some(13));
        assert_eq!(coerce_number("-3", -10, 10, reject), Some(-3));
        assert_eq!(coerce_number("-3", 0, 64, reject), None);
        assert_eq!(coerce_number("abc", 0, 64, reject), None);
        assert_eq!(coerce_number("NaN", 0, 64, reject), None);
        assert_eq!(coerce_number("", 0, 64, reject), None);
    }

    #[test]
    fn zero_policy_replaces_bad_input() {
        let zero = NumericFallback::Zero;
        assert_eq!(coerce_number("abc", 0, 64, zero), Some(0));
        assert_eq!(coerce_number("inf", 0, 64, zero), Some(0));
        assert_eq!(coerce_number("oops", 4, 64, zero), Some(4));
    }
}
