use crate::config::NumericFallback;
use crate::dom::{EventKind, Surface};
use crate::model::ChecklistState;
use crate::record::{Binding, Coercion, Command, ControlValue, ObservableRecord, RecordSchema};
use crate::store::PersistedStore;
use tracing::debug;

pub const PROGRESS_ATTR: &str = "data-progress";
pub const RESET_ATTR: &str = "data-reset";

pub fn storage_key(page: &str) -> String {
    format!("progress-{page}")
}

/// Boolean flags keyed by the ids of whatever toggles the page declares.
#[derive(Debug, Clone)]
pub struct ChecklistSchema {
    page: String,
}

impl ChecklistSchema {
    pub fn page(&self) -> &str {
        &self.page
    }
}

impl RecordSchema for ChecklistSchema {
    type Field = String;
    type State = ChecklistState;

    fn default_state(&self) -> ChecklistState {
        ChecklistState::default()
    }

    fn apply(&self, state: &mut ChecklistState, command: &Command<String>) -> bool {
        match command {
            Command::ToggleField { field, checked } => {
                let done = checked.unwrap_or_else(|| !state.is_done(field));
                state.items.insert(field.clone(), done);
                true
            }
            _ => false,
        }
    }

    fn control_value(&self, state: &ChecklistState, field: &String) -> Option<ControlValue> {
        Some(ControlValue::Checked(state.is_done(field)))
    }

    // The toggles are the whole view; they are kept in step by control sync.
    fn render(&self, _state: &ChecklistState, _surface: &mut dyn Surface) {}
}

pub type Checklist = ObservableRecord<ChecklistSchema>;

/// Binds every `[data-progress]` toggle on the page to `progress-<page>`.
/// Returns `None` when the page declares no toggles.
pub fn setup_checklist(
    page: &str,
    surface: &mut dyn Surface,
    store: &PersistedStore,
) -> Option<Checklist> {
    let toggles = surface.query_attr(PROGRESS_ATTR, None);
    if toggles.is_empty() {
        return None;
    }

    let mut bindings = Vec::new();
    for toggle in toggles {
        let item = surface.attr(toggle, PROGRESS_ATTR).unwrap_or_default();
        if item.is_empty() {
            continue;
        }
        bindings.push(Binding::read(
            toggle,
            EventKind::Change,
            item,
            Coercion::Checked,
        ));
    }
    let toggle_count = bindings.len();
    for button in surface.query_attr(RESET_ATTR, None) {
        bindings.push(Binding::reset(button));
    }

    let checklist = ObservableRecord::open(
        ChecklistSchema {
            page: page.to_string(),
        },
        bindings,
        Some(storage_key(page)),
        NumericFallback::Reject,
        store,
    );
    debug!(
        page,
        toggles = toggle_count,
        completed = checklist.state().completed(),
        "checklist bound"
    );
    checklist.mount(surface);
    Some(checklist)
}
