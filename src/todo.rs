use crate::dom::{DomEvent, EventKind, NodeId, Surface};
use crate::model::TodoList;
use crate::store::PersistedStore;
use tracing::debug;

pub const TODO_KEY: &str = "js-todos";

/// The todo list demo, persisted under `js-todos`.
#[derive(Debug, Clone)]
pub struct TodoBoard {
    form: Option<NodeId>,
    task_input: Option<NodeId>,
    /// The input's `value` attribute, restored when the form resets.
    task_default: String,
    list: Option<NodeId>,
    todos: TodoList,
}

impl TodoBoard {
    pub fn setup(surface: &mut dyn Surface, store: &PersistedStore) -> Option<Self> {
        let form = surface.element_by_id("todo-form")?;
        let list = surface.element_by_id("todo-list")?;
        let task_input = surface.first_attr_value("name", "task", Some(form));
        let task_default = task_input
            .and_then(|input| surface.attr(input, "value"))
            .unwrap_or_default();

        let board = Self {
            form: Some(form),
            task_input,
            task_default,
            list: Some(list),
            todos: store.load(TODO_KEY, TodoList::default()),
        };
        board.render(surface);
        Some(board)
    }

    /// A board with no page attached, for driving the list from the command line.
    pub fn detached(store: &PersistedStore) -> Self {
        Self {
            form: None,
            task_input: None,
            task_default: String::new(),
            list: None,
            todos: store.load(TODO_KEY, TodoList::default()),
        }
    }

    pub fn tasks(&self) -> &[String] {
        &self.todos.tasks
    }

    pub fn handle_event(
        &mut self,
        event: DomEvent,
        store: &mut PersistedStore,
        surface: &mut dyn Surface,
    ) -> bool {
        if event.kind != EventKind::Submit || Some(event.target) != self.form {
            return false;
        }

        let task = self
            .task_input
            .map(|input| surface.value(input))
            .unwrap_or_default();
        if self.add(&task, store) {
            if let Some(input) = self.task_input {
                surface.set_value(input, &self.task_default);
            }
            self.render(surface);
        }
        true
    }

    /// Appends the trimmed task; blank input is ignored.
    pub fn add(&mut self, task: &str, store: &mut PersistedStore) -> bool {
        let task = task.trim();
        if task.is_empty() {
            return false;
        }
        self.todos.tasks.push(task.to_string());
        store.save(TODO_KEY, &self.todos);
        true
    }

    pub fn remove(&mut self, index: usize, store: &mut PersistedStore) -> Option<String> {
        if index >= self.todos.tasks.len() {
            let len = self.todos.tasks.len();
            debug!(index, len, "todo index out of range");
            return None;
        }
        let removed = self.todos.tasks.remove(index);
        store.save(TODO_KEY, &self.todos);
        Some(removed)
    }

    pub fn remove_and_render(
        &mut self,
        index: usize,
        store: &mut PersistedStore,
        surface: &mut dyn Surface,
    ) -> Option<String> {
        let removed = self.remove(index, store)?;
        self.render(surface);
        Some(removed)
    }

    pub fn render(&self, surface: &mut dyn Surface) {
        if let Some(list) = self.list {
            surface.set_list(list, &self.todos.tasks);
        }
    }
}
