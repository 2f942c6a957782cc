use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Completion flags for one page's checklist, keyed by the toggle's `data-progress` id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistState {
    pub items: BTreeMap<String, bool>,
}

impl ChecklistState {
    pub fn is_done(&self, item: &str) -> bool {
        self.items.get(item).copied().unwrap_or(false)
    }

    pub fn completed(&self) -> usize {
        self.items.values().filter(|done| **done).count()
    }
}

impl<const N: usize> From<[(&str, bool); N]> for ChecklistState {
    fn from(items: [(&str, bool); N]) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|(item, done)| (item.to_string(), done))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileState {
    pub name: String,
    pub bio: String,
    pub links: Vec<String>,
    pub accent_color: String,
    pub padding: u32,
    pub corner_radius: u32,
    pub dark_mode: bool,
    pub like_count: u32,
}

impl Default for ProfileState {
    fn default() -> Self {
        Self {
            name: "Alex Kim".to_string(),
            bio: "Curious student who loves friendly code.".to_string(),
            links: vec!["Docs".to_string(), "Music".to_string(), "Snacks".to_string()],
            accent_color: "#4b8df8".to_string(),
            padding: 16,
            corner_radius: 14,
            dark_mode: false,
            like_count: 0,
        }
    }
}

impl ProfileState {
    /// First character of the name, upper-cased; `A` when the name is empty.
    pub fn avatar_initial(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_else(|| "A".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    Bio,
    Links,
    AccentColor,
    Padding,
    CornerRadius,
    DarkMode,
    LikeCount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CounterField {
    Count,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoList {
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageProgress {
    pub page: String,
    pub path: String,
    pub toggles: usize,
    pub completed: usize,
}
