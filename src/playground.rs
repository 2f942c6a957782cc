use crate::checklist::RESET_ATTR;
use crate::config::NumericFallback;
use crate::dom::{EventKind, NodeId, Surface};
use crate::model::{ProfileField, ProfileState};
use crate::record::{Binding, Coercion, Command, ControlValue, ObservableRecord, RecordSchema};
use crate::store::PersistedStore;
use tracing::debug;

pub const CARD_ID: &str = "profile-card";
pub const PROFILE_ATTR: &str = "data-profile";
pub const SLOT_ATTR: &str = "data-slot";

/// Display nodes inside the card, grouped by the field they show.
#[derive(Debug, Clone, Default)]
pub struct ProfileSlots {
    pub name: Vec<NodeId>,
    pub bio: Vec<NodeId>,
    pub links: Vec<NodeId>,
    pub likes: Vec<NodeId>,
    pub avatar: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ProfileSchema {
    defaults: ProfileState,
    card: NodeId,
    slots: ProfileSlots,
}

impl ProfileSchema {
    pub fn card(&self) -> NodeId {
        self.card
    }

    pub fn slots(&self) -> &ProfileSlots {
        &self.slots
    }
}

impl RecordSchema for ProfileSchema {
    type Field = ProfileField;
    type State = ProfileState;

    fn default_state(&self) -> ProfileState {
        self.defaults.clone()
    }

    fn apply(&self, state: &mut ProfileState, command: &Command<ProfileField>) -> bool {
        match command {
            Command::SetText {
                field: ProfileField::Name,
                value,
            } => state.name = value.clone(),
            Command::SetText {
                field: ProfileField::Bio,
                value,
            } => state.bio = value.clone(),
            Command::SetText {
                field: ProfileField::AccentColor,
                value,
            } => state.accent_color = value.clone(),
            Command::SetList {
                field: ProfileField::Links,
                items,
            } => state.links = items.clone(),
            Command::SetNumber {
                field: ProfileField::Padding,
                value,
            } => state.padding = saturate_u32(*value),
            Command::SetNumber {
                field: ProfileField::CornerRadius,
                value,
            } => state.corner_radius = saturate_u32(*value),
            Command::ToggleField {
                field: ProfileField::DarkMode,
                checked,
            } => state.dark_mode = checked.unwrap_or(!state.dark_mode),
            Command::Increment {
                field: ProfileField::LikeCount,
                by,
            } => {
                state.like_count = saturate_u32(i64::from(state.like_count).saturating_add(*by));
            }
            _ => return false,
        }
        true
    }

    fn control_value(&self, state: &ProfileState, field: &ProfileField) -> Option<ControlValue> {
        let value = match field {
            ProfileField::Name => ControlValue::Text(state.name.clone()),
            ProfileField::Bio => ControlValue::Text(state.bio.clone()),
            ProfileField::Links => ControlValue::Text(state.links.join(",")),
            ProfileField::AccentColor => ControlValue::Text(state.accent_color.clone()),
            ProfileField::Padding => ControlValue::Text(state.padding.to_string()),
            ProfileField::CornerRadius => ControlValue::Text(state.corner_radius.to_string()),
            ProfileField::DarkMode => ControlValue::Checked(state.dark_mode),
            ProfileField::LikeCount => return None,
        };
        Some(value)
    }

    fn render(&self, state: &ProfileState, surface: &mut dyn Surface) {
        let likes = state.like_count.to_string();
        let initial = state.avatar_initial();
        for node in &self.slots.name {
            surface.set_text(*node, &state.name);
        }
        for node in &self.slots.bio {
            surface.set_text(*node, &state.bio);
        }
        for node in &self.slots.likes {
            surface.set_text(*node, &likes);
        }
        for node in &self.slots.avatar {
            surface.set_text(*node, &initial);
        }
        for node in &self.slots.links {
            surface.set_list(*node, &state.links);
        }

        let pad = format!("{}px", state.padding);
        let radius = format!("{}px", state.corner_radius);
        surface.set_style(self.card, "--profile-color", &state.accent_color);
        surface.set_style(self.card, "--profile-pad", &pad);
        surface.set_style(self.card, "--profile-radius", &radius);
        surface.toggle_class(self.card, "dark", state.dark_mode);
    }
}

pub type Playground = ObservableRecord<ProfileSchema>;

/// Binds the profile card and its controls. The profile lives in memory only.
pub fn setup_playground(
    surface: &mut dyn Surface,
    store: &PersistedStore,
    defaults: &ProfileState,
    numbers: NumericFallback,
) -> Option<Playground> {
    let card = surface.element_by_id(CARD_ID)?;

    let slots = ProfileSlots {
        name: surface.query_attr_value(SLOT_ATTR, "name", Some(card)),
        bio: surface.query_attr_value(SLOT_ATTR, "bio", Some(card)),
        links: surface.query_attr_value(SLOT_ATTR, "links", Some(card)),
        likes: surface.query_attr_value(SLOT_ATTR, "likes", Some(card)),
        avatar: surface.query_class("avatar", Some(card)),
    };

    let mut bindings = Vec::new();
    for control in surface.query_attr(PROFILE_ATTR, None) {
        let name = surface.attr(control, PROFILE_ATTR).unwrap_or_default();
        let in_card = surface.contains(card, control);
        match profile_binding(control, &name, in_card) {
            Some(binding) => bindings.push(binding),
            None => debug!(control = %name, "profile control not bound"),
        }
    }
    for button in surface.query_attr(RESET_ATTR, None) {
        bindings.push(Binding::reset(button));
    }

    let playground = ObservableRecord::open(
        ProfileSchema {
            defaults: defaults.clone(),
            card,
            slots,
        },
        bindings,
        None,
        numbers,
        store,
    );
    debug!(controls = playground.bindings().len(), "playground bound");
    playground.mount(surface);
    Some(playground)
}

fn profile_binding(control: NodeId, name: &str, in_card: bool) -> Option<Binding<ProfileField>> {
    let input = |field, coercion| Binding::read(control, EventKind::Input, field, coercion);
    let binding = match name {
        "name" => input(ProfileField::Name, Coercion::Text),
        "bio" => input(ProfileField::Bio, Coercion::Text),
        "color" => input(ProfileField::AccentColor, Coercion::Text),
        "links" => input(ProfileField::Links, Coercion::List),
        "pad" => input(ProfileField::Padding, Coercion::non_negative()),
        "radius" => input(ProfileField::CornerRadius, Coercion::non_negative()),
        "dark" => Binding::read(
            control,
            EventKind::Change,
            ProfileField::DarkMode,
            Coercion::Checked,
        ),
        "like" => Binding::increment(control, ProfileField::LikeCount, 1),
        "like-display" if in_card => Binding::increment(control, ProfileField::LikeCount, 1),
        "dark-display" if in_card => Binding::flip(control, ProfileField::DarkMode),
        _ => return None,
    };
    Some(binding)
}

fn saturate_u32(value: i64) -> u32 {
    value.clamp(0, i64::from(u32::MAX)) as u32
}
