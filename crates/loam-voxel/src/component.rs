//! Actionable components attached to block types and block instances.
//!
//! Components form a closed set of kinds. A [`ComponentBag`] holds at most one
//! component per [`ComponentKind`], and a [`ComponentQuery`] filters bags with
//! All / Any / None semantics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry::Color;

/// Discriminant of a [`Component`]. Used as the bag key and in queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Sound,
    Notification,
    Light,
}

/// Sound effects played when the owning block is placed, broken, or used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoundComponent {
    pub place_sound: Option<String>,
    pub break_sound: Option<String>,
    pub use_sound: Option<String>,
}

/// A message surfaced to the player when the owning block is used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationComponent {
    pub title: Option<String>,
    pub message: String,
}

/// Marks the owning block as a light emitter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightComponent {
    /// Number of blocks the light reaches. Clamped to the maximum light level
    /// during propagation.
    pub radius: u8,
    /// Tint of the emitted light, `#RRGGBB` or `#RRGGBBAA` in documents.
    #[serde(default, with = "color_hex")]
    pub color: Option<Color>,
}

/// Tagged union of every component kind.
///
/// The declarative form carries an explicit `"type"` discriminator:
/// `{"type": "light", "radius": 10}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Component {
    Sound(SoundComponent),
    Notification(NotificationComponent),
    Light(LightComponent),
}

impl Component {
    /// The kind this component is stored under.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Sound(_) => ComponentKind::Sound,
            Component::Notification(_) => ComponentKind::Notification,
            Component::Light(_) => ComponentKind::Light,
        }
    }
}

/// How [`ComponentBag::merge`] resolves a kind present in both bags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergePolicy {
    /// The incoming component replaces the existing one.
    Overwrite,
    /// The existing component is kept; the incoming one is dropped.
    KeepExisting,
}

/// At most one [`Component`] per [`ComponentKind`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComponentBag {
    components: BTreeMap<ComponentKind, Component>,
}

impl ComponentBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a component, returning the one it replaced (if any).
    pub fn insert(&mut self, component: Component) -> Option<Component> {
        self.components.insert(component.kind(), component)
    }

    pub fn get(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.get(&kind)
    }

    pub fn get_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components.get_mut(&kind)
    }

    pub fn remove(&mut self, kind: ComponentKind) -> Option<Component> {
        self.components.remove(&kind)
    }

    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.components.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Kinds present in the bag, in a stable order.
    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.components.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    /// Folds `other` into this bag. Kinds only present in `other` are always added.
    pub fn merge(&mut self, other: &ComponentBag, policy: MergePolicy) {
        for (kind, component) in &other.components {
            match policy {
                MergePolicy::Overwrite => {
                    self.components.insert(*kind, component.clone());
                }
                MergePolicy::KeepExisting => {
                    self.components
                        .entry(*kind)
                        .or_insert_with(|| component.clone());
                }
            }
        }
    }

    /// The light component, if this bag carries one.
    pub fn light(&self) -> Option<&LightComponent> {
        match self.components.get(&ComponentKind::Light) {
            Some(Component::Light(light)) => Some(light),
            _ => None,
        }
    }

    pub fn sound(&self) -> Option<&SoundComponent> {
        match self.components.get(&ComponentKind::Sound) {
            Some(Component::Sound(sound)) => Some(sound),
            _ => None,
        }
    }

    pub fn notification(&self) -> Option<&NotificationComponent> {
        match self.components.get(&ComponentKind::Notification) {
            Some(Component::Notification(note)) => Some(note),
            _ => None,
        }
    }
}

impl FromIterator<Component> for ComponentBag {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        let mut bag = ComponentBag::new();
        for component in iter {
            bag.insert(component);
        }
        bag
    }
}

/// All / Any / None filter over a [`ComponentBag`].
///
/// A bag matches iff every kind in `all` is present, at least one kind in
/// `any` is present (or `any` is empty), and no kind in `none` is present.
/// The empty query matches every bag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentQuery {
    pub all: Vec<ComponentKind>,
    pub any: Vec<ComponentKind>,
    pub none: Vec<ComponentKind>,
}

impl ComponentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        self.all.extend(kinds);
        self
    }

    pub fn any(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        self.any.extend(kinds);
        self
    }

    pub fn none(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        self.none.extend(kinds);
        self
    }

    /// Returns `true` if the query places no constraint at all.
    pub fn matches_any(&self) -> bool {
        self.all.is_empty() && self.any.is_empty() && self.none.is_empty()
    }

    pub fn matches(&self, bag: &ComponentBag) -> bool {
        self.all.iter().all(|kind| bag.contains(*kind))
            && (self.any.is_empty() || self.any.iter().any(|kind| bag.contains(*kind)))
            && !self.none.iter().any(|kind| bag.contains(*kind))
    }
}

/// Serde adapter for `Option<Color>` written as a hex string.
mod color_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::registry::Color;

    pub fn serialize<S: Serializer>(color: &Option<Color>, s: S) -> Result<S::Ok, S::Error> {
        match color {
            Some(c) => s.serialize_str(&c.to_hex()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Color>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|hex| Color::from_hex(&hex).map_err(serde::de::Error::custom))
            .transpose()
    }
}
