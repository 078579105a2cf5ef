//! Event kinds and the context handed to every listener.

use std::fmt;

use glam::IVec3;
use loam_voxel::{BlockTypeId, ComponentBag};

use crate::instance::{BlockInstance, InstanceId};

// ---------------------------------------------------------------------------
// ActionEventType
// ---------------------------------------------------------------------------

/// Kind of world event a listener subscribes to. A context carries exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionEventType {
    /// An actionable block was placed.
    Place,
    /// An actionable block was broken or replaced.
    Break,
    /// The player interacted with a block.
    Use,
    /// Periodic update for every tracked instance.
    Tick,
    /// A face-adjacent block changed.
    NeighborChanged,
}

impl ActionEventType {
    pub const ALL: [ActionEventType; 5] = [
        ActionEventType::Place,
        ActionEventType::Break,
        ActionEventType::Use,
        ActionEventType::Tick,
        ActionEventType::NeighborChanged,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ActionEventType::Place => "place",
            ActionEventType::Break => "break",
            ActionEventType::Use => "use",
            ActionEventType::Tick => "tick",
            ActionEventType::NeighborChanged => "neighbor_changed",
        }
    }
}

impl fmt::Display for ActionEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// GameTime
// ---------------------------------------------------------------------------

/// Simulation clock passed through to listeners.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GameTime {
    /// Seconds since the simulation started.
    pub total_seconds: f64,
    /// Seconds since the previous update.
    pub delta_seconds: f64,
    /// Number of updates run so far.
    pub tick: u64,
}

impl GameTime {
    /// Advances the clock by one update of `delta_seconds`.
    pub fn advance(self, delta_seconds: f64) -> Self {
        Self {
            total_seconds: self.total_seconds + delta_seconds,
            delta_seconds,
            tick: self.tick + 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// The block an event is about: its type and the components listeners are gated on.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionTarget {
    /// Set when the target is a tracked instance.
    pub instance: Option<InstanceId>,
    pub block_type: BlockTypeId,
    pub components: ComponentBag,
}

impl ActionTarget {
    /// Target describing a block with no tracked instance.
    pub fn block(block_type: BlockTypeId, components: ComponentBag) -> Self {
        Self {
            instance: None,
            block_type,
            components,
        }
    }
}

impl From<&BlockInstance> for ActionTarget {
    fn from(instance: &BlockInstance) -> Self {
        Self {
            instance: Some(instance.id),
            block_type: instance.block_type,
            components: instance.components.clone(),
        }
    }
}

/// Everything a listener learns about one event.
#[derive(Clone, Debug, PartialEq)]
pub struct ActionEventContext {
    pub event: ActionEventType,
    /// World-space block position.
    pub position: IVec3,
    pub time: GameTime,
    /// When `None`, the service fills it in from the instance tracked at `position`.
    pub target: Option<ActionTarget>,
}

impl ActionEventContext {
    pub fn new(event: ActionEventType, position: IVec3, time: GameTime) -> Self {
        Self {
            event,
            position,
            time,
            target: None,
        }
    }

    pub fn with_target(mut self, target: ActionTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Components of the target, if there is one.
    pub fn components(&self) -> Option<&ComponentBag> {
        self.target.as_ref().map(|t| &t.components)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
