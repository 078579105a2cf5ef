//! Stock listeners that forward events to engine collaborators.
//!
//! Sound playback, notification display and physics live outside this crate;
//! listeners reach them through the narrow traits defined here. Relighting is
//! handed off through a channel so the dispatch path never runs propagation.

use crossbeam_channel::{Receiver, Sender};
use glam::{IVec3, Vec3};
use loam_voxel::{BlockTypeId, ChunkCoord, ChunkDims, ComponentKind, ComponentQuery};

use crate::event::{ActionEventContext, ActionEventType};
use crate::listener::{ActionableListener, ListenerError};

/// Centre of a block in world space.
fn block_center(position: IVec3) -> Vec3 {
    position.as_vec3() + Vec3::splat(0.5)
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Plays positional sound effects.
pub trait SoundPlayer {
    fn play_sound_effect_3d(&mut self, sound: &str, position: Vec3) -> Result<(), ListenerError>;
}

impl<F> SoundPlayer for F
where
    F: FnMut(&str, Vec3) -> Result<(), ListenerError>,
{
    fn play_sound_effect_3d(&mut self, sound: &str, position: Vec3) -> Result<(), ListenerError> {
        self(sound, position)
    }
}

/// Shows a message to the player.
pub trait Notifier {
    fn notify(&mut self, title: Option<&str>, message: &str) -> Result<(), ListenerError>;
}

impl<F> Notifier for F
where
    F: FnMut(Option<&str>, &str) -> Result<(), ListenerError>,
{
    fn notify(&mut self, title: Option<&str>, message: &str) -> Result<(), ListenerError> {
        self(title, message)
    }
}

/// Creates and destroys static physics bodies for placed blocks.
pub trait PhysicsBridge {
    fn attach_block(&mut self, position: IVec3, block: BlockTypeId) -> Result<(), ListenerError>;
    fn detach_block(&mut self, position: IVec3) -> Result<(), ListenerError>;
}

// ---------------------------------------------------------------------------
// Sound
// ---------------------------------------------------------------------------

/// Plays the target's place, break or use sound.
pub struct SoundEffectListener<P> {
    event: ActionEventType,
    query: ComponentQuery,
    player: P,
}

impl<P: SoundPlayer> SoundEffectListener<P> {
    pub fn new(event: ActionEventType, player: P) -> Self {
        Self {
            event,
            query: ComponentQuery::new().all([ComponentKind::Sound]),
            player,
        }
    }
}

impl<P: SoundPlayer> ActionableListener for SoundEffectListener<P> {
    fn event_type(&self) -> ActionEventType {
        self.event
    }

    fn query(&self) -> &ComponentQuery {
        &self.query
    }

    fn handle(&mut self, ctx: &ActionEventContext) -> Result<(), ListenerError> {
        let sound = ctx
            .components()
            .and_then(|bag| bag.sound())
            .ok_or(ListenerError::MissingTarget)?;
        let clip = match ctx.event {
            ActionEventType::Place => sound.place_sound.as_deref(),
            ActionEventType::Break => sound.break_sound.as_deref(),
            ActionEventType::Use => sound.use_sound.as_deref(),
            ActionEventType::Tick | ActionEventType::NeighborChanged => None,
        };
        match clip {
            Some(clip) => self.player.play_sound_effect_3d(clip, block_center(ctx.position)),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// Shows the target's notification when it is used.
pub struct NotificationListener<N> {
    query: ComponentQuery,
    notifier: N,
}

impl<N: Notifier> NotificationListener<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            query: ComponentQuery::new().all([ComponentKind::Notification]),
            notifier,
        }
    }
}

impl<N: Notifier> ActionableListener for NotificationListener<N> {
    fn event_type(&self) -> ActionEventType {
        ActionEventType::Use
    }

    fn query(&self) -> &ComponentQuery {
        &self.query
    }

    fn handle(&mut self, ctx: &ActionEventContext) -> Result<(), ListenerError> {
        let note = ctx
            .components()
            .and_then(|bag| bag.notification())
            .ok_or(ListenerError::MissingTarget)?;
        self.notifier.notify(note.title.as_deref(), &note.message)
    }
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

/// Attaches a body on `Place` or detaches it on `Break`, for every actionable block.
pub struct PhysicsAttachmentListener<B> {
    event: ActionEventType,
    query: ComponentQuery,
    bridge: B,
}

impl<B: PhysicsBridge> PhysicsAttachmentListener<B> {
    pub fn attach(bridge: B) -> Self {
        Self {
            event: ActionEventType::Place,
            query: ComponentQuery::new(),
            bridge,
        }
    }

    pub fn detach(bridge: B) -> Self {
        Self {
            event: ActionEventType::Break,
            query: ComponentQuery::new(),
            bridge,
        }
    }
}

impl<B: PhysicsBridge> ActionableListener for PhysicsAttachmentListener<B> {
    fn event_type(&self) -> ActionEventType {
        self.event
    }

    fn query(&self) -> &ComponentQuery {
        &self.query
    }

    fn handle(&mut self, ctx: &ActionEventContext) -> Result<(), ListenerError> {
        match ctx.event {
            ActionEventType::Place => {
                let target = ctx.target.as_ref().ok_or(ListenerError::MissingTarget)?;
                self.bridge.attach_block(ctx.position, target.block_type)
            }
            ActionEventType::Break => self.bridge.detach_block(ctx.position),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Relight requests
// ---------------------------------------------------------------------------

/// Channel carrying chunks whose light must be recomputed.
pub fn relight_channel() -> (Sender<ChunkCoord>, Receiver<ChunkCoord>) {
    crossbeam_channel::unbounded()
}

/// Queues the target's chunk for relighting. Defaults to light-emitting blocks.
pub struct RelightRequestListener {
    event: ActionEventType,
    dims: ChunkDims,
    query: ComponentQuery,
    sender: Sender<ChunkCoord>,
}

impl RelightRequestListener {
    pub fn new(event: ActionEventType, dims: ChunkDims, sender: Sender<ChunkCoord>) -> Self {
        Self {
            event,
            dims,
            query: ComponentQuery::new().all([ComponentKind::Light]),
            sender,
        }
    }

    pub fn with_query(mut self, query: ComponentQuery) -> Self {
        self.query = query;
        self
    }
}

impl ActionableListener for RelightRequestListener {
    fn event_type(&self) -> ActionEventType {
        self.event
    }

    fn query(&self) -> &ComponentQuery {
        &self.query
    }

    fn handle(&mut self, ctx: &ActionEventContext) -> Result<(), ListenerError> {
        self.sender
            .send(self.dims.chunk_of(ctx.position))
            .map_err(|_| ListenerError::Disconnected("relight requests"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
