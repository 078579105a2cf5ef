//! Event bus for interactive blocks: tracked block instances, component-gated
//! listeners, and stock listeners that bridge to sound, notifications, physics
//! and relighting.

mod event;
mod instance;
mod listener;
mod service;

pub mod listeners;

pub use event::{ActionEventContext, ActionEventType, ActionTarget, GameTime};
pub use instance::{BlockInstance, InstanceId};
pub use listener::{ActionableListener, FnListener, ListenerError};
pub use listeners::{
    Notifier, NotificationListener, PhysicsAttachmentListener, PhysicsBridge, RelightRequestListener,
    SoundEffectListener, SoundPlayer, relight_channel,
};
pub use service::{ActionableService, DispatchReport, ListenerId};
