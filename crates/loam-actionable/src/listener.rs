//! The listener trait the service dispatches to.

use loam_voxel::{ComponentBag, ComponentQuery};
use thiserror::Error;

use crate::event::{ActionEventContext, ActionEventType};

/// Failure reported by a listener. Logged by the service, never propagated.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("{0}")]
    Failed(String),
    #[error("event has no target block")]
    MissingTarget,
    #[error("receiver for {0} has been dropped")]
    Disconnected(&'static str),
}

impl ListenerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Reacts to one kind of event on blocks whose components match its query.
pub trait ActionableListener {
    /// The single event kind this listener receives.
    fn event_type(&self) -> ActionEventType;

    /// Component gate checked against the event target.
    fn query(&self) -> &ComponentQuery;

    fn can_handle(&self, components: &ComponentBag) -> bool {
        self.query().matches(components)
    }

    fn handle(&mut self, ctx: &ActionEventContext) -> Result<(), ListenerError>;
}

/// Listener backed by a closure.
pub struct FnListener<F> {
    event: ActionEventType,
    query: ComponentQuery,
    func: F,
}

impl<F> FnListener<F>
where
    F: FnMut(&ActionEventContext) -> Result<(), ListenerError>,
{
    pub fn new(event: ActionEventType, query: ComponentQuery, func: F) -> Self {
        Self { event, query, func }
    }
}

impl<F> ActionableListener for FnListener<F>
where
    F: FnMut(&ActionEventContext) -> Result<(), ListenerError>,
{
    fn event_type(&self) -> ActionEventType {
        self.event
    }

    fn query(&self) -> &ComponentQuery {
        &self.query
    }

    fn handle(&mut self, ctx: &ActionEventContext) -> Result<(), ListenerError> {
        (self.func)(ctx)
    }
}

impl<F> std::fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnListener")
            .field("event", &self.event)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::GameTime;
    use glam::IVec3;
    use loam_voxel::{Component, ComponentKind, LightComponent};

    #[test]
    fn test_fn_listener_gates_on_query() {
        let mut seen = 0;
        let mut listener = FnListener::new(
            ActionEventType::Use,
            ComponentQuery::new().all([ComponentKind::Light]),
            |_: &ActionEventContext| {
                seen += 1;
                Ok(())
            },
        );

        let mut lit = ComponentBag::new();
        lit.insert(Component::Light(LightComponent {
            radius: 4,
            color: None,
        }));
        assert!(listener.can_handle(&lit));
        assert!(!listener.can_handle(&ComponentBag::new()));
        assert_eq!(listener.event_type(), ActionEventType::Use);

        let ctx = ActionEventContext::new(ActionEventType::Use, IVec3::ZERO, GameTime::default());
        listener.handle(&ctx).unwrap();
        drop(listener);
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ListenerError::failed("boom").to_string(), "boom");
        assert_eq!(
            ListenerError::Disconnected("relight requests").to_string(),
            "receiver for relight requests has been dropped"
        );
    }
}
