//! Position-keyed instance table and listener dispatch.
//!
//! The [`ActionableService`] tracks one [`BlockInstance`] per world position
//! for actionable blocks and routes events to listeners in registration order.
//! It is meant to be driven from the simulation thread and is not `Sync`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use glam::IVec3;
use loam_lighting::LightSource;
use loam_voxel::{BlockType, ChunkCoord, ChunkDims, ComponentBag, MAX_LIGHT_LEVEL, MergePolicy};
use rustc_hash::FxHashMap;

use crate::event::{ActionEventContext, ActionEventType, ActionTarget, GameTime};
use crate::instance::{BlockInstance, InstanceId};
use crate::listener::ActionableListener;

const FACE_NEIGHBORS: [IVec3; 6] = [
    IVec3::X,
    IVec3::NEG_X,
    IVec3::Y,
    IVec3::NEG_Y,
    IVec3::Z,
    IVec3::NEG_Z,
];

// ---------------------------------------------------------------------------
// Dispatch bookkeeping
// ---------------------------------------------------------------------------

/// Handle returned by [`ActionableService::register_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Outcome of dispatching one or more events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners whose event type and query matched.
    pub matched: usize,
    /// Matched listeners that returned an error or panicked.
    pub failed: usize,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.matched - self.failed
    }
}

impl std::ops::AddAssign for DispatchReport {
    fn add_assign(&mut self, rhs: Self) {
        self.matched += rhs.matched;
        self.failed += rhs.failed;
    }
}

struct Registered {
    id: ListenerId,
    listener: Box<dyn ActionableListener>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs every matching listener, isolating each one from the others' failures.
fn dispatch(listeners: &mut [Registered], ctx: &ActionEventContext) -> DispatchReport {
    let empty = ComponentBag::new();
    let components = ctx.components().unwrap_or(&empty);
    let mut report = DispatchReport::default();

    for entry in listeners.iter_mut() {
        if entry.listener.event_type() != ctx.event || !entry.listener.can_handle(components) {
            continue;
        }
        report.matched += 1;

        let listener = &mut entry.listener;
        match panic::catch_unwind(AssertUnwindSafe(|| listener.handle(ctx))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                report.failed += 1;
                tracing::warn!(
                    listener = entry.id.0,
                    event = %ctx.event,
                    position = ?ctx.position,
                    error = %err,
                    "actionable listener failed"
                );
            }
            Err(payload) => {
                report.failed += 1;
                tracing::warn!(
                    listener = entry.id.0,
                    event = %ctx.event,
                    position = ?ctx.position,
                    panic = %panic_message(payload.as_ref()),
                    "actionable listener panicked"
                );
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// ActionableService
// ---------------------------------------------------------------------------

/// Event bus for interactive blocks.
pub struct ActionableService {
    dims: ChunkDims,
    listeners: Vec<Registered>,
    next_listener: u64,
    instances: FxHashMap<IVec3, BlockInstance>,
    time: GameTime,
}

impl ActionableService {
    /// Creates an empty service for a world with the given chunk dimensions.
    pub fn new(dims: ChunkDims) -> Self {
        Self {
            dims,
            listeners: Vec::new(),
            next_listener: 0,
            instances: FxHashMap::default(),
            time: GameTime::default(),
        }
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    /// Time of the most recent [`update`](Self::update). Stamped on place and break events.
    pub fn time(&self) -> GameTime {
        self.time
    }

    // -- listeners --------------------------------------------------------

    /// Appends a listener. Listeners for the same event run in registration order.
    pub fn register_listener<L: ActionableListener + 'static>(&mut self, listener: L) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        tracing::debug!(listener = id.0, event = %listener.event_type(), "registered actionable listener");
        self.listeners.push(Registered {
            id,
            listener: Box::new(listener),
        });
        id
    }

    /// Removes a listener. Returns `false` if `id` is not registered.
    pub fn unregister_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // -- block lifecycle --------------------------------------------------

    /// A block was placed at `position`.
    ///
    /// Any instance already tracked there is broken first. If `block` is
    /// actionable, a new instance carrying the block type's components is
    /// tracked and `Place` is dispatched for it.
    pub fn on_place(&mut self, position: IVec3, block: &BlockType) -> Option<InstanceId> {
        self.on_place_with_overrides(position, block, &ComponentBag::new(), MergePolicy::Overwrite)
    }

    /// Like [`on_place`](Self::on_place), merging `overrides` into the
    /// block type's default components under `policy`.
    pub fn on_place_with_overrides(
        &mut self,
        position: IVec3,
        block: &BlockType,
        overrides: &ComponentBag,
        policy: MergePolicy,
    ) -> Option<InstanceId> {
        if self.instances.contains_key(&position) {
            self.on_remove(position);
        }
        if !block.is_actionable {
            return None;
        }

        let mut components = block.components.clone();
        components.merge(overrides, policy);
        let instance = BlockInstance::new(self.dims, position, block.id, components);
        let id = instance.id;
        let ctx = ActionEventContext::new(ActionEventType::Place, position, self.time)
            .with_target(ActionTarget::from(&instance));
        self.instances.insert(position, instance);
        tracing::debug!(instance = %id, block = %block.name, ?position, "tracking block instance");

        dispatch(&mut self.listeners, &ctx);
        Some(id)
    }

    /// A block was removed from `position`.
    ///
    /// Dispatches `Break` for the tracked instance, then stops tracking it.
    /// Positions without an instance are ignored.
    pub fn on_remove(&mut self, position: IVec3) -> Option<BlockInstance> {
        let target = ActionTarget::from(self.instances.get(&position)?);
        let ctx = ActionEventContext::new(ActionEventType::Break, position, self.time).with_target(target);
        dispatch(&mut self.listeners, &ctx);

        let removed = self.instances.remove(&position);
        if let Some(instance) = &removed {
            tracing::debug!(instance = %instance.id, ?position, "released block instance");
        }
        removed
    }

    /// The player used the block at `position`.
    pub fn on_use(&mut self, position: IVec3) -> DispatchReport {
        self.handle(ActionEventContext::new(ActionEventType::Use, position, self.time))
    }

    /// The block at `position` changed; notifies the instances on its six faces.
    pub fn on_neighbor_changed(&mut self, position: IVec3) -> DispatchReport {
        let mut report = DispatchReport::default();
        for offset in FACE_NEIGHBORS {
            let neighbor = position + offset;
            if let Some(instance) = self.instances.get(&neighbor) {
                let ctx = ActionEventContext::new(ActionEventType::NeighborChanged, neighbor, self.time)
                    .with_target(ActionTarget::from(instance));
                report += dispatch(&mut self.listeners, &ctx);
            }
        }
        report
    }

    // -- dispatch ---------------------------------------------------------

    /// Dispatches an explicit event.
    ///
    /// A context without a target is resolved against the instance tracked at
    /// its position; with neither, listeners are gated on an empty bag.
    pub fn handle(&mut self, mut ctx: ActionEventContext) -> DispatchReport {
        if ctx.target.is_none() {
            ctx.target = self.instances.get(&ctx.position).map(ActionTarget::from);
        }
        dispatch(&mut self.listeners, &ctx)
    }

    /// Advances the clock and raises `Tick` for every tracked instance, oldest first.
    pub fn update(&mut self, time: GameTime) -> DispatchReport {
        self.time = time;
        let has_tick_listeners = self
            .listeners
            .iter()
            .any(|entry| entry.listener.event_type() == ActionEventType::Tick);
        if !has_tick_listeners {
            return DispatchReport::default();
        }

        let mut contexts: Vec<ActionEventContext> = self
            .instances
            .values()
            .map(|instance| {
                ActionEventContext::new(ActionEventType::Tick, instance.position, time)
                    .with_target(ActionTarget::from(instance))
            })
            .collect();
        contexts.sort_by_key(|ctx| ctx.target.as_ref().and_then(|t| t.instance));

        let mut report = DispatchReport::default();
        for ctx in &contexts {
            report += dispatch(&mut self.listeners, ctx);
        }
        report
    }

    // -- instance table ---------------------------------------------------

    /// Read-only lookup of the instance at `position`.
    pub fn try_get_instance(&self, position: IVec3) -> Option<&BlockInstance> {
        self.instances.get(&position)
    }

    /// Mutable access to an instance's runtime components.
    pub fn components_mut(&mut self, position: IVec3) -> Option<&mut ComponentBag> {
        self.instances.get_mut(&position).map(|instance| &mut instance.components)
    }

    pub fn instances(&self) -> impl Iterator<Item = &BlockInstance> {
        self.instances.values()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Light emitted by tracked instances in `chunk`, read from each
    /// instance's own bag so runtime overrides count.
    ///
    /// Pass the result to `relight_chunk_with_emitters`.
    pub fn light_emitters(&self, chunk: ChunkCoord) -> Vec<LightSource> {
        let mut emitters: Vec<LightSource> = self
            .instances
            .values()
            .filter(|instance| instance.chunk == chunk)
            .filter_map(|instance| {
                let light = instance.components.light()?;
                Some(LightSource {
                    position: self.dims.local_of(instance.position),
                    level: light.radius.min(MAX_LIGHT_LEVEL),
                })
            })
            .filter(|source| source.level > 0)
            .collect();
        // Map order is unspecified; keep the source list stable.
        emitters.sort_by_key(|source| (source.position.y, source.position.z, source.position.x));
        emitters
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::{FnListener, ListenerError};
    use loam_voxel::{
        BlockRegistry, BlockTypeId, Component, ComponentKind, ComponentQuery, LightComponent,
        NotificationComponent, SoundComponent,
    };
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(ActionEventType, IVec3, BlockTypeId)>>>;

    fn registry() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry.register_block("stone", |b| b).unwrap();
        registry
            .register_block("lamp", |b| {
                b.with_component(Component::Light(LightComponent {
                    radius: 12,
                    color: None,
                }))
            })
            .unwrap();
        registry
            .register_block("chime", |b| {
                b.solid(false).with_component(Component::Sound(SoundComponent {
                    use_sound: Some("chime".into()),
                    ..Default::default()
                }))
            })
            .unwrap();
        registry
    }

    fn recorder(
        event: ActionEventType,
        query: ComponentQuery,
        log: &Log,
    ) -> impl ActionableListener + use<> {
        let log = Rc::clone(log);
        FnListener::new(event, query, move |ctx: &ActionEventContext| {
            let block = ctx.target.as_ref().map_or(BlockTypeId::AIR, |t| t.block_type);
            log.borrow_mut().push((ctx.event, ctx.position, block));
            Ok(())
        })
    }

    fn service() -> ActionableService {
        ActionableService::new(ChunkDims::new(16, 32))
    }

    #[test]
    fn test_place_tracks_actionable_blocks_only() {
        let registry = registry();
        let mut service = service();
        let log = Log::default();
        service.register_listener(recorder(ActionEventType::Place, ComponentQuery::new(), &log));

        let stone = registry.get_by_name("stone").unwrap();
        assert!(service.on_place(IVec3::new(1, 2, 3), stone).is_none());
        assert_eq!(service.instance_count(), 0);
        assert!(log.borrow().is_empty());

        let lamp = registry.get_by_name("lamp").unwrap();
        let id = service.on_place(IVec3::new(1, 2, 3), lamp).unwrap();
        let instance = service.try_get_instance(IVec3::new(1, 2, 3)).unwrap();
        assert_eq!(instance.id, id);
        assert_eq!(instance.block_type, lamp.id);
        assert!(instance.components.contains(ComponentKind::Light));
        assert_eq!(*log.borrow(), vec![(ActionEventType::Place, IVec3::new(1, 2, 3), lamp.id)]);
    }

    #[test]
    fn test_second_place_breaks_first() {
        let registry = registry();
        let mut service = service();
        let log = Log::default();
        service.register_listener(recorder(ActionEventType::Break, ComponentQuery::new(), &log));

        let lamp = registry.get_by_name("lamp").unwrap();
        let chime = registry.get_by_name("chime").unwrap();
        let p = IVec3::new(-4, 10, 7);
        let first = service.on_place(p, lamp).unwrap();
        let second = service.on_place(p, chime).unwrap();

        assert_ne!(first, second);
        assert_eq!(service.instance_count(), 1);
        assert_eq!(service.try_get_instance(p).unwrap().block_type, chime.id);
        assert_eq!(*log.borrow(), vec![(ActionEventType::Break, p, lamp.id)]);
    }

    #[test]
    fn test_placing_plain_block_over_instance_releases_it() {
        let registry = registry();
        let mut service = service();
        let p = IVec3::ZERO;
        service.on_place(p, registry.get_by_name("lamp").unwrap());
        service.on_place(p, registry.get_by_name("stone").unwrap());
        assert!(service.try_get_instance(p).is_none());
    }

    #[test]
    fn test_remove_without_instance_is_noop() {
        let mut service = service();
        let log = Log::default();
        service.register_listener(recorder(ActionEventType::Break, ComponentQuery::new(), &log));
        assert!(service.on_remove(IVec3::new(5, 5, 5)).is_none());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_query_gates_dispatch() {
        let registry = registry();
        let mut service = service();
        let sound_log = Log::default();
        let quiet_log = Log::default();
        service.register_listener(recorder(
            ActionEventType::Use,
            ComponentQuery::new().all([ComponentKind::Sound]),
            &sound_log,
        ));
        service.register_listener(recorder(
            ActionEventType::Use,
            ComponentQuery::new().none([ComponentKind::Sound]),
            &quiet_log,
        ));

        service.on_place(IVec3::X, registry.get_by_name("chime").unwrap());
        service.on_place(IVec3::Y, registry.get_by_name("lamp").unwrap());

        assert_eq!(service.on_use(IVec3::X).matched, 1);
        assert_eq!(service.on_use(IVec3::Y).matched, 1);
        // Untracked position: empty bag, so only the `none` query matches.
        assert_eq!(service.on_use(IVec3::Z).matched, 1);

        assert_eq!(sound_log.borrow().len(), 1);
        assert_eq!(quiet_log.borrow().len(), 2);
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let registry = registry();
        let mut service = service();
        let log = Log::default();
        service.register_listener(FnListener::new(
            ActionEventType::Use,
            ComponentQuery::new(),
            |_: &ActionEventContext| Err(ListenerError::failed("sound device lost")),
        ));
        service.register_listener(FnListener::new(
            ActionEventType::Use,
            ComponentQuery::new(),
            |_: &ActionEventContext| -> Result<(), ListenerError> { panic!("listener bug") },
        ));
        service.register_listener(recorder(ActionEventType::Use, ComponentQuery::new(), &log));

        service.on_place(IVec3::ZERO, registry.get_by_name("chime").unwrap());
        let report = service.on_use(IVec3::ZERO);
        assert_eq!(report, DispatchReport { matched: 3, failed: 2 });
        assert_eq!(report.succeeded(), 1);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_dispatch_follows_registration_order() {
        let mut service = service();
        let order = Rc::new(RefCell::new(Vec::new()));
        for n in 0..4 {
            let order = Rc::clone(&order);
            service.register_listener(FnListener::new(
                ActionEventType::Use,
                ComponentQuery::new(),
                move |_: &ActionEventContext| {
                    order.borrow_mut().push(n);
                    Ok(())
                },
            ));
        }
        service.on_use(IVec3::ZERO);
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_unregister_listener() {
        let mut service = service();
        let log = Log::default();
        let id = service.register_listener(recorder(ActionEventType::Use, ComponentQuery::new(), &log));
        assert!(service.unregister_listener(id));
        assert!(!service.unregister_listener(id));
        assert_eq!(service.on_use(IVec3::ZERO).matched, 0);
        assert_eq!(service.listener_count(), 0);
    }

    #[test]
    fn test_update_ticks_every_instance() {
        let registry = registry();
        let mut service = service();
        let log = Log::default();
        service.register_listener(recorder(ActionEventType::Tick, ComponentQuery::new(), &log));

        let lamp = registry.get_by_name("lamp").unwrap();
        for x in 0..5 {
            service.on_place(IVec3::new(x, 0, 0), lamp);
        }
        let time = GameTime::default().advance(0.05);
        let report = service.update(time);
        assert_eq!(report.matched, 5);
        assert_eq!(service.time(), time);

        // Oldest instance first.
        let positions: Vec<i32> = log.borrow().iter().map(|(_, p, _)| p.x).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_neighbor_changed_reaches_adjacent_instances() {
        let registry = registry();
        let mut service = service();
        let log = Log::default();
        service.register_listener(recorder(ActionEventType::NeighborChanged, ComponentQuery::new(), &log));

        let lamp = registry.get_by_name("lamp").unwrap();
        service.on_place(IVec3::new(0, 1, 0), lamp);
        service.on_place(IVec3::new(1, 0, 0), lamp);
        service.on_place(IVec3::new(1, 1, 0), lamp);

        let report = service.on_neighbor_changed(IVec3::ZERO);
        assert_eq!(report.matched, 2);
        assert!(log.borrow().iter().all(|(e, _, _)| *e == ActionEventType::NeighborChanged));
    }

    #[test]
    fn test_overrides_merge_into_instance() {
        let registry = registry();
        let mut service = service();
        let chime = registry.get_by_name("chime").unwrap();

        let mut overrides = ComponentBag::new();
        overrides.insert(Component::Sound(SoundComponent {
            use_sound: Some("gong".into()),
            ..Default::default()
        }));
        overrides.insert(Component::Notification(NotificationComponent {
            title: None,
            message: "hello".into(),
        }));

        service.on_place_with_overrides(IVec3::ZERO, chime, &overrides, MergePolicy::KeepExisting);
        let bag = &service.try_get_instance(IVec3::ZERO).unwrap().components;
        assert_eq!(bag.sound().and_then(|s| s.use_sound.as_deref()), Some("chime"));
        assert!(bag.contains(ComponentKind::Notification));

        service.on_place_with_overrides(IVec3::ZERO, chime, &overrides, MergePolicy::Overwrite);
        let bag = &service.try_get_instance(IVec3::ZERO).unwrap().components;
        assert_eq!(bag.sound().and_then(|s| s.use_sound.as_deref()), Some("gong"));
    }

    #[test]
    fn test_light_emitters_read_instance_bags() {
        let registry = registry();
        let mut service = service();
        let chime = registry.get_by_name("chime").unwrap();

        let mut glowing = ComponentBag::new();
        glowing.insert(Component::Light(LightComponent {
            radius: 30,
            color: None,
        }));
        service.on_place_with_overrides(IVec3::new(-1, 3, 2), chime, &glowing, MergePolicy::KeepExisting);
        service.on_place(IVec3::new(2, 5, 2), registry.get_by_name("lamp").unwrap());
        service.on_place(IVec3::new(3, 5, 2), chime);

        assert_eq!(
            service.light_emitters(ChunkCoord::new(-1, 0, 0)),
            vec![LightSource {
                position: glam::UVec3::new(15, 3, 2),
                level: MAX_LIGHT_LEVEL,
            }]
        );
        assert_eq!(
            service.light_emitters(ChunkCoord::new(0, 0, 0)),
            vec![LightSource {
                position: glam::UVec3::new(2, 5, 2),
                level: 12,
            }]
        );
        assert!(service.light_emitters(ChunkCoord::new(5, 0, 0)).is_empty());
    }

    #[test]
    fn test_explicit_target_wins_over_table() {
        let registry = registry();
        let mut service = service();
        let log = Log::default();
        service.register_listener(recorder(
            ActionEventType::Use,
            ComponentQuery::new().all([ComponentKind::Light]),
            &log,
        ));
        service.on_place(IVec3::ZERO, registry.get_by_name("lamp").unwrap());

        let ctx = ActionEventContext::new(ActionEventType::Use, IVec3::ZERO, GameTime::default())
            .with_target(ActionTarget::block(BlockTypeId(1), ComponentBag::new()));
        assert_eq!(service.handle(ctx).matched, 0);
        assert!(log.borrow().is_empty());
    }
}
