//! Demo binary that drives the loam voxel core end to end.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p loam-demo -- --radius 3 --jobs 0` to generate a 7x7
//! patch on every core, then watch the actionable events in the log.

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use crossbeam_channel::Receiver;
use glam::IVec3;
use loam_actionable::{
    ActionEventContext, ActionEventType, ActionableService, FnListener, GameTime, ListenerError,
    NotificationListener, PhysicsAttachmentListener, PhysicsBridge, RelightRequestListener,
    SoundEffectListener, relight_channel,
};
use loam_config::{CliArgs, Config, default_config_dir};
use loam_lighting::{LightingOptions, relight_chunk_with_emitters};
use loam_voxel::{BlockRegistry, BlockType, BlockTypeId, ChunkCoord, ComponentQuery, RegistryError};
use loam_worldgen::{
    CancelFlag, ChunkGeneratorService, FlowerScatterStep, GeneratorSettings, HeightmapStep,
};
use tracing::{error, info, warn};

type DemoResult<T> = Result<T, Box<dyn Error>>;

/// Decorative and interactive blocks loaded from a definition document.
const BLOCK_DEFINITIONS: &str = r##"[
    {
        "name": "red_flower",
        "isSolid": false,
        "isOpaque": false,
        "isBillboard": true,
        "hardness": 0.0,
        "faces": { "all": "plants@0" }
    },
    {
        "name": "yellow_flower",
        "isSolid": false,
        "isOpaque": false,
        "isBillboard": true,
        "hardness": 0.0,
        "faces": { "all": "plants@1" }
    },
    {
        "name": "lamp",
        "isOpaque": false,
        "hardness": 0.3,
        "emitColor": "#FFD080",
        "components": [
            { "type": "light", "radius": 12, "color": "#FFD080" },
            { "type": "sound", "placeSound": "lamp_on", "breakSound": "lamp_off", "useSound": "click" }
        ],
        "faces": { "all": "blocks@40", "top": "blocks@41" }
    },
    {
        "name": "sign",
        "isSolid": false,
        "isOpaque": false,
        "components": [
            { "type": "notification", "title": "Trailhead", "message": "The valley lies east." }
        ],
        "faces": { "all": "blocks@50" }
    }
]"##;

/// Registers terrain blocks through the builder and the rest from JSON.
fn build_registry() -> Result<BlockRegistry, RegistryError> {
    let mut registry = BlockRegistry::new();

    registry
        .new_block("bedrock")
        .breakable(false)
        .hardness(100.0)
        .with_all_faces("terrain", 0)
        .build()?;
    registry.register_block("stone", |b| b.hardness(1.5).with_all_faces("terrain", 1))?;
    registry.register_block("dirt", |b| b.hardness(0.5).with_all_faces("terrain", 2))?;
    registry.register_block("grass", |b| {
        b.hardness(0.6)
            .with_all_faces("terrain", 3)
            .with_top("terrain", 4)
            .with_bottom("terrain", 2)
    })?;

    let loaded = registry.register_blocks_from_json_array(BLOCK_DEFINITIONS)?;
    info!(
        "Registry ready: {} block types ({} from definitions)",
        registry.len(),
        loaded.len()
    );
    for block in registry.iter() {
        info!(
            "  #{:<3} {:<14} solid={} opaque={} actionable={}",
            block.id.0, block.name, block.is_solid, block.is_opaque, block.is_actionable
        );
    }
    Ok(registry)
}

/// Runs eager generation on a background thread and logs the outcome.
fn demonstrate_initial_generation(
    config: &Config,
    registry: Arc<BlockRegistry>,
) -> DemoResult<Arc<ChunkGeneratorService>> {
    let settings = GeneratorSettings::from_config(config);
    info!(
        "Generating initial chunks: radius {} around {:?}, layers {:?}, {} workers",
        settings.initial_radius,
        settings.initial_position,
        settings.initial_layers,
        settings.worker_count()
    );

    let service = Arc::new(ChunkGeneratorService::new(registry, settings));
    service.add_generator_step(HeightmapStep::default());
    service.add_generator_step(FlowerScatterStep::default());
    info!("Pipeline: {:?} (+ lighting: {})", service.step_names(), config.lighting.enabled);

    let handle = service.spawn_initial_generation(CancelFlag::new())?;
    let report = handle
        .join()
        .map_err(|_| "initial generation thread panicked")?;

    info!(
        "Initial generation: {}/{} processed, {} generated, {} reused, {} failed, {} skipped in {} ms",
        report.processed(),
        report.requested,
        report.generated,
        report.reused,
        report.failed.len(),
        report.skipped.len(),
        report.elapsed_ms
    );
    for failure in &report.failed {
        warn!("  {failure}");
    }
    info!("Cache holds {} chunks", service.cached_count());
    Ok(service)
}

/// Regenerates one chunk after a cache clear and checks it is bit-identical.
fn demonstrate_determinism(service: &ChunkGeneratorService) -> DemoResult<()> {
    let coord = ChunkCoord::new(0, 0, 0);
    let before = service.get_chunk_by_coords(coord)?;
    let hash_before = before.read().map_err(|_| "chunk lock poisoned")?.content_hash();

    service.clear_cache();
    let after = service.get_chunk_by_coords(coord)?;
    let hash_after = after.read().map_err(|_| "chunk lock poisoned")?.content_hash();

    info!(
        "Chunk {} content hash {:016x} -> {:016x} after cache clear (identical: {})",
        coord,
        hash_before,
        hash_after,
        hash_before == hash_after
    );
    Ok(())
}

/// Logs physics attachments instead of talking to a physics engine.
struct LoggingPhysics;

impl PhysicsBridge for LoggingPhysics {
    fn attach_block(&mut self, position: IVec3, block: BlockTypeId) -> Result<(), ListenerError> {
        info!("physics: attach static body for block #{} at {:?}", block.0, position);
        Ok(())
    }

    fn detach_block(&mut self, position: IVec3) -> Result<(), ListenerError> {
        info!("physics: detach body at {:?}", position);
        Ok(())
    }
}

fn actionable_service(service: &ChunkGeneratorService) -> (ActionableService, Receiver<ChunkCoord>) {
    let dims = service.dims();
    let mut actionable = ActionableService::new(dims);
    let (relight_tx, relight_rx) = relight_channel();

    for event in [ActionEventType::Place, ActionEventType::Break, ActionEventType::Use] {
        actionable.register_listener(SoundEffectListener::new(
            event,
            |clip: &str, at: glam::Vec3| -> Result<(), ListenerError> {
                info!("sound: play '{clip}' at {at}");
                Ok(())
            },
        ));
    }
    actionable.register_listener(NotificationListener::new(
        |title: Option<&str>, message: &str| -> Result<(), ListenerError> {
            info!("notification: [{}] {message}", title.unwrap_or("-"));
            Ok(())
        },
    ));
    actionable.register_listener(PhysicsAttachmentListener::attach(LoggingPhysics));
    actionable.register_listener(PhysicsAttachmentListener::detach(LoggingPhysics));
    actionable.register_listener(RelightRequestListener::new(
        ActionEventType::Place,
        dims,
        relight_tx.clone(),
    ));
    actionable.register_listener(RelightRequestListener::new(ActionEventType::Break, dims, relight_tx));
    actionable.register_listener(FnListener::new(
        ActionEventType::Tick,
        ComponentQuery::new(),
        |ctx: &ActionEventContext| -> Result<(), ListenerError> {
            tracing::debug!("tick {} at {:?}", ctx.time.tick, ctx.position);
            Ok(())
        },
    ));

    (actionable, relight_rx)
}

/// First air cell above the terrain in a world column.
fn surface_position(service: &ChunkGeneratorService, x: i32, z: i32) -> DemoResult<IVec3> {
    let dims = service.dims();
    let chunk = service.get_chunk_by_world_position(IVec3::new(x, 0, z))?;
    let chunk = chunk.read().map_err(|_| "chunk lock poisoned")?;
    let local = dims.local_of(IVec3::new(x, 0, z));
    let top = (0..dims.height)
        .rev()
        .find(|&y| chunk.get_block(local.x, y, local.z) != BlockTypeId::AIR)
        .ok_or("column is empty")?;
    if top + 1 >= dims.height {
        return Err("column is full to the top of the chunk".into());
    }
    Ok(chunk.world_origin() + IVec3::new(local.x as i32, top as i32 + 1, local.z as i32))
}

/// Writes a block into the cached chunk and notifies the actionable service.
fn place_block(
    service: &ChunkGeneratorService,
    actionable: &mut ActionableService,
    position: IVec3,
    block: &BlockType,
) -> DemoResult<()> {
    let dims = service.dims();
    let chunk = service.get_chunk_by_world_position(position)?;
    {
        let mut chunk = chunk.write().map_err(|_| "chunk lock poisoned")?;
        let local = dims.local_of(position);
        chunk.set_block(local.x, local.y, local.z, block.id);
    }
    if let Some(instance) = actionable.on_place(position, block) {
        info!("placed {} at {:?} as instance {}", block.name, position, instance);
    }
    actionable.on_neighbor_changed(position);
    Ok(())
}

fn break_block(
    service: &ChunkGeneratorService,
    actionable: &mut ActionableService,
    position: IVec3,
) -> DemoResult<()> {
    let dims = service.dims();
    actionable.on_remove(position);
    let chunk = service.get_chunk_by_world_position(position)?;
    {
        let mut chunk = chunk.write().map_err(|_| "chunk lock poisoned")?;
        let local = dims.local_of(position);
        chunk.set_block(local.x, local.y, local.z, BlockTypeId::AIR);
    }
    actionable.on_neighbor_changed(position);
    Ok(())
}

/// Relights every chunk queued by the relight listeners, including light
/// carried by placed instances.
fn drain_relight_requests(
    service: &ChunkGeneratorService,
    actionable: &ActionableService,
    requests: &Receiver<ChunkCoord>,
    options: LightingOptions,
) -> DemoResult<usize> {
    let mut coords: Vec<ChunkCoord> = requests.try_iter().collect();
    coords.sort_unstable();
    coords.dedup();
    for coord in &coords {
        let chunk = service.get_chunk_by_coords(*coord)?;
        let mut chunk = chunk.write().map_err(|_| "chunk lock poisoned")?;
        let emitters = actionable.light_emitters(*coord);
        let stats = relight_chunk_with_emitters(&mut chunk, service.registry(), options, &emitters);
        info!(
            "relit chunk {}: {} sources, {} lit cells",
            coord, stats.sources, stats.lit_cells
        );
    }
    Ok(coords.len())
}

/// Places, uses, ticks and breaks a few interactive blocks.
fn demonstrate_actionable(service: &ChunkGeneratorService, config: &Config) -> DemoResult<()> {
    let registry = Arc::clone(service.registry());
    let lamp = registry.get_by_name("lamp")?;
    let sign = registry.get_by_name("sign")?;
    let options = LightingOptions {
        sky_light: config.lighting.sky_light,
    };

    let (mut actionable, relight_requests) = actionable_service(service);

    let lamp_at = surface_position(service, 4, 4)?;
    let sign_at = surface_position(service, 6, 4)?;
    place_block(service, &mut actionable, lamp_at, lamp)?;
    place_block(service, &mut actionable, sign_at, sign)?;
    drain_relight_requests(service, &actionable, &relight_requests, options)?;

    {
        let chunk = service.get_chunk_by_world_position(lamp_at)?;
        let chunk = chunk.read().map_err(|_| "chunk lock poisoned")?;
        let local = service.dims().local_of(lamp_at);
        info!("light at lamp: {}", chunk.get_light(local.x, local.y, local.z));
    }

    actionable.on_use(sign_at);
    actionable.on_use(lamp_at);

    let mut time = GameTime::default();
    for _ in 0..3 {
        time = time.advance(1.0 / 20.0);
        let report = actionable.update(time);
        info!("tick {}: {} listener calls", time.tick, report.matched);
    }

    // Swap the sign for a lamp in place: the sign is broken first.
    place_block(service, &mut actionable, sign_at, lamp)?;
    break_block(service, &mut actionable, lamp_at)?;
    let relit = drain_relight_requests(service, &actionable, &relight_requests, options)?;

    info!(
        "{} tracked instances remain, {} chunks relit",
        actionable.instance_count(),
        relit
    );
    Ok(())
}

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}, using defaults");
        config = Config::default();
    }

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    loam_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!("loam demo starting (seed {})", config.world.seed);

    let registry = match build_registry() {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Block registration failed: {e}");
            return;
        }
    };

    let service = match demonstrate_initial_generation(&config, registry) {
        Ok(service) => service,
        Err(e) => {
            error!("Initial generation failed: {e}");
            return;
        }
    };

    if let Err(e) = demonstrate_determinism(&service) {
        error!("Determinism check failed: {e}");
    }
    if let Err(e) = demonstrate_actionable(&service, &config) {
        error!("Actionable demonstration failed: {e}");
    }

    info!("loam demo finished");
}
