//! Chunk generation service: a bounded LRU cache in front of the step pipeline.
//!
//! Each chunk coordinate moves Uncached → Generating → Cached. Concurrent
//! requests for the same coordinate share one generation: the first caller
//! runs the pipeline, later callers block on its result. Initial generation
//! fans coordinates out over a fixed number of worker threads.

use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::unbounded;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use glam::IVec3;
use loam_config::Config;
use loam_lighting::LightingOptions;
use loam_voxel::{BlockRegistry, ChunkCoord, ChunkDims, ChunkEntity};
use lru::LruCache;

use crate::context::GeneratorContext;
use crate::error::GenerationError;
use crate::step::GeneratorStep;
use crate::steps::LightingStep;

/// A cached chunk. Readers take the read lock; edits take the write lock.
pub type SharedChunk = Arc<RwLock<ChunkEntity>>;

/// Everything the service needs from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub dims: ChunkDims,
    pub seed: u64,
    pub max_cache_size_chunks: NonZeroUsize,
    /// Worker threads for initial generation. 0 means one per CPU core.
    pub max_concurrent_jobs: usize,
    /// World-space block position initial generation is centred on.
    pub initial_position: IVec3,
    pub initial_radius: u32,
    /// Chunk-space Y layers generated eagerly.
    pub initial_layers: RangeInclusive<i32>,
    /// Built-in lighting pass run after the registered steps; `None` disables it.
    pub lighting: Option<LightingOptions>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl GeneratorSettings {
    pub fn from_config(config: &Config) -> Self {
        let world = &config.world;
        let [x, y, z] = world.initial_position;
        Self {
            dims: ChunkDims::new(world.chunk_size.max(1), world.chunk_height.max(1)),
            seed: world.seed,
            max_cache_size_chunks: NonZeroUsize::new(world.max_cache_size_chunks)
                .unwrap_or(NonZeroUsize::MIN),
            max_concurrent_jobs: world.max_concurrent_jobs,
            initial_position: IVec3::new(x, y, z),
            initial_radius: world.initial_radius,
            initial_layers: world.initial_layers.min_layer..=world.initial_layers.max_layer,
            lighting: config.lighting.enabled.then_some(LightingOptions {
                sky_light: config.lighting.sky_light,
            }),
        }
    }

    /// Effective worker count for initial generation.
    pub fn worker_count(&self) -> usize {
        match self.max_concurrent_jobs {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

/// Cooperative cancellation for initial generation, checked between chunks.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Summary of an initial generation run.
#[derive(Debug, Default)]
pub struct InitialGenerationReport {
    /// Coordinates the run was asked to materialise.
    pub requested: usize,
    /// Chunks this run generated.
    pub generated: usize,
    /// Chunks that were already cached or generated by another caller.
    pub reused: usize,
    /// Chunks whose pipeline failed. They are cached in their partial state.
    pub failed: Vec<GenerationError>,
    /// Chunks never started because the [`CancelFlag`] was raised first.
    pub skipped: Vec<ChunkCoord>,
    /// Set when the run stopped early because of a [`CancelFlag`].
    pub cancelled: bool,
    pub elapsed_ms: u128,
}

impl InitialGenerationReport {
    /// Chunks the run got through, successfully or not.
    pub fn processed(&self) -> usize {
        self.generated + self.reused + self.failed.len()
    }
}

/// How a chunk request was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Fetch {
    Hit,
    Joined,
    Generated,
    /// Not attempted; the run was cancelled.
    Skipped,
}

/// Rendezvous for callers waiting on an in-progress generation.
#[derive(Default)]
struct InFlight {
    result: Mutex<Option<Result<SharedChunk, GenerationError>>>,
    ready: Condvar,
}

impl InFlight {
    fn complete(&self, result: Result<SharedChunk, GenerationError>) {
        *lock(&self.result) = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<SharedChunk, GenerationError> {
        let guard = lock(&self.result);
        let guard = self
            .ready
            .wait_while(guard, |result| result.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(result) => result.clone(),
            // wait_while only returns once the slot is filled.
            None => unreachable!("in-flight slot woke without a result"),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn run_step(step: &dyn GeneratorStep, ctx: &mut GeneratorContext<'_>) -> Result<(), GenerationError> {
    step.generate(ctx).map_err(|err| GenerationError::StepFailed {
        coord: ctx.coord(),
        step: step.name().to_string(),
        message: err.to_string(),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Generates, caches and hands out chunks.
///
/// All methods take `&self`; share the service behind an `Arc` between the
/// streaming layer and worker threads.
pub struct ChunkGeneratorService {
    registry: Arc<BlockRegistry>,
    settings: GeneratorSettings,
    steps: RwLock<Vec<Arc<dyn GeneratorStep>>>,
    lighting: Option<LightingStep>,
    cache: Mutex<LruCache<ChunkCoord, SharedChunk>>,
    in_flight: DashMap<ChunkCoord, Arc<InFlight>>,
}

impl ChunkGeneratorService {
    pub fn new(registry: Arc<BlockRegistry>, settings: GeneratorSettings) -> Self {
        let lighting = settings.lighting.map(LightingStep::new);
        Self {
            cache: Mutex::new(LruCache::new(settings.max_cache_size_chunks)),
            registry,
            settings,
            steps: RwLock::new(Vec::new()),
            lighting,
            in_flight: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    pub fn dims(&self) -> ChunkDims {
        self.settings.dims
    }

    // -----------------------------------------------------------------------
    // Step list
    // -----------------------------------------------------------------------

    /// Appends a step. Chunks already cached are not regenerated.
    pub fn add_generator_step<S: GeneratorStep + 'static>(&self, step: S) {
        self.add_shared_step(Arc::new(step));
    }

    pub fn add_shared_step(&self, step: Arc<dyn GeneratorStep>) {
        tracing::debug!(step = step.name(), "added generator step");
        self.steps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(step);
    }

    /// Removes the first step named `name`. Returns `false` if there is none.
    pub fn remove_generator_step(&self, name: &str) -> bool {
        let mut steps = self.steps.write().unwrap_or_else(PoisonError::into_inner);
        match steps.iter().position(|step| step.name() == name) {
            Some(index) => {
                steps.remove(index);
                tracing::debug!(step = name, "removed generator step");
                true
            }
            None => false,
        }
    }

    /// Registered step names in run order. The built-in lighting pass is not listed.
    pub fn step_names(&self) -> Vec<String> {
        self.steps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|step| step.name().to_string())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Chunk access
    // -----------------------------------------------------------------------

    /// Returns the chunk containing world-space block `position`, generating it on a miss.
    pub fn get_chunk_by_world_position(&self, position: IVec3) -> Result<SharedChunk, GenerationError> {
        self.get_chunk_by_coords(self.settings.dims.chunk_of(position))
    }

    /// Returns the chunk at `coord`, generating it on a miss.
    ///
    /// # Errors
    ///
    /// A step failure or panic. The partially generated chunk is still cached,
    /// so a later call returns it; call [`clear_cache`](Self::clear_cache) to retry.
    pub fn get_chunk_by_coords(&self, coord: ChunkCoord) -> Result<SharedChunk, GenerationError> {
        self.fetch(coord).0
    }

    /// Cached chunk at `coord`, without generating or touching recency.
    pub fn try_get_cached_chunk(&self, coord: ChunkCoord) -> Option<SharedChunk> {
        lock(&self.cache).peek(&coord).cloned()
    }

    /// Marks `coord` as recently used. Returns `false` if it is not cached.
    pub fn touch(&self, coord: ChunkCoord) -> bool {
        lock(&self.cache).get(&coord).is_some()
    }

    /// Snapshot of every cached chunk, most recently used first.
    pub fn get_active_chunks(&self) -> Vec<(ChunkCoord, SharedChunk)> {
        lock(&self.cache)
            .iter()
            .map(|(coord, chunk)| (*coord, Arc::clone(chunk)))
            .collect()
    }

    pub fn cached_count(&self) -> usize {
        lock(&self.cache).len()
    }

    /// Drops every cached chunk. Handles already given out stay valid.
    pub fn clear_cache(&self) {
        let mut cache = lock(&self.cache);
        tracing::debug!(chunks = cache.len(), "clearing chunk cache");
        cache.clear();
    }

    fn cache_get(&self, coord: ChunkCoord) -> Option<SharedChunk> {
        lock(&self.cache).get(&coord).cloned()
    }

    fn fetch(&self, coord: ChunkCoord) -> (Result<SharedChunk, GenerationError>, Fetch) {
        if let Some(chunk) = self.cache_get(coord) {
            tracing::trace!(%coord, "chunk cache hit");
            return (Ok(chunk), Fetch::Hit);
        }

        let slot = match self.in_flight.entry(coord) {
            Entry::Occupied(entry) => {
                let slot = Arc::clone(entry.get());
                drop(entry);
                return (slot.wait(), Fetch::Joined);
            }
            Entry::Vacant(entry) => {
                // The previous leader may have finished between the miss and here.
                if let Some(chunk) = self.cache_get(coord) {
                    return (Ok(chunk), Fetch::Hit);
                }
                let slot = Arc::new(InFlight::default());
                entry.insert(Arc::clone(&slot));
                slot
            }
        };

        let (chunk, outcome) = self.run_pipeline(coord);
        let shared = Arc::new(RwLock::new(chunk));
        self.insert_cached(coord, Arc::clone(&shared));

        let result = outcome.map(|()| shared);
        slot.complete(result.clone());
        self.in_flight.remove(&coord);
        (result, Fetch::Generated)
    }

    fn insert_cached(&self, coord: ChunkCoord, chunk: SharedChunk) {
        let evicted = lock(&self.cache).push(coord, chunk);
        if let Some((old, _)) = evicted {
            if old != coord {
                tracing::debug!(evicted = %old, inserted = %coord, "chunk cache full, evicted least recently used");
            }
        }
    }

    /// Runs every step, then lighting, against a fresh chunk.
    fn run_pipeline(&self, coord: ChunkCoord) -> (ChunkEntity, Result<(), GenerationError>) {
        let steps: Vec<Arc<dyn GeneratorStep>> = self
            .steps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let mut chunk = ChunkEntity::new(coord, self.settings.dims);
        let start = Instant::now();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(), GenerationError> {
            let mut ctx = GeneratorContext::new(&mut chunk, &self.registry, self.settings.seed);
            for step in &steps {
                run_step(step.as_ref(), &mut ctx)?;
            }
            if let Some(lighting) = &self.lighting {
                run_step(lighting, &mut ctx)?;
            }
            Ok(())
        }))
        .unwrap_or_else(|payload| {
            Err(GenerationError::WorkerPanicked {
                coord,
                message: panic_message(payload.as_ref()),
            })
        });

        match &outcome {
            Ok(()) => tracing::debug!(
                %coord,
                elapsed_us = start.elapsed().as_micros() as u64,
                "generated chunk"
            ),
            Err(err) => {
                tracing::warn!(%coord, error = %err, "chunk generation failed, caching partial chunk")
            }
        }
        (chunk, outcome)
    }

    // -----------------------------------------------------------------------
    // Initial generation
    // -----------------------------------------------------------------------

    /// Coordinates covered by initial generation, nearest to the centre first.
    pub fn initial_coords(&self) -> Vec<ChunkCoord> {
        let center = self.settings.dims.chunk_of(self.settings.initial_position);
        let r = self.settings.initial_radius as i32;
        let mut coords = Vec::new();
        for y in self.settings.initial_layers.clone() {
            for dz in -r..=r {
                for dx in -r..=r {
                    coords.push(ChunkCoord::new(center.x + dx, y, center.z + dz));
                }
            }
        }
        coords.sort_by_key(|c| {
            let (dx, dz) = (c.x - center.x, c.z - center.z);
            (dx * dx + dz * dz, c.y)
        });
        coords
    }

    /// Generates every initial chunk, blocking until all are done.
    pub fn generate_initial_chunks(&self) -> InitialGenerationReport {
        self.generate_initial_chunks_with_cancel(&CancelFlag::new())
    }

    /// Generates every initial chunk on at most `worker_count()` threads.
    ///
    /// Workers check `cancel` before each chunk; a chunk already started runs to
    /// completion. Chunks left in the queue are reported in `skipped`.
    pub fn generate_initial_chunks_with_cancel(&self, cancel: &CancelFlag) -> InitialGenerationReport {
        let start = Instant::now();
        let coords = self.initial_coords();
        let mut report = InitialGenerationReport {
            requested: coords.len(),
            ..Default::default()
        };
        if coords.is_empty() {
            return report;
        }

        let (job_tx, job_rx) = unbounded::<ChunkCoord>();
        for coord in &coords {
            // The receiver is alive for the whole function.
            let _ = job_tx.send(*coord);
        }
        drop(job_tx);
        let (done_tx, done_rx) = unbounded::<(Result<SharedChunk, GenerationError>, Fetch)>();

        let workers = self.settings.worker_count().min(coords.len());
        let work = |jobs: crossbeam_channel::Receiver<ChunkCoord>,
                    done: crossbeam_channel::Sender<(Result<SharedChunk, GenerationError>, Fetch)>| {
            while let Ok(coord) = jobs.recv() {
                let outcome = if cancel.is_cancelled() {
                    (Err(GenerationError::Cancelled(coord)), Fetch::Skipped)
                } else {
                    self.fetch(coord)
                };
                if done.send(outcome).is_err() {
                    break;
                }
            }
        };

        std::thread::scope(|scope| {
            let mut spawned = 0;
            for i in 0..workers {
                let (jobs, done) = (job_rx.clone(), done_tx.clone());
                let handle = std::thread::Builder::new()
                    .name(format!("chunk-gen-{i}"))
                    .spawn_scoped(scope, move || work(jobs, done));
                match handle {
                    Ok(_) => spawned += 1,
                    Err(err) => tracing::warn!(error = %err, "failed to spawn chunk generation worker"),
                }
            }
            if spawned == 0 {
                work(job_rx.clone(), done_tx.clone());
            }
        });
        drop(done_tx);

        for (result, fetch) in done_rx.iter() {
            match (result, fetch) {
                (Err(GenerationError::Cancelled(coord)), _) => report.skipped.push(coord),
                (Err(err), _) => report.failed.push(err),
                (Ok(_), Fetch::Generated) => report.generated += 1,
                (Ok(_), _) => report.reused += 1,
            }
        }
        report.cancelled = !report.skipped.is_empty();
        report.elapsed_ms = start.elapsed().as_millis();

        tracing::info!(
            requested = report.requested,
            generated = report.generated,
            reused = report.reused,
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            workers,
            elapsed_ms = report.elapsed_ms as u64,
            "initial chunk generation finished"
        );
        report
    }

    /// Runs [`generate_initial_chunks_with_cancel`](Self::generate_initial_chunks_with_cancel)
    /// on a background thread so the caller's frame loop keeps running.
    pub fn spawn_initial_generation(
        self: &Arc<Self>,
        cancel: CancelFlag,
    ) -> std::io::Result<JoinHandle<InitialGenerationReport>> {
        let service = Arc::clone(self);
        std::thread::Builder::new()
            .name("chunk-gen-initial".into())
            .spawn(move || service.generate_initial_chunks_with_cancel(&cancel))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StepError;
    use crate::step::FnStep;
    use crate::steps::FlatWorldStep;
    use loam_voxel::BlockTypeId;
    use std::sync::atomic::AtomicUsize;

    fn registry() -> Arc<BlockRegistry> {
        let mut registry = BlockRegistry::new();
        for name in ["bedrock", "stone", "dirt", "grass"] {
            registry.register_block(name, |b| b).unwrap();
        }
        Arc::new(registry)
    }

    fn settings(cache: usize) -> GeneratorSettings {
        GeneratorSettings {
            dims: ChunkDims::new(8, 32),
            max_cache_size_chunks: NonZeroUsize::new(cache).unwrap(),
            max_concurrent_jobs: 2,
            initial_radius: 1,
            ..GeneratorSettings::default()
        }
    }

    fn counting_step(counter: &Arc<AtomicUsize>) -> FnStep {
        let counter = Arc::clone(counter);
        FnStep::new("counter", move |_: &mut GeneratorContext<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.world.initial_position = [-1, 40, 17];
        config.lighting.enabled = false;
        let settings = GeneratorSettings::from_config(&config);
        assert_eq!(settings.dims, ChunkDims::new(16, 32));
        assert_eq!(settings.initial_position, IVec3::new(-1, 40, 17));
        assert_eq!(settings.initial_layers, 0..=0);
        assert!(settings.lighting.is_none());
    }

    #[test]
    fn test_worker_count_zero_means_all_cores() {
        let mut s = settings(4);
        s.max_concurrent_jobs = 0;
        assert!(s.worker_count() >= 1);
        s.max_concurrent_jobs = 3;
        assert_eq!(s.worker_count(), 3);
    }

    #[test]
    fn test_world_position_uses_floor_division() {
        let service = ChunkGeneratorService::new(registry(), settings(8));
        let chunk = service.get_chunk_by_world_position(IVec3::new(-1, 5, 9)).unwrap();
        assert_eq!(chunk.read().unwrap().coord(), ChunkCoord::new(-1, 0, 1));
    }

    #[test]
    fn test_cache_hit_returns_same_instance() {
        let service = ChunkGeneratorService::new(registry(), settings(8));
        let counter = Arc::new(AtomicUsize::new(0));
        service.add_generator_step(counting_step(&counter));

        let first = service.get_chunk_by_coords(ChunkCoord::default()).unwrap();
        for _ in 0..5 {
            let again = service.get_chunk_by_coords(ChunkCoord::default()).unwrap();
            assert!(Arc::ptr_eq(&first, &again));
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let service = ChunkGeneratorService::new(registry(), settings(2));
        let a = ChunkCoord::new(0, 0, 0);
        let b = ChunkCoord::new(1, 0, 0);
        let c = ChunkCoord::new(2, 0, 0);
        service.get_chunk_by_coords(a).unwrap();
        service.get_chunk_by_coords(b).unwrap();
        assert!(service.touch(a));
        service.get_chunk_by_coords(c).unwrap();

        assert_eq!(service.cached_count(), 2);
        assert!(service.try_get_cached_chunk(a).is_some());
        assert!(service.try_get_cached_chunk(b).is_none());
        assert!(service.try_get_cached_chunk(c).is_some());
    }

    #[test]
    fn test_clear_cache_forces_regeneration() {
        let service = ChunkGeneratorService::new(registry(), settings(8));
        let counter = Arc::new(AtomicUsize::new(0));
        service.add_generator_step(counting_step(&counter));

        let first = service.get_chunk_by_coords(ChunkCoord::default()).unwrap();
        service.clear_cache();
        assert_eq!(service.cached_count(), 0);
        let second = service.get_chunk_by_coords(ChunkCoord::default()).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove_generator_step() {
        let service = ChunkGeneratorService::new(registry(), settings(8));
        service.add_generator_step(FlatWorldStep::classic());
        service.add_generator_step(counting_step(&Arc::new(AtomicUsize::new(0))));
        assert_eq!(service.step_names(), ["flat_world", "counter"]);
        assert!(service.remove_generator_step("flat_world"));
        assert!(!service.remove_generator_step("flat_world"));
        assert_eq!(service.step_names(), ["counter"]);
    }

    #[test]
    fn test_failed_step_aborts_pipeline_and_caches_partial_chunk() {
        let service = ChunkGeneratorService::new(registry(), settings(8));
        let after = Arc::new(AtomicUsize::new(0));
        service.add_generator_step(FnStep::new("place", |ctx: &mut GeneratorContext<'_>| {
            ctx.set_block(0, 0, 0, BlockTypeId(2));
            Ok(())
        }));
        service.add_generator_step(FnStep::new("explode", |_: &mut GeneratorContext<'_>| {
            Err(StepError::failed("no more stone"))
        }));
        service.add_generator_step(counting_step(&after));

        let err = service.get_chunk_by_coords(ChunkCoord::default()).unwrap_err();
        assert!(matches!(&err, GenerationError::StepFailed { step, .. } if step == "explode"));
        assert_eq!(after.load(Ordering::SeqCst), 0);

        let partial = service.try_get_cached_chunk(ChunkCoord::default()).unwrap();
        let partial = partial.read().unwrap();
        assert_eq!(partial.get_block(0, 0, 0), BlockTypeId(2));
        // Lighting never ran.
        assert!(partial.light().iter().all(|&l| l == 0));
    }

    #[test]
    fn test_panicking_step_is_reported() {
        let service = ChunkGeneratorService::new(registry(), settings(8));
        service.add_generator_step(FnStep::new("panics", |_: &mut GeneratorContext<'_>| {
            panic!("step blew up")
        }));
        let err = service.get_chunk_by_coords(ChunkCoord::default()).unwrap_err();
        assert!(matches!(&err, GenerationError::WorkerPanicked { message, .. } if message == "step blew up"));
        assert_eq!(service.cached_count(), 1);
    }

    #[test]
    fn test_initial_coords_cover_radius_nearest_first() {
        let mut s = settings(64);
        s.initial_position = IVec3::new(20, 0, -3);
        s.initial_layers = 0..=1;
        let service = ChunkGeneratorService::new(registry(), s);
        let coords = service.initial_coords();
        assert_eq!(coords.len(), 18);
        // (20, -3) is in chunk (2, -1) with 8-wide chunks.
        assert_eq!(coords[0], ChunkCoord::new(2, 0, -1));
        assert_eq!(coords[1], ChunkCoord::new(2, 1, -1));
    }

    #[test]
    fn test_initial_generation_report() {
        let service = ChunkGeneratorService::new(registry(), settings(64));
        service.add_generator_step(FlatWorldStep::classic());
        service.get_chunk_by_coords(ChunkCoord::default()).unwrap();

        let report = service.generate_initial_chunks();
        assert_eq!(report.requested, 9);
        assert_eq!(report.generated, 8);
        assert_eq!(report.reused, 1);
        assert!(report.failed.is_empty());
        assert!(!report.cancelled);
        assert_eq!(service.cached_count(), 9);
    }

    #[test]
    fn test_cancelled_initial_generation_stops_early() {
        let service = ChunkGeneratorService::new(registry(), settings(64));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let report = service.generate_initial_chunks_with_cancel(&cancel);
        assert!(report.cancelled);
        assert_eq!(report.processed(), 0);
        assert_eq!(report.skipped.len(), 9);
        assert!(report.failed.is_empty());
        assert_eq!(service.cached_count(), 0);
    }

    #[test]
    fn test_cancel_mid_run_reports_unstarted_chunks() {
        let service = ChunkGeneratorService::new(
            registry(),
            GeneratorSettings {
                max_concurrent_jobs: 1,
                ..settings(64)
            },
        );
        let cancel = CancelFlag::new();
        let trip = cancel.clone();
        service.add_generator_step(FnStep::new("cancel_after_first", move |_: &mut GeneratorContext<'_>| {
            trip.cancel();
            Ok(())
        }));

        let report = service.generate_initial_chunks_with_cancel(&cancel);
        assert!(report.cancelled);
        assert_eq!(report.generated, 1);
        assert_eq!(report.skipped.len(), 8);
        assert_eq!(report.processed() + report.skipped.len(), report.requested);

        // The centre chunk comes first and is the only one generated.
        let centre = service.initial_coords()[0];
        assert!(!report.skipped.contains(&centre));
        assert!(service.try_get_cached_chunk(centre).is_some());
        assert_eq!(service.cached_count(), 1);
    }

    #[test]
    fn test_spawned_initial_generation() {
        let service = Arc::new(ChunkGeneratorService::new(registry(), settings(64)));
        let handle = service.spawn_initial_generation(CancelFlag::new()).unwrap();
        let report = handle.join().unwrap();
        assert_eq!(report.generated, 9);
    }
}
