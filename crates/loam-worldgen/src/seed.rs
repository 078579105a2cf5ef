//! Deterministic per-chunk seeding.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use loam_voxel::ChunkCoord;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Seed for one chunk, mixed from the world seed and the chunk's coordinates.
///
/// `DefaultHasher::new` is keyed with zeros, so this is stable across
/// processes as well as threads.
pub fn derive_chunk_seed(world_seed: u64, coord: ChunkCoord) -> u64 {
    let mut state = DefaultHasher::new();
    (world_seed, [coord.x, coord.y, coord.z]).hash(&mut state);
    state.finish()
}

/// RNG producing the same sequence for the same `(world_seed, coord)` pair.
pub fn chunk_rng(world_seed: u64, coord: ChunkCoord) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_chunk_seed(world_seed, coord))
}
