//! The narrow view of a chunk that generator steps work through.

use glam::{IVec3, UVec3};
use loam_voxel::{BlockRegistry, BlockTypeId, ChunkCoord, ChunkEntity};
use rand_chacha::ChaCha8Rng;

use crate::error::StepError;
use crate::seed;

/// Wraps the chunk being generated together with the registry and world seed.
///
/// Block coordinates are chunk-local. Writes outside the chunk panic.
pub struct GeneratorContext<'a> {
    chunk: &'a mut ChunkEntity,
    registry: &'a BlockRegistry,
    seed: u64,
}

impl<'a> GeneratorContext<'a> {
    pub fn new(chunk: &'a mut ChunkEntity, registry: &'a BlockRegistry, seed: u64) -> Self {
        Self {
            chunk,
            registry,
            seed,
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.chunk.size()
    }

    pub fn chunk_height(&self) -> u32 {
        self.chunk.height()
    }

    /// The world seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed derived from the world seed and this chunk's coordinates.
    pub fn chunk_seed(&self) -> u64 {
        seed::derive_chunk_seed(self.seed, self.chunk.coord())
    }

    /// A fresh RNG for this chunk. Each call restarts the same sequence.
    pub fn rng(&self) -> ChaCha8Rng {
        seed::chunk_rng(self.seed, self.chunk.coord())
    }

    pub fn coord(&self) -> ChunkCoord {
        self.chunk.coord()
    }

    /// World-space position of the chunk's `(0, 0, 0)` cell.
    pub fn world_position(&self) -> IVec3 {
        self.chunk.world_origin()
    }

    pub fn chunk(&self) -> &ChunkEntity {
        &*self.chunk
    }

    pub fn chunk_mut(&mut self) -> &mut ChunkEntity {
        &mut *self.chunk
    }

    pub fn registry(&self) -> &BlockRegistry {
        self.registry
    }

    /// The chunk and the registry at once, for passes that read one while writing the other.
    pub fn split_mut(&mut self) -> (&mut ChunkEntity, &BlockRegistry) {
        (&mut *self.chunk, self.registry)
    }

    /// Resolves an optional block; `None` when it is not registered.
    pub fn block_id(&self, name: &str) -> Option<BlockTypeId> {
        self.registry.get_block_id_by_name(name)
    }

    /// Resolves a block the step cannot run without.
    pub fn require_block(&self, name: &str) -> Result<BlockTypeId, StepError> {
        self.block_id(name)
            .ok_or_else(|| StepError::MissingBlock(name.to_string()))
    }

    pub fn get_block(&self, x: u32, y: u32, z: u32) -> BlockTypeId {
        self.chunk.get_block(x, y, z)
    }

    pub fn set_block(&mut self, x: u32, y: u32, z: u32, id: BlockTypeId) {
        self.chunk.set_block(x, y, z, id);
    }

    pub fn fill_layer(&mut self, y: u32, id: BlockTypeId) {
        self.chunk.fill_layer(y, id);
    }

    /// Fills a `w × h × d` box whose minimum corner is `(x0, y0, z0)`.
    #[allow(clippy::too_many_arguments)]
    pub fn fill_blocks(&mut self, x0: u32, y0: u32, z0: u32, w: u32, h: u32, d: u32, id: BlockTypeId) {
        self.chunk
            .fill_region(UVec3::new(x0, y0, z0), UVec3::new(w, h, d), id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loam_voxel::ChunkDims;

    fn registry() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry.register_block("stone", |b| b).unwrap();
        registry
    }

    #[test]
    fn test_context_exposes_dimensions_and_origin() {
        let registry = registry();
        let mut chunk = ChunkEntity::new(ChunkCoord::new(1, 0, -1), ChunkDims::new(8, 16));
        let ctx = GeneratorContext::new(&mut chunk, &registry, 7);
        assert_eq!(ctx.chunk_size(), 8);
        assert_eq!(ctx.chunk_height(), 16);
        assert_eq!(ctx.seed(), 7);
        assert_eq!(ctx.world_position(), IVec3::new(8, 0, -8));
    }

    #[test]
    fn test_block_lookup_tolerates_missing_names() {
        let registry = registry();
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), ChunkDims::new(8, 16));
        let ctx = GeneratorContext::new(&mut chunk, &registry, 0);
        assert_eq!(ctx.block_id("stone"), Some(BlockTypeId(1)));
        assert_eq!(ctx.block_id("rose"), None);
        assert!(matches!(
            ctx.require_block("rose"),
            Err(StepError::MissingBlock(_))
        ));
    }

    #[test]
    fn test_fill_blocks_writes_through() {
        let registry = registry();
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), ChunkDims::new(8, 16));
        let mut ctx = GeneratorContext::new(&mut chunk, &registry, 0);
        ctx.fill_blocks(1, 2, 3, 2, 2, 2, BlockTypeId(1));
        ctx.set_block(0, 0, 0, BlockTypeId(1));
        assert_eq!(ctx.get_block(2, 3, 4), BlockTypeId(1));
        assert_eq!(chunk.count_of(BlockTypeId(1)), 9);
    }

    #[test]
    fn test_chunk_seed_depends_on_coord() {
        let registry = registry();
        let mut a = ChunkEntity::new(ChunkCoord::new(0, 0, 0), ChunkDims::new(8, 16));
        let mut b = ChunkEntity::new(ChunkCoord::new(0, 0, 1), ChunkDims::new(8, 16));
        let seed_a = GeneratorContext::new(&mut a, &registry, 1).chunk_seed();
        let seed_b = GeneratorContext::new(&mut b, &registry, 1).chunk_seed();
        assert_ne!(seed_a, seed_b);
    }
}
