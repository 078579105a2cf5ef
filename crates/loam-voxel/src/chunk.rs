//! Dense chunk storage: block ids plus a parallel light grid.
//!
//! A chunk is `size × height × size` cells. Cells are laid out layer by layer
//! (`y` slowest, then `z`, then `x`) so that filling a horizontal layer touches
//! one contiguous run. Coordinates outside the chunk are a caller bug and panic.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use glam::{IVec3, UVec3};

use crate::registry::BlockTypeId;

/// Highest light value a cell can hold.
pub const MAX_LIGHT_LEVEL: u8 = 13;

/// Horizontal size and vertical height of every chunk in a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChunkDims {
    pub size: u32,
    pub height: u32,
}

impl ChunkDims {
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(size: u32, height: u32) -> Self {
        assert!(size > 0 && height > 0, "chunk dimensions must be non-zero");
        Self { size, height }
    }

    /// Number of cells in one chunk.
    pub fn volume(self) -> usize {
        self.size as usize * self.size as usize * self.height as usize
    }

    /// Number of cells in one horizontal layer.
    pub fn layer_area(self) -> usize {
        self.size as usize * self.size as usize
    }

    pub fn contains(self, x: u32, y: u32, z: u32) -> bool {
        x < self.size && y < self.height && z < self.size
    }

    /// Signed variant of [`contains`](Self::contains) for neighbour walks.
    pub fn contains_signed(self, x: i32, y: i32, z: i32) -> bool {
        x >= 0 && y >= 0 && z >= 0 && self.contains(x as u32, y as u32, z as u32)
    }

    /// Linear cell index of a local position.
    ///
    /// # Panics
    ///
    /// Panics if the position is outside the chunk.
    pub fn index(self, x: u32, y: u32, z: u32) -> usize {
        assert!(
            self.contains(x, y, z),
            "local position ({x}, {y}, {z}) outside chunk {}x{}x{}",
            self.size,
            self.height,
            self.size
        );
        (y as usize * self.size as usize + z as usize) * self.size as usize + x as usize
    }

    /// Inverse of [`index`](Self::index).
    pub fn position_of_index(self, index: usize) -> UVec3 {
        let size = self.size as usize;
        let x = index % size;
        let z = (index / size) % size;
        let y = index / self.layer_area();
        UVec3::new(x as u32, y as u32, z as u32)
    }

    /// Extent of a chunk along each axis as a signed vector.
    pub fn extent(self) -> IVec3 {
        IVec3::new(self.size as i32, self.height as i32, self.size as i32)
    }

    /// Chunk coordinates containing a world-space block position.
    ///
    /// Uses floor division, so `-1` belongs to chunk `-1`, not chunk `0`.
    pub fn chunk_of(self, world: IVec3) -> ChunkCoord {
        let cell = world.div_euclid(self.extent());
        ChunkCoord::new(cell.x, cell.y, cell.z)
    }

    /// Position of a world-space block inside its chunk.
    pub fn local_of(self, world: IVec3) -> UVec3 {
        world.rem_euclid(self.extent()).as_uvec3()
    }
}

/// Position of a chunk in chunk-space (world position ÷ chunk dimensions).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk offset by `(dx, dy, dz)` chunks.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// World-space position of this chunk's `(0, 0, 0)` cell.
    pub fn world_origin(self, dims: ChunkDims) -> IVec3 {
        IVec3::new(self.x, self.y, self.z) * dims.extent()
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One chunk's block ids and light values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkEntity {
    coord: ChunkCoord,
    dims: ChunkDims,
    blocks: Vec<BlockTypeId>,
    light: Vec<u8>,
}

impl ChunkEntity {
    /// Creates an all-Air, unlit chunk.
    pub fn new(coord: ChunkCoord, dims: ChunkDims) -> Self {
        Self {
            coord,
            dims,
            blocks: vec![BlockTypeId::AIR; dims.volume()],
            light: vec![0; dims.volume()],
        }
    }

    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    pub fn dims(&self) -> ChunkDims {
        self.dims
    }

    pub fn size(&self) -> u32 {
        self.dims.size
    }

    pub fn height(&self) -> u32 {
        self.dims.height
    }

    /// World-space position of the chunk's `(0, 0, 0)` cell.
    pub fn world_origin(&self) -> IVec3 {
        self.coord.world_origin(self.dims)
    }

    pub fn local_index(&self, x: u32, y: u32, z: u32) -> usize {
        self.dims.index(x, y, z)
    }

    pub fn get_block(&self, x: u32, y: u32, z: u32) -> BlockTypeId {
        self.blocks[self.dims.index(x, y, z)]
    }

    pub fn set_block(&mut self, x: u32, y: u32, z: u32, id: BlockTypeId) {
        let index = self.dims.index(x, y, z);
        self.blocks[index] = id;
    }

    pub fn get_light(&self, x: u32, y: u32, z: u32) -> u8 {
        self.light[self.dims.index(x, y, z)]
    }

    /// Stores a light value, clamped to [`MAX_LIGHT_LEVEL`].
    pub fn set_light(&mut self, x: u32, y: u32, z: u32, level: u8) {
        let index = self.dims.index(x, y, z);
        self.light[index] = level.min(MAX_LIGHT_LEVEL);
    }

    /// Fills horizontal layer `y` with `id`.
    pub fn fill_layer(&mut self, y: u32, id: BlockTypeId) {
        let start = self.dims.index(0, y, 0);
        let end = start + self.dims.layer_area();
        self.blocks[start..end].fill(id);
    }

    /// Fills the box starting at `origin` with extent `extent` (width, height, depth).
    ///
    /// # Panics
    ///
    /// Panics if any part of the box lies outside the chunk.
    pub fn fill_region(&mut self, origin: UVec3, extent: UVec3, id: BlockTypeId) {
        if extent.x == 0 || extent.y == 0 || extent.z == 0 {
            return;
        }
        let last = origin + extent - UVec3::ONE;
        assert!(
            self.dims.contains(last.x, last.y, last.z),
            "region {origin}+{extent} exceeds chunk bounds"
        );
        for y in origin.y..=last.y {
            for z in origin.z..=last.z {
                let row = self.dims.index(origin.x, y, z);
                self.blocks[row..row + extent.x as usize].fill(id);
            }
        }
    }

    /// Resets every light value to 0.
    pub fn clear_light(&mut self) {
        self.light.fill(0);
    }

    pub fn blocks(&self) -> &[BlockTypeId] {
        &self.blocks
    }

    pub fn light(&self) -> &[u8] {
        &self.light
    }

    /// Mutable block and light slices together, for solvers that read one and write the other.
    pub fn grids_mut(&mut self) -> (&[BlockTypeId], &mut [u8]) {
        (&self.blocks, &mut self.light)
    }

    /// Number of cells holding `id`.
    pub fn count_of(&self, id: BlockTypeId) -> usize {
        self.blocks.iter().filter(|&&b| b == id).count()
    }

    /// Hash of the block and light grids; equal content gives equal hashes.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.blocks.hash(&mut hasher);
        self.light.hash(&mut hasher);
        hasher.finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> ChunkDims {
        ChunkDims::new(16, 32)
    }

    #[test]
    fn test_new_chunk_is_air_and_dark() {
        let chunk = ChunkEntity::new(ChunkCoord::default(), dims());
        assert_eq!(chunk.blocks().len(), 16 * 16 * 32);
        assert_eq!(chunk.count_of(BlockTypeId::AIR), 16 * 16 * 32);
        assert!(chunk.light().iter().all(|&l| l == 0));
    }

    #[test]
    fn test_set_get_block() {
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), dims());
        chunk.set_block(15, 31, 15, BlockTypeId(4));
        assert_eq!(chunk.get_block(15, 31, 15), BlockTypeId(4));
        assert_eq!(chunk.get_block(0, 0, 0), BlockTypeId::AIR);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_get_panics() {
        let chunk = ChunkEntity::new(ChunkCoord::default(), dims());
        chunk.get_block(16, 0, 0);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_height_panics() {
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), dims());
        chunk.set_block(0, 32, 0, BlockTypeId(1));
    }

    #[test]
    fn test_index_roundtrip() {
        let d = dims();
        for &(x, y, z) in &[(0, 0, 0), (15, 0, 0), (0, 31, 0), (3, 7, 11), (15, 31, 15)] {
            let index = d.index(x, y, z);
            assert_eq!(d.position_of_index(index), UVec3::new(x, y, z));
        }
    }

    #[test]
    fn test_fill_layer_touches_only_that_layer() {
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), dims());
        chunk.fill_layer(5, BlockTypeId(2));
        assert_eq!(chunk.count_of(BlockTypeId(2)), 256);
        assert_eq!(chunk.get_block(7, 5, 9), BlockTypeId(2));
        assert_eq!(chunk.get_block(7, 4, 9), BlockTypeId::AIR);
        assert_eq!(chunk.get_block(7, 6, 9), BlockTypeId::AIR);
    }

    #[test]
    fn test_fill_region() {
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), dims());
        chunk.fill_region(UVec3::new(2, 3, 4), UVec3::new(3, 2, 1), BlockTypeId(9));
        assert_eq!(chunk.count_of(BlockTypeId(9)), 6);
        assert_eq!(chunk.get_block(4, 4, 4), BlockTypeId(9));
        assert_eq!(chunk.get_block(5, 4, 4), BlockTypeId::AIR);
    }

    #[test]
    #[should_panic]
    fn test_fill_region_out_of_bounds_panics() {
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), dims());
        chunk.fill_region(UVec3::new(14, 0, 0), UVec3::new(3, 1, 1), BlockTypeId(1));
    }

    #[test]
    fn test_light_is_clamped() {
        let mut chunk = ChunkEntity::new(ChunkCoord::default(), dims());
        chunk.set_light(1, 1, 1, 200);
        assert_eq!(chunk.get_light(1, 1, 1), MAX_LIGHT_LEVEL);
    }

    #[test]
    fn test_world_to_chunk_floor_semantics() {
        let d = dims();
        assert_eq!(d.chunk_of(IVec3::new(0, 0, 0)), ChunkCoord::new(0, 0, 0));
        assert_eq!(d.chunk_of(IVec3::new(15, 31, 15)), ChunkCoord::new(0, 0, 0));
        assert_eq!(d.chunk_of(IVec3::new(16, 32, 16)), ChunkCoord::new(1, 1, 1));
        assert_eq!(d.chunk_of(IVec3::new(-1, -1, -1)), ChunkCoord::new(-1, -1, -1));
        assert_eq!(d.chunk_of(IVec3::new(-16, -33, -17)), ChunkCoord::new(-1, -2, -2));
        assert_eq!(d.local_of(IVec3::new(-1, -1, -1)), UVec3::new(15, 31, 15));
    }

    #[test]
    fn test_world_origin() {
        let coord = ChunkCoord::new(-2, 1, 3);
        assert_eq!(coord.world_origin(dims()), IVec3::new(-32, 32, 48));
        let chunk = ChunkEntity::new(coord, dims());
        assert_eq!(chunk.world_origin(), IVec3::new(-32, 32, 48));
    }

    #[test]
    fn test_content_hash_tracks_content() {
        let mut a = ChunkEntity::new(ChunkCoord::default(), dims());
        let b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());
        a.set_block(1, 2, 3, BlockTypeId(1));
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
