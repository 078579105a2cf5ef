use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::IVec3;
use loam_voxel::{BlockTypeId, ChunkCoord, ChunkDims, ComponentBag};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique id of a tracked block instance. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One placed actionable block and its runtime component state.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockInstance {
    pub id: InstanceId,
    /// World-space block position.
    pub position: IVec3,
    /// Chunk that contains `position`.
    pub chunk: ChunkCoord,
    /// Index of the block within its chunk's grid.
    pub local_index: usize,
    pub block_type: BlockTypeId,
    pub components: ComponentBag,
}

impl BlockInstance {
    pub(crate) fn new(
        dims: ChunkDims,
        position: IVec3,
        block_type: BlockTypeId,
        components: ComponentBag,
    ) -> Self {
        let local = dims.local_of(position);
        Self {
            id: InstanceId::next(),
            position,
            chunk: dims.chunk_of(position),
            local_index: dims.index(local.x, local.y, local.z),
            block_type,
            components,
        }
    }
}
