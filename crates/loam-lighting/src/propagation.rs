//! Breadth-first light propagation over a single chunk.
//!
//! Each cell holds one light value in `0..=MAX_LIGHT_LEVEL`. Sources are
//! sky-exposed columns and blocks carrying a light component; light spreads
//! to the six face neighbours with -1 decay per step and never enters opaque
//! blocks. The result is a pure function of the block grid, so relighting an
//! unchanged chunk reproduces the same values.

use std::collections::VecDeque;

use glam::UVec3;
use loam_voxel::{BlockRegistry, ChunkEntity, MAX_LIGHT_LEVEL};

/// The six axis-aligned neighbour offsets.
const NEIGHBORS_6: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Switches for [`relight_chunk`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightingOptions {
    /// Seed every open column top-down at full strength.
    pub sky_light: bool,
}

impl Default for LightingOptions {
    fn default() -> Self {
        Self { sky_light: true }
    }
}

/// A cell that starts the flood fill at `level`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightSource {
    pub position: UVec3,
    pub level: u8,
}

/// Summary of one relight pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightingStats {
    pub sources: usize,
    /// Cells that ended with a non-zero light value.
    pub lit_cells: usize,
}

fn is_opaque(chunk: &ChunkEntity, registry: &BlockRegistry, p: UVec3) -> bool {
    registry.is_opaque(chunk.get_block(p.x, p.y, p.z))
}

fn neighbors(chunk: &ChunkEntity, p: UVec3) -> impl Iterator<Item = UVec3> + '_ {
    let dims = chunk.dims();
    NEIGHBORS_6.into_iter().filter_map(move |(dx, dy, dz)| {
        let (nx, ny, nz) = (p.x as i32 + dx, p.y as i32 + dy, p.z as i32 + dz);
        dims.contains_signed(nx, ny, nz)
            .then(|| UVec3::new(nx as u32, ny as u32, nz as u32))
    })
}

/// Finds every light source in the chunk.
///
/// Sky sources: walking each column down from the top, every non-opaque cell
/// until the first opaque one, at [`MAX_LIGHT_LEVEL`]. Block sources: every
/// cell whose block type carries a light component, at
/// `min(MAX_LIGHT_LEVEL, radius)`. An emitting cell appears once, at the
/// brighter of the two levels.
pub fn collect_light_sources(
    chunk: &ChunkEntity,
    registry: &BlockRegistry,
    options: LightingOptions,
) -> Vec<LightSource> {
    collect_with_emitters(chunk, registry, options, &[])
}

fn collect_with_emitters(
    chunk: &ChunkEntity,
    registry: &BlockRegistry,
    options: LightingOptions,
    emitters: &[LightSource],
) -> Vec<LightSource> {
    let dims = chunk.dims();
    let mut levels = vec![0u8; dims.volume()];

    if options.sky_light {
        for z in 0..dims.size {
            for x in 0..dims.size {
                for y in (0..dims.height).rev() {
                    if registry.is_opaque(chunk.get_block(x, y, z)) {
                        break;
                    }
                    levels[dims.index(x, y, z)] = MAX_LIGHT_LEVEL;
                }
            }
        }
    }

    for (index, id) in chunk.blocks().iter().enumerate() {
        let Some(radius) = registry
            .get(*id)
            .and_then(|block| block.components.light())
            .map(|light| light.radius)
        else {
            continue;
        };
        let level = radius.min(MAX_LIGHT_LEVEL);
        levels[index] = levels[index].max(level);
    }

    for emitter in emitters {
        let p = emitter.position;
        if !dims.contains(p.x, p.y, p.z) {
            continue;
        }
        let index = dims.index(p.x, p.y, p.z);
        levels[index] = levels[index].max(emitter.level.min(MAX_LIGHT_LEVEL));
    }

    levels
        .into_iter()
        .enumerate()
        .filter(|(_, level)| *level > 0)
        .map(|(index, level)| LightSource {
            position: dims.position_of_index(index),
            level,
        })
        .collect()
}

/// Flood-fills light outward from `sources`, raising cells and never lowering them.
///
/// A neighbour is updated when it is not opaque and its stored value is
/// strictly below `level - 1`.
pub fn propagate_from_sources(
    chunk: &mut ChunkEntity,
    registry: &BlockRegistry,
    sources: &[LightSource],
) {
    let mut queue = VecDeque::with_capacity(sources.len());

    for source in sources {
        let p = source.position;
        let level = source.level.min(MAX_LIGHT_LEVEL);
        if chunk.get_light(p.x, p.y, p.z) < level {
            chunk.set_light(p.x, p.y, p.z, level);
        }
        queue.push_back(p);
    }

    while let Some(p) = queue.pop_front() {
        let current = chunk.get_light(p.x, p.y, p.z);
        if current <= 1 {
            continue;
        }
        let next_level = current - 1;

        let targets: Vec<UVec3> = neighbors(chunk, p).collect();
        for n in targets {
            if is_opaque(chunk, registry, n) {
                continue;
            }
            if chunk.get_light(n.x, n.y, n.z) >= next_level {
                continue;
            }
            chunk.set_light(n.x, n.y, n.z, next_level);
            queue.push_back(n);
        }
    }
}

/// Recomputes the chunk's light grid from scratch.
///
/// Clears every value to 0, collects sources, and floods. Safe to call at any
/// time; an unchanged chunk always relights to the same values.
pub fn relight_chunk(
    chunk: &mut ChunkEntity,
    registry: &BlockRegistry,
    options: LightingOptions,
) -> LightingStats {
    relight_chunk_with_emitters(chunk, registry, options, &[])
}

/// [`relight_chunk`] with extra emitters that the block catalogue does not
/// know about, such as placed blocks whose runtime components carry light.
///
/// Emitter positions are chunk-local; ones outside the grid are ignored. A
/// cell named by both an emitter and its block type lights at the brighter
/// level.
pub fn relight_chunk_with_emitters(
    chunk: &mut ChunkEntity,
    registry: &BlockRegistry,
    options: LightingOptions,
    emitters: &[LightSource],
) -> LightingStats {
    chunk.clear_light();
    let sources = collect_with_emitters(chunk, registry, options, emitters);
    propagate_from_sources(chunk, registry, &sources);

    let stats = LightingStats {
        sources: sources.len(),
        lit_cells: chunk.light().iter().filter(|&&l| l > 0).count(),
    };
    tracing::trace!(
        chunk = %chunk.coord(),
        sources = stats.sources,
        lit = stats.lit_cells,
        "relit chunk"
    );
    stats
}

/// Removes the light that spread from the source at `position`, then
/// re-floods from the surviving light at the edge of the cleared region.
///
/// Call after the emitting block has been replaced. Sky exposure changes are
/// not tracked here; use [`relight_chunk`] when opacity changed.
pub fn remove_light_source(chunk: &mut ChunkEntity, registry: &BlockRegistry, position: UVec3) {
    let old_level = chunk.get_light(position.x, position.y, position.z);
    if old_level == 0 {
        return;
    }

    let mut remove_queue: VecDeque<(UVec3, u8)> = VecDeque::new();
    let mut edge: Vec<UVec3> = Vec::new();

    chunk.set_light(position.x, position.y, position.z, 0);
    remove_queue.push_back((position, old_level));

    while let Some((p, level)) = remove_queue.pop_front() {
        let targets: Vec<UVec3> = neighbors(chunk, p).collect();
        for n in targets {
            let neighbor_level = chunk.get_light(n.x, n.y, n.z);
            if neighbor_level == 0 {
                continue;
            }
            if neighbor_level < level {
                chunk.set_light(n.x, n.y, n.z, 0);
                remove_queue.push_back((n, neighbor_level));
            } else {
                edge.push(n);
            }
        }
    }

    // An edge cell may have been cleared by a brighter removal path after it was queued.
    let relight: Vec<LightSource> = edge
        .into_iter()
        .map(|p| LightSource {
            position: p,
            level: chunk.get_light(p.x, p.y, p.z),
        })
        .filter(|source| source.level > 0)
        .collect();
    if !relight.is_empty() {
        propagate_from_sources(chunk, registry, &relight);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
