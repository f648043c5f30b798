//! Guard synchronization collectives
//!
//! The operations here walk a layout's cached fill schedule and move data
//! between per-patch storage blocks:
//!
//! - [`fill_guards`]: replicate each dirty source's owned values into the
//!   matching guard cells. Idempotent: a second call with no intervening
//!   writes copies nothing.
//! - [`set_guards`]: stamp every guard cell with one value, ignoring the
//!   schedule's pairing (seeds accumulation).
//! - [`accumulate_from_guards`]: add guard contents back into the owner's
//!   owned cells (scatter/deposit reductions).
//!
//! All three are collective and blocking with respect to the layout: local
//! copies complete before they return. Requests that cross contexts are
//! delegated to a [`GuardTransport`]; the layer defines what to move and
//! where to place it, never how bytes travel. [`LocalOnly`] is the default
//! transport and treats any remote request as a fatal configuration error.

use crate::arena::BufferArena;
use crate::block::{PatchBlock, Storage};
use crate::error::{EngineError, Result};
use std::ops::AddAssign;
use tessera_layout::{FillRequest, Layout, PatchId};

/// The per-patch storage blocks of one container, indexed by patch id.
///
/// Patches owned by other contexts simply have no entry.
#[derive(Debug)]
pub struct BlockSet<T> {
    blocks: Vec<Option<PatchBlock<T>>>,
}

impl<T: bytemuck::Pod + PartialEq> BlockSet<T> {
    /// An empty set sized for `patches` patches.
    pub fn with_patches(patches: usize) -> Self {
        Self {
            blocks: (0..patches).map(|_| None).collect(),
        }
    }

    /// Install the block for `patch`, returning any previous one.
    pub fn insert(&mut self, patch: PatchId, block: PatchBlock<T>) -> Option<PatchBlock<T>> {
        self.blocks[patch.index()].replace(block)
    }

    /// The block for `patch`, when local.
    pub fn get(&self, patch: PatchId) -> Option<&PatchBlock<T>> {
        self.blocks.get(patch.index()).and_then(|b| b.as_ref())
    }

    /// Mutable access to the block for `patch`.
    pub fn get_mut(&mut self, patch: PatchId) -> Option<&mut PatchBlock<T>> {
        self.blocks.get_mut(patch.index()).and_then(|b| b.as_mut())
    }

    /// True when `patch` has a local block.
    pub fn contains(&self, patch: PatchId) -> bool {
        self.get(patch).is_some()
    }

    /// The block for `patch`, or [`EngineError::MissingBlock`].
    pub fn require(&self, patch: PatchId) -> Result<&PatchBlock<T>> {
        self.get(patch).ok_or(EngineError::MissingBlock { patch })
    }

    /// Iterate over the local blocks in patch order.
    pub fn iter(&self) -> impl Iterator<Item = (PatchId, &PatchBlock<T>)> {
        self.blocks
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|block| (PatchId::new(i as u32), block)))
    }
}

/// Delivery of guard data between contexts.
///
/// The schedule names what to move; implementors move it. `send` ships the
/// source-side values of a request whose destination is remote, in
/// row-major order of `request.region`; `receive` produces the values for a
/// request whose source is remote, in the same order.
pub trait GuardTransport<T> {
    fn send(&mut self, request: &FillRequest, values: &[T]) -> Result<()>;
    fn receive(&mut self, request: &FillRequest) -> Result<Vec<T>>;
}

/// The default transport for single-context and replicated layouts: any
/// cross-context request is a configuration error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnly;

impl<T> GuardTransport<T> for LocalOnly {
    fn send(&mut self, request: &FillRequest, _values: &[T]) -> Result<()> {
        Err(remote_fill(request))
    }

    fn receive(&mut self, request: &FillRequest) -> Result<Vec<T>> {
        Err(remote_fill(request))
    }
}

fn remote_fill(request: &FillRequest) -> EngineError {
    EngineError::RemoteFill {
        from_patch: request.source,
        destination: request.destination,
    }
}

/// Replicate owned data into guard cells along the fill schedule.
///
/// Only dirty sources copy; after a source's requests are all processed its
/// dirty flag clears, which makes the operation idempotent. Guard writes do
/// not mark destinations dirty: replicating a neighbor's data is not a
/// change to owned data.
pub fn fill_guards<T: bytemuck::Pod + PartialEq>(
    layout: &Layout,
    arena: &mut BufferArena<T>,
    blocks: &BlockSet<T>,
    transport: &mut dyn GuardTransport<T>,
) -> Result<()> {
    let schedule = layout.fill_schedule();
    let mut clean_sources: Vec<PatchId> = Vec::new();

    for request in schedule.iter() {
        let source_local = blocks.contains(request.source);
        let dest_local = blocks.contains(request.destination);

        if source_local {
            let source = blocks.require(request.source)?;
            if !arena.is_dirty(source.identity())? {
                continue;
            }
            if dest_local {
                let destination = blocks.require(request.destination)?;
                copy_region(arena, source, destination, request)?;
            } else {
                let values = gather(arena, source, request)?;
                transport.send(request, &values)?;
            }
            clean_sources.push(request.source);
        } else if dest_local {
            let values = transport.receive(request)?;
            let destination = blocks.require(request.destination)?;
            scatter(arena, destination, request, &values)?;
        }
    }

    for source in clean_sources {
        let block = blocks.require(source)?;
        arena.clear_dirty(block.identity())?;
    }

    tracing::trace!(requests = schedule.len(), "fill_guards complete");
    Ok(())
}

/// Stamp every local patch's guard cells with `value`, ignoring the
/// schedule's source/destination pairing.
pub fn set_guards<T: bytemuck::Pod + PartialEq>(
    layout: &Layout,
    arena: &mut BufferArena<T>,
    blocks: &BlockSet<T>,
    value: T,
) -> Result<()> {
    for (patch, block) in blocks.iter() {
        for face in layout.guard_regions(patch) {
            for point in face.iter_points() {
                block.write_untracked(arena, &point, value)?;
            }
        }
    }
    Ok(())
}

/// Add guard contents into the owners' owned cells along the schedule.
///
/// The reverse of [`fill_guards`]: each request's destination guard region
/// is read and accumulated into the source's owned region. Owned data
/// changes, so sources are marked dirty through the regular write path.
pub fn accumulate_from_guards<T: bytemuck::Pod + PartialEq + AddAssign>(
    layout: &Layout,
    arena: &mut BufferArena<T>,
    blocks: &BlockSet<T>,
    transport: &mut dyn GuardTransport<T>,
) -> Result<()> {
    let schedule = layout.fill_schedule();

    for request in schedule.iter() {
        let source_local = blocks.contains(request.source);
        let dest_local = blocks.contains(request.destination);

        let values = if dest_local {
            let destination = blocks.require(request.destination)?;
            let guard = gather_guard(arena, destination, request)?;
            if !source_local {
                transport.send(request, &guard)?;
                continue;
            }
            guard
        } else if source_local {
            transport.receive(request)?
        } else {
            continue;
        };

        let source = blocks.require(request.source)?;
        for (point, guard_value) in request.region.iter_points().zip(values) {
            let mut owned = source.read(arena, &point)?;
            owned += guard_value;
            source.write(arena, &point, owned)?;
        }
    }

    tracing::trace!(requests = schedule.len(), "accumulate_from_guards complete");
    Ok(())
}

/// Copy one request's values from the source's owned cells into the
/// destination's guard cells.
fn copy_region<T: bytemuck::Pod + PartialEq>(
    arena: &mut BufferArena<T>,
    source: &PatchBlock<T>,
    destination: &PatchBlock<T>,
    request: &FillRequest,
) -> Result<()> {
    for point in request.region.iter_points() {
        let value = source.read(arena, &point)?;
        let dest_point: Vec<i64> = point
            .iter()
            .zip(&request.offset)
            .map(|(p, o)| p + o)
            .collect();
        destination.write_untracked(arena, &dest_point, value)?;
    }
    Ok(())
}

/// Source-side values of a request, in region row-major order.
fn gather<T: bytemuck::Pod + PartialEq>(
    arena: &BufferArena<T>,
    source: &PatchBlock<T>,
    request: &FillRequest,
) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(request.region.size());
    for point in request.region.iter_points() {
        values.push(source.read(arena, &point)?);
    }
    Ok(values)
}

/// Destination-side guard values of a request, in region row-major order.
fn gather_guard<T: bytemuck::Pod + PartialEq>(
    arena: &BufferArena<T>,
    destination: &PatchBlock<T>,
    request: &FillRequest,
) -> Result<Vec<T>> {
    let guard_region = request.destination_region();
    let mut values = Vec::with_capacity(guard_region.size());
    for point in guard_region.iter_points() {
        values.push(destination.read(arena, &point)?);
    }
    Ok(values)
}

/// Place received values into the destination's guard cells.
fn scatter<T: bytemuck::Pod + PartialEq>(
    arena: &mut BufferArena<T>,
    destination: &PatchBlock<T>,
    request: &FillRequest,
    values: &[T],
) -> Result<()> {
    for (point, value) in request.destination_region().iter_points().zip(values) {
        destination.write_untracked(arena, &point, *value)?;
    }
    Ok(())
}

// ================================================================================================
// Tests
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_domain::Domain;
    use tessera_layout::{ContextPolicy, GuardLayers, PartitionPolicy};

    fn two_patch_setup() -> (Layout, BufferArena<f64>, BlockSet<f64>) {
        let layout = Layout::new(
            Domain::line(0, 7),
            PartitionPolicy::UniformBlocks { blocks: vec![2] },
            GuardLayers::uniform(1, 1, 0),
            &ContextPolicy::Replicated,
            1,
        )
        .unwrap();
        let mut arena = BufferArena::new();
        let mut blocks = BlockSet::with_patches(layout.patches());
        for node in layout.nodes() {
            let block = PatchBlock::new_dense(&mut arena, node.allocated().clone());
            blocks.insert(node.id(), block);
        }
        (layout, arena, blocks)
    }

    #[test]
    fn test_fill_guards_copies_owned_values() {
        let (layout, mut arena, blocks) = two_patch_setup();

        // Patch 0 owns [0:3], patch 1 owns [4:7]; write i*10 everywhere.
        for node in layout.nodes() {
            let block = blocks.require(node.id()).unwrap();
            node.owned().for_each_point(|p| {
                block.write(&mut arena, p, p[0] as f64 * 10.0).unwrap();
            });
        }

        fill_guards(&layout, &mut arena, &blocks, &mut LocalOnly).unwrap();

        // Patch 0's guard cell 4 holds patch 1's value, and vice versa.
        let left = blocks.require(PatchId::new(0)).unwrap();
        assert_eq!(left.read(&arena, &[4]).unwrap(), 40.0);
        let right = blocks.require(PatchId::new(1)).unwrap();
        assert_eq!(right.read(&arena, &[3]).unwrap(), 30.0);
    }

    #[test]
    fn test_fill_guards_idempotent() {
        let (layout, mut arena, blocks) = two_patch_setup();
        let left = blocks.require(PatchId::new(0)).unwrap();
        left.write(&mut arena, &[3], 5.0).unwrap();

        fill_guards(&layout, &mut arena, &blocks, &mut LocalOnly).unwrap();
        let right = blocks.require(PatchId::new(1)).unwrap();
        assert_eq!(right.read(&arena, &[3]).unwrap(), 5.0);
        assert!(!left.is_dirty(&arena).unwrap());

        // Sabotage the guard cell, then refill without touching owned data:
        // nothing is dirty, so nothing copies.
        right.write_untracked(&mut arena, &[3], -1.0).unwrap();
        fill_guards(&layout, &mut arena, &blocks, &mut LocalOnly).unwrap();
        assert_eq!(right.read(&arena, &[3]).unwrap(), -1.0);

        // A new owned write re-arms the copy.
        left.write(&mut arena, &[3], 6.0).unwrap();
        fill_guards(&layout, &mut arena, &blocks, &mut LocalOnly).unwrap();
        assert_eq!(right.read(&arena, &[3]).unwrap(), 6.0);
    }

    #[test]
    fn test_set_guards_stamps_every_guard_cell() {
        let (layout, mut arena, blocks) = two_patch_setup();
        set_guards(&layout, &mut arena, &blocks, 9.0).unwrap();

        let left = blocks.require(PatchId::new(0)).unwrap();
        assert_eq!(left.read(&arena, &[4]).unwrap(), 9.0);
        let right = blocks.require(PatchId::new(1)).unwrap();
        assert_eq!(right.read(&arena, &[3]).unwrap(), 9.0);
        // Owned cells untouched and nothing marked dirty.
        assert_eq!(left.read(&arena, &[0]).unwrap(), 0.0);
        assert!(!left.is_dirty(&arena).unwrap());
    }

    #[test]
    fn test_accumulate_adds_guard_into_owner() {
        let (layout, mut arena, blocks) = two_patch_setup();

        // Owners hold 100; each guard cell contributes 7.
        for (_, block) in blocks.iter() {
            block.fill(&mut arena, 0.0).unwrap();
        }
        let left = blocks.require(PatchId::new(0)).unwrap();
        let right = blocks.require(PatchId::new(1)).unwrap();
        left.write(&mut arena, &[3], 100.0).unwrap();
        right.write(&mut arena, &[4], 100.0).unwrap();
        set_guards(&layout, &mut arena, &blocks, 7.0).unwrap();

        accumulate_from_guards(&layout, &mut arena, &blocks, &mut LocalOnly).unwrap();

        // Patch 1's guard cell 3 deposited into patch 0's owned cell 3, and
        // patch 0's guard cell 4 into patch 1's owned cell 4.
        assert_eq!(left.read(&arena, &[3]).unwrap(), 107.0);
        assert_eq!(right.read(&arena, &[4]).unwrap(), 107.0);
        // Accumulation changes owned data: sources are dirty again.
        assert!(left.is_dirty(&arena).unwrap());
    }

    #[test]
    fn test_missing_remote_transport_is_fatal() {
        // Distributed layout, but only context 0's block is present.
        let layout = Layout::new(
            Domain::line(0, 7),
            PartitionPolicy::UniformBlocks { blocks: vec![2] },
            GuardLayers::uniform(1, 1, 0),
            &ContextPolicy::DistributedUniform,
            2,
        )
        .unwrap();
        let mut arena: BufferArena<f64> = BufferArena::new();
        let mut blocks = BlockSet::with_patches(layout.patches());
        let node = layout.node(PatchId::new(0));
        let block = PatchBlock::new_dense(&mut arena, node.allocated().clone());
        blocks.insert(node.id(), block);
        blocks
            .require(PatchId::new(0))
            .unwrap()
            .write(&mut arena, &[3], 1.0)
            .unwrap();

        let err = fill_guards(&layout, &mut arena, &blocks, &mut LocalOnly).unwrap_err();
        assert!(matches!(err, EngineError::RemoteFill { .. }));
    }

    #[test]
    fn test_fill_skips_foreign_traffic() {
        // No local blocks at all: every request is somebody else's.
        let layout = Layout::new(
            Domain::line(0, 7),
            PartitionPolicy::UniformBlocks { blocks: vec![2] },
            GuardLayers::uniform(1, 1, 0),
            &ContextPolicy::DistributedUniform,
            2,
        )
        .unwrap();
        let mut arena: BufferArena<f64> = BufferArena::new();
        let blocks = BlockSet::with_patches(layout.patches());
        fill_guards(&layout, &mut arena, &blocks, &mut LocalOnly).unwrap();
    }
}
