//! Layout-owning patch arrays
//!
//! [`PatchArray`] is the composition point of the crate: one shared
//! [`Layout`], one [`BufferArena`], and one storage block per patch. It is
//! the container the evaluator drives with `touches()` iteration and the
//! surface through which the guard collectives are reached.
//!
//! The container holds a block for every patch of the layout, which is the
//! single-context / replicated execution shape; distributed containers
//! build their own [`BlockSet`] over `layout.local_patches()` and drive the
//! collectives in [`crate::fill`] directly with a real transport.

use crate::arena::BufferArena;
use crate::block::{BlockKind, PatchBlock, Storage};
use crate::error::{EngineError, Result};
use crate::fill::{accumulate_from_guards, fill_guards, set_guards, BlockSet, LocalOnly};
use bytemuck::Zeroable;
use num_traits::Zero;
use std::ops::AddAssign;
use std::sync::Arc;
use tessera_layout::{CompactionMethod, Layout, PatchId};

/// A distributed array: a layout plus one storage block per patch.
pub struct PatchArray<T> {
    layout: Arc<Layout>,
    arena: BufferArena<T>,
    blocks: BlockSet<T>,
    kind: BlockKind,
}

impl<T: bytemuck::Pod + PartialEq> PatchArray<T> {
    /// A dense array over `layout`, zero-initialized.
    pub fn new_dense(layout: Arc<Layout>) -> Self {
        Self::build(layout, BlockKind::Dense, T::zeroed())
    }

    /// A compressible array over `layout`: every patch starts collapsed to
    /// `initial`.
    pub fn new_compressible(layout: Arc<Layout>, initial: T) -> Self {
        Self::build(layout, BlockKind::Compressible, initial)
    }

    fn build(layout: Arc<Layout>, kind: BlockKind, initial: T) -> Self {
        let mut arena = BufferArena::new();
        let mut blocks = BlockSet::with_patches(layout.patches());
        for node in layout.nodes() {
            let domain = node.allocated().clone();
            let block = match kind {
                BlockKind::Dense => PatchBlock::new_dense(&mut arena, domain),
                BlockKind::Compressible => PatchBlock::new_compressible(&mut arena, domain, initial),
            };
            blocks.insert(node.id(), block);
        }
        Self {
            layout,
            arena,
            blocks,
            kind,
        }
    }

    /// The shared layout.
    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    /// Storage kind of every patch block.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// The arena backing this array's blocks.
    pub fn arena(&self) -> &BufferArena<T> {
        &self.arena
    }

    /// Mutable access to the arena, for direct block manipulation.
    pub fn arena_mut(&mut self) -> &mut BufferArena<T> {
        &mut self.arena
    }

    /// The block storing `patch`.
    pub fn block(&self, patch: PatchId) -> Result<&PatchBlock<T>> {
        self.blocks.require(patch)
    }

    /// A new alias of `patch`'s block (shared buffer, same identity).
    ///
    /// Release it through [`PatchBlock::release`] when done.
    pub fn alias_block(&mut self, patch: PatchId) -> Result<PatchBlock<T>> {
        let block = self.blocks.require(patch)?;
        block.alias(&mut self.arena)
    }

    /// A random-access view over `region` of `patch`'s block. Compressed
    /// patches expand immediately; releasing the view may recompress.
    pub fn view_block(
        &mut self,
        patch: PatchId,
        region: &tessera_domain::Domain,
    ) -> Result<crate::block::BlockView<T>> {
        let block = self.blocks.require(patch)?;
        block.view(&mut self.arena, region)
    }

    /// Overwrite every patch with one value. Compressible patches collapse.
    pub fn fill(&mut self, value: T) -> Result<()> {
        for (_, block) in self.blocks.iter() {
            block.fill(&mut self.arena, value)?;
        }
        Ok(())
    }

    /// Assign `f(point)` to every owned point.
    pub fn assign<F: FnMut(&[i64]) -> T>(&mut self, mut f: F) -> Result<()> {
        for node in self.layout.nodes() {
            let block = self.blocks.require(node.id())?;
            for point in node.owned().iter_points() {
                block.write(&mut self.arena, &point, f(&point))?;
            }
        }
        Ok(())
    }

    /// Read one element by global index point.
    ///
    /// # Panics
    ///
    /// Panics when `point` lies outside the global domain, as
    /// [`Layout::global_id`] does.
    pub fn get(&self, point: &[i64]) -> Result<T> {
        let patch = self.layout.global_id(point);
        self.blocks.require(patch)?.read(&self.arena, point)
    }

    /// Write one element by global index point.
    ///
    /// # Panics
    ///
    /// As [`PatchArray::get`].
    pub fn set(&mut self, point: &[i64], value: T) -> Result<()> {
        let patch = self.layout.global_id(point);
        self.blocks
            .require(patch)?
            .write(&mut self.arena, point, value)
    }

    /// Replicate owned data into guard cells (see [`crate::fill::fill_guards`]).
    pub fn fill_guards(&mut self) -> Result<()> {
        fill_guards(&self.layout, &mut self.arena, &self.blocks, &mut LocalOnly)
    }

    /// Stamp every guard cell with `value`.
    pub fn set_guards(&mut self, value: T) -> Result<()> {
        set_guards(&self.layout, &mut self.arena, &self.blocks, value)
    }

    /// Sum over every owned point. Guard cells never contribute, so
    /// replicated data is not double-counted.
    pub fn sum(&self) -> Result<T>
    where
        T: Zero,
    {
        let mut total = T::zero();
        for node in self.layout.nodes() {
            let block = self.blocks.require(node.id())?;
            for point in node.owned().iter_points() {
                total = total + block.read(&self.arena, &point)?;
            }
        }
        Ok(total)
    }

    /// Grow `patch` by `count` elements valued `value`.
    ///
    /// Requires a dynamic, guardless layout owned exclusively by this
    /// array.
    pub fn create_elements(&mut self, patch: PatchId, count: usize, value: T) -> Result<()> {
        self.require_guardless()?;
        let layout = Arc::get_mut(&mut self.layout).ok_or(EngineError::SharedLayout)?;
        layout.create_elements(patch, count)?;
        let handle = self.blocks.require(patch)?.identity();
        self.arena.extend_with(handle, count, value)?;
        self.rebind_domains();
        Ok(())
    }

    /// Destroy the points of `region` inside `patch` and compact its
    /// storage with `method`.
    pub fn destroy_elements(
        &mut self,
        patch: PatchId,
        region: &tessera_domain::Domain,
        method: CompactionMethod,
    ) -> Result<()> {
        self.require_guardless()?;
        let layout = Arc::get_mut(&mut self.layout).ok_or(EngineError::SharedLayout)?;
        let ordinals = layout.destroy_elements(patch, region)?;
        let handle = self.blocks.require(patch)?.identity();
        self.arena.remove_ordinals(handle, &ordinals, method)?;
        self.rebind_domains();
        Ok(())
    }

    /// Dynamic resize slides elements past patch ends; guard margins would
    /// alias the moved cells.
    fn require_guardless(&self) -> Result<()> {
        let guards = self.layout.guards();
        for axis in 0..guards.dim() {
            if guards.internal_lower(axis) != 0
                || guards.internal_upper(axis) != 0
                || guards.external_lower(axis) != 0
                || guards.external_upper(axis) != 0
            {
                return Err(EngineError::GuardedDynamic);
            }
        }
        Ok(())
    }

    /// Rebind every block to its patch's renumbered domain after a resize.
    fn rebind_domains(&mut self) {
        for node in self.layout.nodes() {
            if let Some(block) = self.blocks.get_mut(node.id()) {
                block.set_domain(node.allocated().clone());
            }
        }
    }

    /// Materialize the owned data in global row-major order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        let mut values = Vec::with_capacity(self.layout.global_domain().size());
        for point in self.layout.global_domain().iter_points() {
            values.push(self.get(&point)?);
        }
        Ok(values)
    }
}

impl<T: bytemuck::Pod + PartialEq + AddAssign> PatchArray<T> {
    /// Add guard contents into owners' owned cells
    /// (see [`crate::fill::accumulate_from_guards`]).
    pub fn accumulate_from_guards(&mut self) -> Result<()> {
        accumulate_from_guards(&self.layout, &mut self.arena, &self.blocks, &mut LocalOnly)
    }
}

// ================================================================================================
// Tests
// ================================================================================================
