//! Patch storage blocks and views
//!
//! A [`PatchBlock`] binds an arena buffer to the index domain it stores,
//! mapping points to buffer offsets. Blocks come in two kinds: dense blocks
//! always hold a full per-index buffer; compressible blocks may collapse a
//! uniform patch to one scalar. A [`BlockView`] is a random-access window
//! over a block; constructing one expands a compressed block immediately,
//! because a view promises arbitrary future writes.
//!
//! Blocks are thin handle wrappers: copying data, refcounts, dirty flags
//! and the compression state all live in the arena slot, so every alias of
//! a block observes the same state. The [`Storage`] trait is the closed
//! interface shared by the block and view variants.

use crate::arena::{BlockHandle, BufferArena};
use crate::error::{EngineError, Result};
use std::marker::PhantomData;
use tessera_domain::Domain;

/// Storage behavior of a [`PatchBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Always expanded.
    Dense,
    /// May collapse a uniform patch to a single scalar.
    Compressible,
}

/// The closed interface over the storage variants: dense block,
/// compressible block, and view-over-a-block.
pub trait Storage<T: bytemuck::Pod + PartialEq> {
    /// Read the element at an index point.
    fn read(&self, arena: &BufferArena<T>, point: &[i64]) -> Result<T>;
    /// Write the element at an index point.
    fn write(&self, arena: &mut BufferArena<T>, point: &[i64], value: T) -> Result<()>;
    /// The index domain this storage covers.
    fn domain(&self) -> &Domain;
    /// True while the underlying buffer is collapsed.
    fn is_compressed(&self, arena: &BufferArena<T>) -> Result<bool>;
    /// The identity token of the underlying buffer.
    fn identity(&self) -> BlockHandle;
}

/// Storage for one patch: an arena buffer addressed by index points of the
/// patch's allocated domain.
#[derive(Debug)]
pub struct PatchBlock<T> {
    handle: BlockHandle,
    domain: Domain,
    kind: BlockKind,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod + PartialEq> PatchBlock<T> {
    /// Allocate a dense block over `domain`, zero-initialized.
    pub fn new_dense(arena: &mut BufferArena<T>, domain: Domain) -> Self {
        let handle = arena.alloc_expanded(domain.size());
        Self {
            handle,
            domain,
            kind: BlockKind::Dense,
            _marker: PhantomData,
        }
    }

    /// Allocate a compressible block over `domain`, born collapsed to
    /// `initial`.
    pub fn new_compressible(arena: &mut BufferArena<T>, domain: Domain, initial: T) -> Self {
        let handle = arena.alloc_collapsed(initial, domain.size());
        Self {
            handle,
            domain,
            kind: BlockKind::Compressible,
            _marker: PhantomData,
        }
    }

    /// The block's storage kind.
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Logical element count.
    pub fn len(&self) -> usize {
        self.domain.size()
    }

    /// True when the block covers no points.
    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    /// Another handle to the same buffer (shared, not copied).
    pub fn alias(&self, arena: &mut BufferArena<T>) -> Result<Self> {
        arena.retain(self.handle)?;
        Ok(Self {
            handle: self.handle,
            domain: self.domain.clone(),
            kind: self.kind,
            _marker: PhantomData,
        })
    }

    /// Drop this alias, reclaiming the buffer when it was the last one.
    pub fn release(self, arena: &mut BufferArena<T>) -> Result<()> {
        arena.release(self.handle)?;
        Ok(())
    }

    /// Break aliasing: deep-copy into a fresh buffer with a fresh identity
    /// token.
    pub fn make_private_copy(&mut self, arena: &mut BufferArena<T>) -> Result<()> {
        self.handle = arena.make_private(self.handle)?;
        Ok(())
    }

    fn offset(&self, point: &[i64]) -> Result<usize> {
        self.domain
            .offset_of(point)
            .ok_or_else(|| EngineError::PointOutsideBlock {
                point: format!("{point:?}"),
                domain: self.domain.to_string(),
            })
    }

    /// Rebind the block to a renumbered domain after a dynamic layout
    /// resize. The caller keeps buffer length and domain size in step.
    pub(crate) fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    /// Write without marking the buffer dirty; guard placement only.
    pub(crate) fn write_untracked(
        &self,
        arena: &mut BufferArena<T>,
        point: &[i64],
        value: T,
    ) -> Result<()> {
        let offset = self.offset(point)?;
        arena.write_untracked(self.handle, offset, value)
    }

    /// Overwrite the whole block with one value. A compressible block
    /// collapses; a dense block is filled in place.
    pub fn fill(&self, arena: &mut BufferArena<T>, value: T) -> Result<()> {
        match self.kind {
            BlockKind::Dense => arena.fill_expanded(self.handle, value),
            BlockKind::Compressible => arena.fill_collapse(self.handle, value),
        }
    }

    /// The scalar of a collapsed block.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotCompressible`] on dense blocks,
    /// [`EngineError::NotCompressed`] while expanded.
    pub fn compressed_value(&self, arena: &BufferArena<T>) -> Result<T> {
        if self.kind == BlockKind::Dense {
            return Err(EngineError::NotCompressible);
        }
        arena.compressed_value(self.handle)
    }

    /// Replace the scalar of a collapsed block.
    ///
    /// # Errors
    ///
    /// As [`PatchBlock::compressed_value`].
    pub fn set_compressed_value(&self, arena: &mut BufferArena<T>, value: T) -> Result<()> {
        if self.kind == BlockKind::Dense {
            return Err(EngineError::NotCompressible);
        }
        arena.set_compressed_value(self.handle, value)
    }

    /// Scan for uniformity and collapse when possible (best-effort).
    pub fn try_recompress(&self, arena: &mut BufferArena<T>) -> Result<bool> {
        arena.try_recompress(self.handle)
    }

    /// True when owned data changed since guards were last filled.
    pub fn is_dirty(&self, arena: &BufferArena<T>) -> Result<bool> {
        arena.is_dirty(self.handle)
    }

    /// Mark the buffer dirty; visible through every alias.
    pub fn mark_dirty(&self, arena: &mut BufferArena<T>) -> Result<()> {
        arena.mark_dirty(self.handle)
    }

    /// Clear the dirty flag.
    pub fn clear_dirty(&self, arena: &mut BufferArena<T>) -> Result<()> {
        arena.clear_dirty(self.handle)
    }

    /// A random-access view over `region`.
    ///
    /// Forces uncompression immediately: a view promises arbitrary writes.
    /// Release the view to give the engine a chance to recompress.
    ///
    /// # Errors
    ///
    /// `region` must lie inside the block's domain.
    pub fn view(&self, arena: &mut BufferArena<T>, region: &Domain) -> Result<BlockView<T>> {
        if !self.domain.contains(region) {
            return Err(EngineError::ViewOutsideBlock {
                region: region.to_string(),
                domain: self.domain.to_string(),
            });
        }
        arena.open_view(self.handle)?;
        Ok(BlockView {
            handle: self.handle,
            base_domain: self.domain.clone(),
            region: region.clone(),
            _marker: PhantomData,
        })
    }
}

impl<T: bytemuck::Pod + PartialEq> Storage<T> for PatchBlock<T> {
    fn read(&self, arena: &BufferArena<T>, point: &[i64]) -> Result<T> {
        let offset = self.offset(point)?;
        arena.read(self.handle, offset)
    }

    fn write(&self, arena: &mut BufferArena<T>, point: &[i64], value: T) -> Result<()> {
        let offset = self.offset(point)?;
        arena.write(self.handle, offset, value)
    }

    fn domain(&self) -> &Domain {
        &self.domain
    }

    fn is_compressed(&self, arena: &BufferArena<T>) -> Result<bool> {
        arena.is_compressed(self.handle)
    }

    fn identity(&self) -> BlockHandle {
        self.handle
    }
}

/// A random-access window over a [`PatchBlock`]'s buffer.
///
/// Views index in the block's own (global) coordinates, restricted to the
/// viewed region. The buffer stays expanded while any view is open; closing
/// the last one may recompress a uniform compressible buffer.
#[derive(Debug)]
pub struct BlockView<T> {
    handle: BlockHandle,
    base_domain: Domain,
    region: Domain,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod + PartialEq> BlockView<T> {
    /// The viewed region.
    pub fn region(&self) -> &Domain {
        &self.region
    }

    /// Close the view. Closing the last open view of a uniform
    /// compressible buffer recompresses it.
    pub fn release(self, arena: &mut BufferArena<T>) -> Result<()> {
        arena.close_view(self.handle)
    }

    fn offset(&self, point: &[i64]) -> Result<usize> {
        if !self.region.contains_point(point) {
            return Err(EngineError::PointOutsideBlock {
                point: format!("{point:?}"),
                domain: self.region.to_string(),
            });
        }
        self.base_domain
            .offset_of(point)
            .ok_or_else(|| EngineError::PointOutsideBlock {
                point: format!("{point:?}"),
                domain: self.base_domain.to_string(),
            })
    }
}

impl<T: bytemuck::Pod + PartialEq> Storage<T> for BlockView<T> {
    fn read(&self, arena: &BufferArena<T>, point: &[i64]) -> Result<T> {
        let offset = self.offset(point)?;
        arena.read(self.handle, offset)
    }

    fn write(&self, arena: &mut BufferArena<T>, point: &[i64], value: T) -> Result<()> {
        let offset = self.offset(point)?;
        arena.write(self.handle, offset, value)
    }

    fn domain(&self) -> &Domain {
        &self.region
    }

    fn is_compressed(&self, arena: &BufferArena<T>) -> Result<bool> {
        arena.is_compressed(self.handle)
    }

    fn identity(&self) -> BlockHandle {
        self.handle
    }
}

// ================================================================================================
// Tests
// ================================================================================================
