//! The buffer arena
//!
//! All patch storage lives in one [`BufferArena`] per container. A buffer is
//! addressed by a generation-tagged [`BlockHandle`]; sharing a buffer is two
//! handles naming the same slot, and copy-on-write is an explicit refcount
//! check before any mutating access. The handle doubles as the identity
//! token for aliasing detection: it is stable across compress/expand
//! transitions and changes only when a private copy is made.
//!
//! Each slot stores one of two representations:
//!
//! ```text
//! Expanded  ─ Vec<T>, one element per index point
//! Collapsed ─ a single scalar standing for every index point
//! ```
//!
//! The first write that would introduce a differing value expands a
//! collapsed slot (an O(domain-size) one-time cost); releasing the last
//! open view of an expanded slot triggers a best-effort uniformity scan
//! that may collapse it again.
//!
//! The dirty flag lives in the slot, not the handle, so marking one alias
//! dirty is immediately visible through every other alias. Mutation needs
//! `&mut BufferArena`, which makes the at-most-one-writer contract
//! structural within a context.

use crate::error::{EngineError, Result};
use bytemuck::Zeroable;
use std::fmt;

/// Generation-tagged handle to one arena slot.
///
/// The handle is the identity token used for aliasing detection: two
/// handles compare equal exactly when they alias the same logical buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHandle {
    index: u32,
    generation: u32,
}

impl BlockHandle {
    /// Slot index within the arena.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Generation the slot had when this handle was issued.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blk{}.{}", self.index, self.generation)
    }
}

/// Storage representation of one slot.
#[derive(Debug, Clone)]
enum Repr<T> {
    /// Full per-index buffer.
    Expanded(Vec<T>),
    /// One scalar standing for `len` identical values.
    Collapsed { value: T, len: usize },
}

impl<T: Copy> Repr<T> {
    fn len(&self) -> usize {
        match self {
            Repr::Expanded(data) => data.len(),
            Repr::Collapsed { len, .. } => *len,
        }
    }
}

#[derive(Debug)]
struct Slot<T> {
    refs: u32,
    views: u32,
    dirty: bool,
    /// Dense buffers never collapse; only buffers born collapsed may
    /// return to the collapsed representation.
    compressible: bool,
    repr: Repr<T>,
}

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    slot: Option<Slot<T>>,
}

/// Arena of reference-counted storage buffers.
pub struct BufferArena<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
}

impl<T: bytemuck::Pod + PartialEq> BufferArena<T> {
    /// An empty arena.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    fn alloc(&mut self, repr: Repr<T>, compressible: bool) -> BlockHandle {
        let slot = Slot {
            refs: 1,
            views: 0,
            dirty: false,
            compressible,
            repr,
        };
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.slot = Some(slot);
            BlockHandle {
                index,
                generation: entry.generation,
            }
        } else {
            let index = self.entries.len() as u32;
            self.entries.push(Entry {
                generation: 0,
                slot: Some(slot),
            });
            BlockHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Allocate a dense (never-compressing) buffer of `len` zeroed
    /// elements.
    pub fn alloc_expanded(&mut self, len: usize) -> BlockHandle {
        self.alloc(Repr::Expanded(vec![T::zeroed(); len]), false)
    }

    /// Allocate a compressible buffer, born collapsed: `len` logical copies
    /// of `value` stored as one scalar.
    pub fn alloc_collapsed(&mut self, value: T, len: usize) -> BlockHandle {
        self.alloc(Repr::Collapsed { value, len }, true)
    }

    fn slot(&self, handle: BlockHandle) -> Result<&Slot<T>> {
        self.entries
            .get(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
            .and_then(|e| e.slot.as_ref())
            .ok_or(EngineError::InvalidHandle {
                index: handle.index,
                generation: handle.generation,
            })
    }

    fn slot_mut(&mut self, handle: BlockHandle) -> Result<&mut Slot<T>> {
        self.entries
            .get_mut(handle.index as usize)
            .filter(|e| e.generation == handle.generation)
            .and_then(|e| e.slot.as_mut())
            .ok_or(EngineError::InvalidHandle {
                index: handle.index,
                generation: handle.generation,
            })
    }

    /// Register one more alias of the buffer.
    pub fn retain(&mut self, handle: BlockHandle) -> Result<()> {
        self.slot_mut(handle)?.refs += 1;
        Ok(())
    }

    /// Drop one alias. Returns true when this was the last reference and
    /// the slot was reclaimed.
    pub fn release(&mut self, handle: BlockHandle) -> Result<bool> {
        let slot = self.slot_mut(handle)?;
        slot.refs -= 1;
        if slot.refs > 0 {
            return Ok(false);
        }
        let entry = &mut self.entries[handle.index as usize];
        entry.slot = None;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.index);
        Ok(true)
    }

    /// Number of aliases of the buffer.
    pub fn ref_count(&self, handle: BlockHandle) -> Result<u32> {
        Ok(self.slot(handle)?.refs)
    }

    /// Logical element count.
    pub fn len(&self, handle: BlockHandle) -> Result<usize> {
        Ok(self.slot(handle)?.repr.len())
    }

    /// True when the buffer is stored as a single scalar.
    pub fn is_compressed(&self, handle: BlockHandle) -> Result<bool> {
        Ok(matches!(self.slot(handle)?.repr, Repr::Collapsed { .. }))
    }

    /// The scalar standing for every element of a collapsed buffer.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotCompressed`] on an expanded buffer.
    pub fn compressed_value(&self, handle: BlockHandle) -> Result<T> {
        match self.slot(handle)?.repr {
            Repr::Collapsed { value, .. } => Ok(value),
            Repr::Expanded(_) => Err(EngineError::NotCompressed),
        }
    }

    /// Replace the scalar of a collapsed buffer.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotCompressed`] on an expanded buffer.
    pub fn set_compressed_value(&mut self, handle: BlockHandle, value: T) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        match &mut slot.repr {
            Repr::Collapsed { value: stored, .. } => {
                *stored = value;
                slot.dirty = true;
                Ok(())
            }
            Repr::Expanded(_) => Err(EngineError::NotCompressed),
        }
    }

    /// Read the element at `offset`. Collapsed buffers answer with the
    /// scalar without touching any per-index storage.
    pub fn read(&self, handle: BlockHandle, offset: usize) -> Result<T> {
        let slot = self.slot(handle)?;
        let len = slot.repr.len();
        if offset >= len {
            return Err(EngineError::OutOfBounds { offset, len });
        }
        match &slot.repr {
            Repr::Expanded(data) => Ok(data[offset]),
            Repr::Collapsed { value, .. } => Ok(*value),
        }
    }

    /// Write the element at `offset` and mark the buffer dirty.
    ///
    /// Writing a value equal to a collapsed buffer's scalar keeps it
    /// collapsed; the first differing write expands it.
    pub fn write(&mut self, handle: BlockHandle, offset: usize, value: T) -> Result<()> {
        self.store(handle, offset, value)?;
        self.slot_mut(handle)?.dirty = true;
        Ok(())
    }

    /// [`BufferArena::write`] without marking dirty.
    ///
    /// Guard synchronization places neighbor data in guard cells with this:
    /// guard placement replicates owned data, it does not change it.
    pub fn write_untracked(&mut self, handle: BlockHandle, offset: usize, value: T) -> Result<()> {
        self.store(handle, offset, value)
    }

    fn store(&mut self, handle: BlockHandle, offset: usize, value: T) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        let len = slot.repr.len();
        if offset >= len {
            return Err(EngineError::OutOfBounds { offset, len });
        }
        match &mut slot.repr {
            Repr::Expanded(data) => data[offset] = value,
            Repr::Collapsed { value: stored, .. } => {
                if *stored != value {
                    // First differing write: expand, then apply.
                    let mut data = vec![*stored; len];
                    data[offset] = value;
                    slot.repr = Repr::Expanded(data);
                }
            }
        }
        Ok(())
    }

    /// True when the buffer may use the collapsed representation.
    pub fn is_compressible(&self, handle: BlockHandle) -> Result<bool> {
        Ok(self.slot(handle)?.compressible)
    }

    /// Collapse the buffer to a single scalar, whatever it held before.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotCompressible`] on a dense buffer.
    pub fn fill_collapse(&mut self, handle: BlockHandle, value: T) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        if !slot.compressible {
            return Err(EngineError::NotCompressible);
        }
        let len = slot.repr.len();
        slot.repr = Repr::Collapsed { value, len };
        slot.dirty = true;
        Ok(())
    }

    /// Overwrite every element in place, keeping the buffer expanded.
    pub fn fill_expanded(&mut self, handle: BlockHandle, value: T) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        match &mut slot.repr {
            Repr::Expanded(data) => data.fill(value),
            Repr::Collapsed { len, .. } => {
                let len = *len;
                slot.repr = Repr::Expanded(vec![value; len]);
            }
        }
        slot.dirty = true;
        Ok(())
    }

    /// Force a collapsed buffer to its expanded representation.
    pub fn uncompress(&mut self, handle: BlockHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        if let Repr::Collapsed { value, len } = &slot.repr {
            let (value, len) = (*value, *len);
            slot.repr = Repr::Expanded(vec![value; len]);
        }
        Ok(())
    }

    /// Collapse an expanded buffer when every element is equal.
    ///
    /// Best-effort: buffers with open views, empty buffers and non-uniform
    /// buffers are left expanded. Returns whether the buffer is collapsed
    /// afterwards.
    pub fn try_recompress(&mut self, handle: BlockHandle) -> Result<bool> {
        let slot = self.slot_mut(handle)?;
        let uniform = match &slot.repr {
            Repr::Collapsed { .. } => return Ok(true),
            Repr::Expanded(data) => {
                if !slot.compressible || slot.views > 0 || data.is_empty() {
                    return Ok(false);
                }
                let first = data[0];
                data.iter().all(|v| *v == first).then_some((first, data.len()))
            }
        };
        match uniform {
            Some((value, len)) => {
                slot.repr = Repr::Collapsed { value, len };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// True when owned data changed since guards were last filled.
    pub fn is_dirty(&self, handle: BlockHandle) -> Result<bool> {
        Ok(self.slot(handle)?.dirty)
    }

    /// Mark the buffer dirty through any alias.
    pub fn mark_dirty(&mut self, handle: BlockHandle) -> Result<()> {
        self.slot_mut(handle)?.dirty = true;
        Ok(())
    }

    /// Clear the dirty flag (guard data is now coherent).
    pub fn clear_dirty(&mut self, handle: BlockHandle) -> Result<()> {
        self.slot_mut(handle)?.dirty = false;
        Ok(())
    }

    /// Register an open random-access view. A view promises arbitrary
    /// future writes, so a collapsed buffer expands immediately.
    pub fn open_view(&mut self, handle: BlockHandle) -> Result<()> {
        self.uncompress(handle)?;
        self.slot_mut(handle)?.views += 1;
        Ok(())
    }

    /// Close a view. Closing the last view runs the best-effort
    /// recompression scan.
    pub fn close_view(&mut self, handle: BlockHandle) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        debug_assert!(slot.views > 0, "close_view without matching open_view");
        slot.views = slot.views.saturating_sub(1);
        if slot.views == 0 {
            self.try_recompress(handle)?;
        }
        Ok(())
    }

    /// Break aliasing: deep-copy the buffer into a fresh slot with a fresh
    /// identity token and drop this alias of the original.
    ///
    /// Always returns a new, distinct handle, even when the buffer was
    /// already unshared.
    pub fn make_private(&mut self, handle: BlockHandle) -> Result<BlockHandle> {
        let slot = self.slot(handle)?;
        let repr = slot.repr.clone();
        let dirty = slot.dirty;
        let compressible = slot.compressible;
        self.release(handle)?;
        let copy = self.alloc(repr, compressible);
        if dirty {
            self.mark_dirty(copy)?;
        }
        Ok(copy)
    }

    /// Materialize the buffer contents, expanding collapsed values.
    pub fn snapshot(&self, handle: BlockHandle) -> Result<Vec<T>> {
        match &self.slot(handle)?.repr {
            Repr::Expanded(data) => Ok(data.clone()),
            Repr::Collapsed { value, len } => Ok(vec![*value; *len]),
        }
    }

    /// Grow the buffer by `count` elements valued `value` at its end.
    ///
    /// A collapsed buffer grows in place when `value` matches its scalar
    /// and expands otherwise.
    pub fn extend_with(&mut self, handle: BlockHandle, count: usize, value: T) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        match &mut slot.repr {
            Repr::Expanded(data) => {
                data.resize(data.len() + count, value);
            }
            Repr::Collapsed { value: stored, len } => {
                if *stored == value {
                    *len += count;
                } else {
                    let mut data = vec![*stored; *len];
                    data.resize(*len + count, value);
                    slot.repr = Repr::Expanded(data);
                }
            }
        }
        slot.dirty = true;
        Ok(())
    }

    /// Remove the elements at `ordinals` (ascending) and compact.
    ///
    /// `BackFill` moves trailing elements into the holes (minimal copies,
    /// order not preserved); `ShiftUp` slides everything down (order
    /// preserved). Collapsed buffers just shrink.
    pub fn remove_ordinals(
        &mut self,
        handle: BlockHandle,
        ordinals: &[usize],
        method: crate::CompactionMethod,
    ) -> Result<()> {
        let slot = self.slot_mut(handle)?;
        let len = slot.repr.len();
        if let Some(&worst) = ordinals.last() {
            if worst >= len {
                return Err(EngineError::OutOfBounds { offset: worst, len });
            }
        }
        match &mut slot.repr {
            Repr::Collapsed { len, .. } => {
                *len -= ordinals.len();
            }
            Repr::Expanded(data) => {
                let mut keep = vec![true; len];
                for &o in ordinals {
                    keep[o] = false;
                }
                let new_len = len - ordinals.len();
                match method {
                    crate::CompactionMethod::ShiftUp => {
                        let mut write = 0usize;
                        for read in 0..len {
                            if keep[read] {
                                data[write] = data[read];
                                write += 1;
                            }
                        }
                        data.truncate(new_len);
                    }
                    crate::CompactionMethod::BackFill => {
                        // Kept elements stranded past the new length fill the
                        // holes below it, last stranded element first.
                        let mut spare: Vec<T> =
                            (new_len..len).filter(|&i| keep[i]).map(|i| data[i]).collect();
                        for &o in ordinals.iter().filter(|&&o| o < new_len) {
                            if let Some(v) = spare.pop() {
                                data[o] = v;
                            }
                        }
                        data.truncate(new_len);
                    }
                }
            }
        }
        slot.dirty = true;
        Ok(())
    }
}

impl<T: bytemuck::Pod + PartialEq> Default for BufferArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ================================================================================================
// Tests
// ================================================================================================
