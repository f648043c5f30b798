//! # tessera-engine - Patch Storage with Guard Synchronization
//!
//! The storage layer under Tessera's layout registry: a buffer arena with
//! explicit aliasing, dense and compressible per-patch blocks, and the
//! collective operations that keep guard (halo) regions coherent.
//!
//! ## Architecture
//!
//! ```text
//! PatchArray ── Arc<Layout> ─────────▶ fill schedule (cached)
//!     │                                      │
//!     ├── BufferArena ◀── BlockHandle ──┐    │
//!     │     (slots: refs, dirty,        │    ▼
//!     │      expanded | collapsed)      ├─ fill_guards / set_guards /
//!     └── BlockSet ── PatchBlock ───────┘  accumulate_from_guards
//!                        └── BlockView (forces expansion)
//! ```
//!
//! - [`arena`]: slot storage with generation-tagged handles, refcounted
//!   aliasing, copy-on-write, the dirty flag, and the
//!   expanded/collapsed representation state machine.
//! - [`block`]: domain-addressed blocks and views over arena buffers; the
//!   [`Storage`] trait is the closed interface over the variants.
//! - [`fill`]: the guard collectives driven by a layout's fill schedule,
//!   with a [`GuardTransport`] seam for cross-context delivery.
//! - [`array`]: [`PatchArray`], composing one layout, one arena and one
//!   block per patch.
//!
//! Writers are serialized per patch by the external task scheduler; this
//! crate takes `&mut` access for every mutation and adds no locking of its
//! own.

pub mod arena;
pub mod array;
pub mod block;
pub mod error;
pub mod fill;

pub use arena::{BlockHandle, BufferArena};
pub use array::PatchArray;
pub use block::{BlockKind, BlockView, PatchBlock, Storage};
pub use error::{EngineError, Result};
pub use fill::{fill_guards, set_guards, accumulate_from_guards, BlockSet, GuardTransport, LocalOnly};

// The compaction method travels with the layout's dynamic operations but is
// applied by the storage layer.
pub use tessera_layout::CompactionMethod;
