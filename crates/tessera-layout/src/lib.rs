//! # tessera-layout - Patch Decomposition and Guard Scheduling
//!
//! This crate turns a global index [`Domain`] into a registry of patches
//! ([`Layout`]) distributed across execution contexts, and derives from that
//! registry the communication schedule that keeps patch guard (halo) regions
//! coherent.
//!
//! ## Architecture
//!
//! ```text
//! Domain ──▶ partition() ──▶ owned sub-domains ──▶ map_contexts() ──▶ Node list
//!                                                                       │
//!                                      Layout ◀────────────────────────┘
//!                                        │
//!                 ┌──────────────┬───────┴────────┬─────────────────┐
//!             touches()      global_id()    fill_schedule()     view()
//! ```
//!
//! - [`partition`]: cuts the global domain under a [`PartitionPolicy`]
//!   (uniform blocks, explicit grid, tile list, dynamic).
//! - [`context`]: assigns each patch an owning [`ContextId`] under a
//!   [`ContextPolicy`] (replicated, uniform, spatial affinity).
//! - [`layout`]: the patch registry with intersection queries, owner lookup
//!   and the cached guard-fill schedule.
//! - [`view`]: rebased / sliced windows over a shared layout.
//! - [`fragment`]: the cross-layout identity trace used when several
//!   layouts are intersected for one multi-array operation.
//!
//! Topology is immutable after construction; only dynamic-policy layouts may
//! grow or shrink patch extents (patch count and adjacency stay fixed).
//!
//! [`Domain`]: tessera_domain::Domain
//! [`PartitionPolicy`]: partition::PartitionPolicy
//! [`ContextPolicy`]: context::ContextPolicy
//! [`ContextId`]: node::ContextId

pub mod context;
pub mod error;
pub mod fragment;
pub mod guard;
pub mod layout;
pub mod node;
pub mod partition;
pub mod view;

pub use context::{AffinityPolicy, CentroidAffinity, ContextPolicy};
pub use error::{LayoutError, Result};
pub use fragment::{FragmentTrace, LayoutId, RecordKey};
pub use guard::{FillRequest, GuardLayers, GuardSchedule};
pub use layout::{Layout, PatchRecord};
pub use node::{ContextId, Node, PatchId};
pub use partition::{CompactionMethod, PartitionPolicy};
pub use view::LayoutView;
