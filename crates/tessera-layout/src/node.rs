//! Patch and context handles
//!
//! Patches and contexts are referred to everywhere by small Copy newtypes,
//! so queries and schedules can be stored and compared without touching the
//! records they name.

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_domain::Domain;

/// Handle to one patch of a layout.
///
/// Patch ids are dense: a layout with `n` patches uses ids `0..n` in
/// creation order. Touches queries report patches in ascending id order,
/// which downstream reductions rely on for determinism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatchId(pub u32);

impl PatchId {
    /// Create a new patch handle
    pub const fn new(id: u32) -> Self {
        PatchId(id)
    }

    /// Get the internal ID
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Get the id as a slice index
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch{}", self.0)
    }
}

/// Handle to one unit of distributed-memory parallelism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextId(pub u32);

impl ContextId {
    /// Create a new context handle
    pub const fn new(id: u32) -> Self {
        ContextId(id)
    }

    /// Get the internal ID
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx{}", self.0)
    }
}

/// One patch record of a layout.
///
/// `owned` domains of a layout tile the global domain exactly; `allocated`
/// is `owned` expanded by the guard widths and may overlap neighboring
/// allocations by exactly the guard depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: PatchId,
    context: ContextId,
    owned: Domain,
    allocated: Domain,
}

impl Node {
    pub(crate) fn new(id: PatchId, context: ContextId, owned: Domain, allocated: Domain) -> Self {
        Self {
            id,
            context,
            owned,
            allocated,
        }
    }

    /// This patch's handle.
    pub fn id(&self) -> PatchId {
        self.id
    }

    /// The context that owns this patch.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// The sub-domain this patch exclusively owns.
    pub fn owned(&self) -> &Domain {
        &self.owned
    }

    /// The owned sub-domain expanded by guard layers.
    pub fn allocated(&self) -> &Domain {
        &self.allocated
    }

    pub(crate) fn set_owned(&mut self, owned: Domain, allocated: Domain) {
        self.owned = owned;
        self.allocated = allocated;
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}: owned {} alloc {}",
            self.id, self.context, self.owned, self.allocated
        )
    }
}
