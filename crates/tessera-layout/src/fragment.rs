//! Cross-layout fragment identity tracking
//!
//! When several arrays' layouts are intersected to align data for one
//! multi-array operation, each resulting fragment must still answer "which
//! physical patch, in layout N, do I belong to?". A [`FragmentTrace`] is the
//! per-expression database answering that: an arena of records, each tagging
//! a fragment with (layout, context, patch) and a parent link to the record
//! it was derived from.
//!
//! The trace is an explicit context object threaded through the intersection
//! pass that builds it; it lives exactly as long as the expression and there
//! is no process-wide registry. Lookups walk the parent chain iteratively -
//! the chain is bounded by the number of operand arrays combined in one
//! query, typically a handful.

use crate::node::{ContextId, PatchId};
use std::collections::HashMap;
use std::fmt;

/// Handle naming one layout within a [`FragmentTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutId(pub u32);

impl LayoutId {
    /// Create a new layout handle
    pub const fn new(id: u32) -> Self {
        LayoutId(id)
    }

    /// Get the internal ID
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layout{}", self.0)
    }
}

/// Handle to one record of a [`FragmentTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey(pub u32);

impl RecordKey {
    /// Create a new record handle
    pub const fn new(id: u32) -> Self {
        RecordKey(id)
    }

    /// Get the internal ID
    pub const fn id(self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec{}", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
struct TraceRecord {
    layout: LayoutId,
    context: ContextId,
    patch: PatchId,
    parent: Option<RecordKey>,
}

/// Per-expression database mapping fragments back to physical patches.
#[derive(Debug, Default)]
pub struct FragmentTrace {
    records: Vec<TraceRecord>,
    /// Layouts registered as identical views of an earlier layout; lookups
    /// for the key resolve as the value.
    aliases: HashMap<LayoutId, LayoutId>,
    next_layout: u32,
}

impl FragmentTrace {
    /// An empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh layout handle for this trace.
    pub fn register_layout(&mut self) -> LayoutId {
        let id = LayoutId::new(self.next_layout);
        self.next_layout += 1;
        id
    }

    /// Record that a fragment of `layout` landed on `patch` of `context`.
    ///
    /// `parent` links the record the fragment was derived from, when it was
    /// produced by intersecting against the result of a previous pass
    /// rather than a raw domain.
    pub fn push(
        &mut self,
        layout: LayoutId,
        context: ContextId,
        patch: PatchId,
        parent: Option<RecordKey>,
    ) -> RecordKey {
        debug_assert!(
            parent.is_none_or(|p| p.index() < self.records.len()),
            "parent record does not exist"
        );
        let key = RecordKey::new(self.records.len() as u32);
        self.records.push(TraceRecord {
            layout,
            context,
            patch,
            parent,
        });
        key
    }

    /// Register that `new` was never independently intersected because it
    /// is an identical view of `old`; lookups for `new` answer from `old`'s
    /// records.
    pub fn shared(&mut self, new: LayoutId, old: LayoutId) {
        // Collapse chains so resolution stays a single hop.
        let canonical = self.resolve(old);
        self.aliases.insert(new, canonical);
    }

    fn resolve(&self, layout: LayoutId) -> LayoutId {
        let mut current = layout;
        while let Some(&next) = self.aliases.get(&current) {
            current = next;
        }
        current
    }

    /// The physical patch, in `layout`, that the fragment behind `key`
    /// belongs to.
    ///
    /// # Panics
    ///
    /// Walking the parent chain without finding a record tagged with
    /// `layout` means the database is corrupt; that is an assertion, not a
    /// recoverable miss.
    pub fn global_id(&self, layout: LayoutId, key: RecordKey) -> PatchId {
        self.find(layout, key).patch
    }

    /// The owning context, in `layout`, of the fragment behind `key`.
    ///
    /// # Panics
    ///
    /// As [`FragmentTrace::global_id`].
    pub fn context(&self, layout: LayoutId, key: RecordKey) -> ContextId {
        self.find(layout, key).context
    }

    fn find(&self, layout: LayoutId, key: RecordKey) -> &TraceRecord {
        let wanted = self.resolve(layout);
        let mut cursor = Some(key);
        while let Some(k) = cursor {
            let record = &self.records[k.index()];
            if self.resolve(record.layout) == wanted {
                return record;
            }
            cursor = record.parent;
        }
        panic!("fragment trace corrupt: no record for {layout} reachable from {key}");
    }

    /// Number of records pushed so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records have been pushed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all records and aliases, keeping the layout-handle counter so
    /// stale handles cannot collide with fresh ones.
    pub fn clear(&mut self) {
        self.records.clear();
        self.aliases.clear();
    }
}

// ================================================================================================
// Tests
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_record_lookup() {
        let mut trace = FragmentTrace::new();
        let la = trace.register_layout();
        let key = trace.push(la, ContextId::new(1), PatchId::new(4), None);
        assert_eq!(trace.global_id(la, key), PatchId::new(4));
        assert_eq!(trace.context(la, key), ContextId::new(1));
    }

    #[test]
    fn test_parent_chain_walk() {
        // Fragment produced by intersecting three arrays' layouts: the
        // chain answers for each of them.
        let mut trace = FragmentTrace::new();
        let la = trace.register_layout();
        let lb = trace.register_layout();
        let lc = trace.register_layout();

        let first = trace.push(la, ContextId::new(0), PatchId::new(2), None);
        let second = trace.push(lb, ContextId::new(1), PatchId::new(7), Some(first));
        let third = trace.push(lc, ContextId::new(0), PatchId::new(0), Some(second));

        assert_eq!(trace.global_id(lc, third), PatchId::new(0));
        assert_eq!(trace.global_id(lb, third), PatchId::new(7));
        assert_eq!(trace.global_id(la, third), PatchId::new(2));
        assert_eq!(trace.context(lb, third), ContextId::new(1));
    }

    #[test]
    fn test_shared_layouts_answer_from_original() {
        let mut trace = FragmentTrace::new();
        let old = trace.register_layout();
        let new = trace.register_layout();
        trace.shared(new, old);

        let key = trace.push(old, ContextId::new(0), PatchId::new(3), None);
        // A lookup under the alias resolves to the original's record.
        assert_eq!(trace.global_id(new, key), PatchId::new(3));
    }

    #[test]
    fn test_shared_chain_collapses() {
        let mut trace = FragmentTrace::new();
        let a = trace.register_layout();
        let b = trace.register_layout();
        let c = trace.register_layout();
        trace.shared(b, a);
        trace.shared(c, b);

        let key = trace.push(a, ContextId::new(2), PatchId::new(9), None);
        assert_eq!(trace.global_id(c, key), PatchId::new(9));
        assert_eq!(trace.context(c, key), ContextId::new(2));
    }

    #[test]
    #[should_panic(expected = "fragment trace corrupt")]
    fn test_lookup_miss_is_fatal() {
        let mut trace = FragmentTrace::new();
        let la = trace.register_layout();
        let lb = trace.register_layout();
        let key = trace.push(la, ContextId::new(0), PatchId::new(0), None);
        let _ = trace.global_id(lb, key);
    }

    #[test]
    fn test_clear_keeps_handle_counter() {
        let mut trace = FragmentTrace::new();
        let first = trace.register_layout();
        trace.push(first, ContextId::new(0), PatchId::new(0), None);
        trace.clear();
        assert!(trace.is_empty());
        let second = trace.register_layout();
        assert_ne!(first, second);
    }
}
