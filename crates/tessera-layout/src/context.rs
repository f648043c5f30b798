//! Context mapping policies
//!
//! After partitioning, every patch is assigned an owning execution context.
//! Replicated mapping gives every context the full patch set (shared-memory
//! runs); distributed mappings hand each patch to exactly one context.
//!
//! Mapping is deterministic: identical (patch list, context count, policy)
//! inputs always produce identical assignments. Higher layers cache
//! intersection results keyed on that determinism, so an affinity policy
//! that consulted ambient state would corrupt those caches.

use crate::error::{LayoutError, Result};
use crate::node::ContextId;
use std::sync::Arc;
use tessera_domain::Domain;

/// Injectable spatial-affinity assignment.
///
/// Implementations must be deterministic and produce an exhaustive,
/// non-overlapping assignment: exactly one in-range context per patch, in
/// patch creation order.
pub trait AffinityPolicy: Send + Sync {
    fn assign(&self, owned: &[Domain], contexts: usize) -> Vec<ContextId>;
}

/// How patches are assigned to owning contexts.
#[derive(Clone)]
pub enum ContextPolicy {
    /// Every context logically owns every patch.
    Replicated,
    /// Contiguous creation-order chunks, as even as possible, remainder to
    /// the earliest contexts.
    DistributedUniform,
    /// Delegate to a spatial-affinity policy.
    DistributedAffinity(Arc<dyn AffinityPolicy>),
}

impl std::fmt::Debug for ContextPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextPolicy::Replicated => write!(f, "Replicated"),
            ContextPolicy::DistributedUniform => write!(f, "DistributedUniform"),
            ContextPolicy::DistributedAffinity(_) => write!(f, "DistributedAffinity(..)"),
        }
    }
}

/// Assign an owning context to each patch.
///
/// Returns the per-patch assignment and whether the mapping is replicated
/// (in which case the assignment lists the nominal owner, context 0, and
/// every context treats all patches as local).
pub(crate) fn map_contexts(
    owned: &[Domain],
    contexts: usize,
    policy: &ContextPolicy,
) -> Result<(Vec<ContextId>, bool)> {
    if contexts == 0 {
        return Err(LayoutError::ZeroContexts);
    }
    match policy {
        ContextPolicy::Replicated => Ok((vec![ContextId::new(0); owned.len()], true)),
        ContextPolicy::DistributedUniform => Ok((uniform_assignment(owned.len(), contexts), false)),
        ContextPolicy::DistributedAffinity(affinity) => {
            let assignment = affinity.assign(owned, contexts);
            if assignment.len() != owned.len() {
                return Err(LayoutError::BadAffinityAssignment(format!(
                    "assigned {} patches, expected {}",
                    assignment.len(),
                    owned.len()
                )));
            }
            if let Some(bad) = assignment.iter().find(|c| c.id() as usize >= contexts) {
                return Err(LayoutError::BadAffinityAssignment(format!(
                    "{bad} out of range for {contexts} contexts"
                )));
            }
            Ok((assignment, false))
        }
    }
}

/// Even creation-order chunks; the first `n % contexts` contexts take one
/// extra patch.
fn uniform_assignment(patches: usize, contexts: usize) -> Vec<ContextId> {
    let base = patches / contexts;
    let remainder = patches % contexts;
    let mut assignment = Vec::with_capacity(patches);
    for ctx in 0..contexts {
        let span = base + usize::from(ctx < remainder);
        assignment.extend(std::iter::repeat_n(ContextId::new(ctx as u32), span));
    }
    assignment
}

/// Nearest-context-by-centroid affinity.
///
/// Patches are ordered by centroid (lexicographic over axes, ties by
/// creation order) and cut into contiguous even chunks, so spatially close
/// patches land on the same context and inter-context guard traffic stays
/// on chunk boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidAffinity;

impl AffinityPolicy for CentroidAffinity {
    fn assign(&self, owned: &[Domain], contexts: usize) -> Vec<ContextId> {
        let mut order: Vec<usize> = (0..owned.len()).collect();
        order.sort_by_key(|&i| centroid_key(&owned[i]));

        let chunked = uniform_assignment(owned.len(), contexts);
        let mut assignment = vec![ContextId::new(0); owned.len()];
        for (rank, &patch) in order.iter().enumerate() {
            assignment[patch] = chunked[rank];
        }
        assignment
    }
}

/// Doubled centroid coordinates, exact in integers.
fn centroid_key(domain: &Domain) -> Vec<i64> {
    domain
        .axes()
        .iter()
        .map(|iv| iv.first() + iv.last())
        .collect()
}

// ================================================================================================
// Tests
// ================================================================================================
