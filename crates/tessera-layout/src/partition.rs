//! Domain partitioning policies
//!
//! [`partition`] cuts a global domain into the ordered list of patch-owned
//! sub-domains a [`Layout`] is built over. Four policies are supported:
//!
//! - **Uniform blocks**: per-axis block counts; remainder cells go to the
//!   earliest blocks along each axis.
//! - **Explicit grid**: strictly increasing per-axis breakpoints inducing a
//!   rectangular tessellation.
//! - **Tile list**: caller-supplied non-overlapping tiles, not necessarily
//!   space-filling; [`border_regions`] exposes the uncovered seams.
//! - **Dynamic**: uniform 1-D blocks whose logical lengths may later grow
//!   and shrink through the owning layout (patch count stays fixed).
//!
//! Patch creation order is row-major over blocks with the last axis fastest,
//! so patch ids match direct per-axis arithmetic.
//!
//! [`Layout`]: crate::layout::Layout

use crate::error::{LayoutError, Result};
use tessera_domain::{Domain, Interval};

/// How a dynamic layout compacts a patch after destroying elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionMethod {
    /// Move the patch's trailing elements into the holes; order is not
    /// preserved but data movement is minimal.
    BackFill,
    /// Slide all elements above each hole down one slot; preserves order.
    ShiftUp,
}

/// Partitioning policy for [`partition`].
#[derive(Debug, Clone)]
pub enum PartitionPolicy {
    /// Equal blocks per axis, remainder spread one-per-block from the first.
    UniformBlocks { blocks: Vec<usize> },
    /// Tessellation induced by strictly increasing per-axis breakpoints.
    /// A breakpoint `b` starts a new block at index `b`.
    ExplicitGrid { breakpoints: Vec<Vec<i64>> },
    /// Arbitrary non-overlapping tiles; uncovered seams stay unassigned.
    TileList { tiles: Vec<Domain> },
    /// Uniform 1-D blocks with per-patch resizable logical length.
    Dynamic { patches: usize },
}

impl PartitionPolicy {
    /// True for the dynamic policy.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, PartitionPolicy::Dynamic { .. })
    }
}

/// Cut `global` into the ordered list of patch-owned sub-domains.
///
/// # Errors
///
/// Zero block counts, over-partitioned axes, non-monotonic or out-of-range
/// breakpoints, overlapping tiles, and tiles escaping the global domain are
/// all fatal configuration errors.
pub fn partition(global: &Domain, policy: &PartitionPolicy) -> Result<Vec<Domain>> {
    if global.is_empty() {
        return Err(LayoutError::EmptyGlobalDomain);
    }
    match policy {
        PartitionPolicy::UniformBlocks { blocks } => uniform_blocks(global, blocks),
        PartitionPolicy::ExplicitGrid { breakpoints } => explicit_grid(global, breakpoints),
        PartitionPolicy::TileList { tiles } => tile_list(global, tiles),
        PartitionPolicy::Dynamic { patches } => {
            if global.dim() != 1 {
                return Err(LayoutError::DimensionMismatch {
                    policy: 1,
                    domain: global.dim(),
                });
            }
            uniform_blocks(global, &[*patches])
        }
    }
}

fn uniform_blocks(global: &Domain, blocks: &[usize]) -> Result<Vec<Domain>> {
    let dim = global.dim();
    if blocks.len() != dim {
        return Err(LayoutError::DimensionMismatch {
            policy: blocks.len(),
            domain: dim,
        });
    }

    // Per-axis block intervals, remainder to the earliest blocks.
    let mut per_axis: Vec<Vec<Interval>> = Vec::with_capacity(dim);
    for (axis, &count) in blocks.iter().enumerate() {
        if count == 0 {
            return Err(LayoutError::ZeroBlockCount { axis });
        }
        let iv = global.axis(axis);
        let cells = iv.size();
        if count > cells {
            return Err(LayoutError::MoreBlocksThanCells {
                axis,
                blocks: count,
                cells,
            });
        }
        let base = cells / count;
        let remainder = cells % count;
        let mut cuts = Vec::with_capacity(count);
        let mut ordinal = 0usize;
        for b in 0..count {
            let span = base + usize::from(b < remainder);
            let first = iv.first() + (ordinal as i64) * iv.stride();
            let last = iv.first() + ((ordinal + span - 1) as i64) * iv.stride();
            cuts.push(Interval::with_stride(first, last, iv.stride()));
            ordinal += span;
        }
        per_axis.push(cuts);
    }

    Ok(cartesian(&per_axis))
}

fn explicit_grid(global: &Domain, breakpoints: &[Vec<i64>]) -> Result<Vec<Domain>> {
    let dim = global.dim();
    if breakpoints.len() != dim {
        return Err(LayoutError::DimensionMismatch {
            policy: breakpoints.len(),
            domain: dim,
        });
    }

    let mut per_axis: Vec<Vec<Interval>> = Vec::with_capacity(dim);
    for (axis, cuts) in breakpoints.iter().enumerate() {
        let iv = global.axis(axis);
        let mut prev = iv.first();
        let mut segments = Vec::with_capacity(cuts.len() + 1);
        for &cut in cuts {
            if cut <= prev || cut > iv.last() {
                return Err(LayoutError::BadBreakpoint { axis, value: cut });
            }
            segments.push(Interval::with_stride(prev, cut - 1, iv.stride()));
            prev = cut;
        }
        segments.push(Interval::with_stride(prev, iv.last(), iv.stride()));
        per_axis.push(segments);
    }

    Ok(cartesian(&per_axis))
}

fn tile_list(global: &Domain, tiles: &[Domain]) -> Result<Vec<Domain>> {
    for (i, tile) in tiles.iter().enumerate() {
        if !global.contains(tile) {
            return Err(LayoutError::PatchOutsideGlobal {
                patch: tile.to_string(),
                global: global.to_string(),
            });
        }
        for (j, other) in tiles.iter().enumerate().skip(i + 1) {
            if tile.touches(other) {
                return Err(LayoutError::OverlappingTiles { first: i, second: j });
            }
        }
    }
    Ok(tiles.to_vec())
}

/// Row-major (last axis fastest) product of per-axis interval lists.
fn cartesian(per_axis: &[Vec<Interval>]) -> Vec<Domain> {
    let mut domains: Vec<Vec<Interval>> = vec![Vec::new()];
    for axis_cuts in per_axis {
        let mut next = Vec::with_capacity(domains.len() * axis_cuts.len());
        for prefix in &domains {
            for &cut in axis_cuts {
                let mut axes = prefix.clone();
                axes.push(cut);
                next.push(axes);
            }
        }
        domains = next;
    }
    domains.into_iter().map(Domain::new).collect()
}

/// The rectangular seams of `global` not covered by any tile.
///
/// Useful with [`PartitionPolicy::TileList`]: the partitioner leaves the
/// seams unowned, and callers walk this list to assign ownership explicitly.
/// The returned regions are pairwise disjoint and, together with the tiles,
/// exactly cover the global domain.
pub fn border_regions(global: &Domain, tiles: &[Domain]) -> Vec<Domain> {
    let mut uncovered = vec![global.clone()];
    for tile in tiles {
        let mut next = Vec::with_capacity(uncovered.len());
        for rect in uncovered {
            subtract(&rect, tile, &mut next);
        }
        uncovered = next;
    }
    uncovered.retain(|d| !d.is_empty());
    uncovered
}

/// Append `rect` minus `cut` to `out` as disjoint rectangles.
fn subtract(rect: &Domain, cut: &Domain, out: &mut Vec<Domain>) {
    let overlap = rect.intersect(cut);
    if overlap.is_empty() {
        out.push(rect.clone());
        return;
    }

    // Peel one slab per axis side; the remainder narrows toward the overlap.
    let mut remaining = rect.clone();
    for a in 0..rect.dim() {
        let rem = remaining.axis(a);
        let ovl = overlap.axis(a);
        if rem.first() < ovl.first() {
            let mut axes: Vec<Interval> = remaining.axes().to_vec();
            axes[a] = Interval::with_stride(rem.first(), ovl.first() - rem.stride(), rem.stride());
            out.push(Domain::new(axes));
        }
        if rem.last() > ovl.last() {
            let mut axes: Vec<Interval> = remaining.axes().to_vec();
            axes[a] = Interval::with_stride(ovl.last() + rem.stride(), rem.last(), rem.stride());
            out.push(Domain::new(axes));
        }
        let mut axes: Vec<Interval> = remaining.axes().to_vec();
        axes[a] = ovl;
        remaining = Domain::new(axes);
    }
}

// ================================================================================================
// Tests
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_even_split() {
        let global = Domain::rect(&[(0, 8), (0, 8)]);
        let parts = partition(
            &global,
            &PartitionPolicy::UniformBlocks { blocks: vec![3, 3] },
        )
        .unwrap();
        assert_eq!(parts.len(), 9);
        assert!(parts.iter().all(|p| p.size() == 9));
        // Last axis fastest: patch 1 is block (0,1).
        assert_eq!(parts[1], Domain::rect(&[(0, 2), (3, 5)]));
        assert_eq!(parts[3], Domain::rect(&[(3, 5), (0, 2)]));
    }

    #[test]
    fn test_uniform_remainder_to_first_blocks() {
        let global = Domain::line(0, 9);
        let parts = partition(&global, &PartitionPolicy::UniformBlocks { blocks: vec![3] }).unwrap();
        assert_eq!(
            parts,
            vec![Domain::line(0, 3), Domain::line(4, 6), Domain::line(7, 9)]
        );
    }

    #[test]
    fn test_uniform_tiles_exactly() {
        let global = Domain::rect(&[(0, 10), (0, 6)]);
        let parts = partition(
            &global,
            &PartitionPolicy::UniformBlocks { blocks: vec![4, 2] },
        )
        .unwrap();
        let total: usize = parts.iter().map(|p| p.size()).sum();
        assert_eq!(total, global.size());
        for (i, a) in parts.iter().enumerate() {
            for b in parts.iter().skip(i + 1) {
                assert!(!a.touches(b));
            }
        }
    }

    #[test]
    fn test_uniform_zero_blocks_rejected() {
        let global = Domain::rect(&[(0, 8), (0, 8)]);
        let err = partition(
            &global,
            &PartitionPolicy::UniformBlocks { blocks: vec![3, 0] },
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::ZeroBlockCount { axis: 1 }));
    }

    #[test]
    fn test_uniform_overcommitted_axis_rejected() {
        let global = Domain::line(0, 2);
        let err = partition(&global, &PartitionPolicy::UniformBlocks { blocks: vec![4] }).unwrap_err();
        assert!(matches!(
            err,
            LayoutError::MoreBlocksThanCells { axis: 0, blocks: 4, cells: 3 }
        ));
    }

    #[test]
    fn test_explicit_grid() {
        let global = Domain::rect(&[(0, 9), (0, 9)]);
        let parts = partition(
            &global,
            &PartitionPolicy::ExplicitGrid {
                breakpoints: vec![vec![2, 7], vec![5]],
            },
        )
        .unwrap();
        assert_eq!(parts.len(), 6);
        assert_eq!(parts[0], Domain::rect(&[(0, 1), (0, 4)]));
        assert_eq!(parts[1], Domain::rect(&[(0, 1), (5, 9)]));
        assert_eq!(parts[4], Domain::rect(&[(7, 9), (0, 4)]));
        let total: usize = parts.iter().map(|p| p.size()).sum();
        assert_eq!(total, global.size());
    }

    #[test]
    fn test_explicit_grid_rejects_non_monotonic() {
        let global = Domain::line(0, 9);
        let err = partition(
            &global,
            &PartitionPolicy::ExplicitGrid {
                breakpoints: vec![vec![5, 5]],
            },
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::BadBreakpoint { axis: 0, value: 5 }));

        let err = partition(
            &global,
            &PartitionPolicy::ExplicitGrid {
                breakpoints: vec![vec![12]],
            },
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::BadBreakpoint { axis: 0, value: 12 }));
    }

    #[test]
    fn test_tile_list_passthrough() {
        let global = Domain::rect(&[(0, 9), (0, 9)]);
        let tiles = vec![
            Domain::rect(&[(0, 4), (0, 4)]),
            Domain::rect(&[(5, 9), (5, 9)]),
        ];
        let parts = partition(&global, &PartitionPolicy::TileList { tiles: tiles.clone() }).unwrap();
        assert_eq!(parts, tiles);
    }

    #[test]
    fn test_tile_list_rejects_overlap() {
        let global = Domain::rect(&[(0, 9), (0, 9)]);
        let err = partition(
            &global,
            &PartitionPolicy::TileList {
                tiles: vec![
                    Domain::rect(&[(0, 5), (0, 5)]),
                    Domain::rect(&[(5, 9), (5, 9)]),
                ],
            },
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::OverlappingTiles { first: 0, second: 1 }));
    }

    #[test]
    fn test_tile_list_rejects_escape() {
        let global = Domain::rect(&[(0, 9), (0, 9)]);
        let err = partition(
            &global,
            &PartitionPolicy::TileList {
                tiles: vec![Domain::rect(&[(8, 12), (0, 3)])],
            },
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::PatchOutsideGlobal { .. }));
    }

    #[test]
    fn test_border_regions_cover_seams() {
        let global = Domain::rect(&[(0, 9), (0, 9)]);
        let tiles = vec![
            Domain::rect(&[(0, 4), (0, 4)]),
            Domain::rect(&[(5, 9), (5, 9)]),
        ];
        let borders = border_regions(&global, &tiles);

        let tile_cells: usize = tiles.iter().map(|t| t.size()).sum();
        let border_cells: usize = borders.iter().map(|b| b.size()).sum();
        assert_eq!(tile_cells + border_cells, global.size());

        // Seams are disjoint from tiles and from each other.
        for border in &borders {
            for tile in &tiles {
                assert!(!border.touches(tile));
            }
        }
        for (i, a) in borders.iter().enumerate() {
            for b in borders.iter().skip(i + 1) {
                assert!(!a.touches(b));
            }
        }
    }

    #[test]
    fn test_border_regions_empty_when_covering() {
        let global = Domain::line(0, 9);
        let tiles = vec![Domain::line(0, 4), Domain::line(5, 9)];
        assert!(border_regions(&global, &tiles).is_empty());
    }

    #[test]
    fn test_dynamic_requires_1d() {
        let global = Domain::rect(&[(0, 9), (0, 9)]);
        let err = partition(&global, &PartitionPolicy::Dynamic { patches: 2 }).unwrap_err();
        assert!(matches!(err, LayoutError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_dynamic_partitions_like_uniform() {
        let global = Domain::line(0, 11);
        let parts = partition(&global, &PartitionPolicy::Dynamic { patches: 3 }).unwrap();
        assert_eq!(
            parts,
            vec![Domain::line(0, 3), Domain::line(4, 7), Domain::line(8, 11)]
        );
    }
}
