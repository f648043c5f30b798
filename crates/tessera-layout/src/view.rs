//! Rebased and sliced layout views
//!
//! A [`LayoutView`] presents a window of a layout in its own zero-based
//! coordinate system. The view shares the base layout's patch records
//! through an `Arc` (no duplication); queries are translated into base
//! coordinates on the way in and back on the way out. Freezing an axis at
//! one coordinate drops that axis from the view, so slicing reduces
//! dimensionality.

use crate::error::{LayoutError, Result};
use crate::layout::Layout;
use crate::node::PatchId;
use std::sync::Arc;
use tessera_domain::{Domain, Interval};

/// How one base axis appears in a view.
#[derive(Debug, Clone, Copy)]
enum AxisMap {
    /// The axis survives: view ordinals walk this base interval.
    Kept(Interval),
    /// The axis was sliced away at a fixed base coordinate.
    Frozen(i64),
}

/// A re-indexed window onto a shared [`Layout`].
///
/// View coordinates are zero-based and unit-stride on every kept axis,
/// whatever the window's base strides are.
#[derive(Debug, Clone)]
pub struct LayoutView {
    base: Arc<Layout>,
    axes: Vec<AxisMap>,
    domain: Domain,
}

impl LayoutView {
    /// View `window` (in base coordinates) of `base`.
    ///
    /// # Errors
    ///
    /// The window must lie inside the base global domain.
    pub fn new(base: Arc<Layout>, window: &Domain) -> Result<Self> {
        if window.dim() != base.global_domain().dim() {
            return Err(LayoutError::DimensionMismatch {
                policy: window.dim(),
                domain: base.global_domain().dim(),
            });
        }
        if !base.global_domain().contains(window) {
            return Err(LayoutError::PatchOutsideGlobal {
                patch: window.to_string(),
                global: base.global_domain().to_string(),
            });
        }
        let axes: Vec<AxisMap> = window.axes().iter().map(|&iv| AxisMap::Kept(iv)).collect();
        let domain = Self::rebased_domain(&axes);
        Ok(Self { base, axes, domain })
    }

    /// The zero-based domain a kept-axis list presents.
    fn rebased_domain(axes: &[AxisMap]) -> Domain {
        let kept: Vec<Interval> = axes
            .iter()
            .filter_map(|m| match m {
                AxisMap::Kept(iv) => Some(Interval::new(0, iv.size() as i64 - 1)),
                AxisMap::Frozen(_) => None,
            })
            .collect();
        Domain::new(kept)
    }

    /// The view's domain, in view coordinates.
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Number of view axes (kept axes only).
    pub fn dim(&self) -> usize {
        self.domain.dim()
    }

    /// The shared base layout.
    pub fn base(&self) -> &Arc<Layout> {
        &self.base
    }

    /// Map a view point to base coordinates.
    ///
    /// # Panics
    ///
    /// Panics when `point` has the wrong dimensionality; membership is the
    /// caller's contract, as with [`Layout::global_id`].
    pub fn base_point(&self, point: &[i64]) -> Vec<i64> {
        assert_eq!(point.len(), self.dim(), "view point dimensionality mismatch");
        let mut view_axis = 0;
        self.axes
            .iter()
            .map(|m| match m {
                AxisMap::Kept(w) => {
                    let p = w.first() + point[view_axis] * w.stride();
                    view_axis += 1;
                    p
                }
                AxisMap::Frozen(at) => *at,
            })
            .collect()
    }

    /// Map a view-coordinate domain to base coordinates.
    fn to_base_domain(&self, query: &Domain) -> Domain {
        let mut view_axis = 0;
        let axes: Vec<Interval> = self
            .axes
            .iter()
            .map(|m| match m {
                AxisMap::Kept(w) => {
                    let q = query.axis(view_axis);
                    view_axis += 1;
                    if q.is_empty() {
                        Interval::empty()
                    } else {
                        Interval::with_stride(
                            w.first() + q.first() * w.stride(),
                            w.first() + q.last() * w.stride(),
                            q.stride() * w.stride(),
                        )
                    }
                }
                AxisMap::Frozen(at) => Interval::new(*at, *at),
            })
            .collect();
        Domain::new(axes)
    }

    /// Map a base-coordinate domain (a subset of the window) back into view
    /// coordinates, dropping frozen axes.
    fn to_view_domain(&self, domain: &Domain) -> Domain {
        let mut kept = Vec::with_capacity(self.dim());
        for (a, m) in self.axes.iter().enumerate() {
            if let AxisMap::Kept(w) = m {
                let iv = domain.axis(a);
                debug_assert!(iv.stride() % w.stride() == 0 || iv.size() == 1);
                let first = (iv.first() - w.first()) / w.stride();
                let last = (iv.last() - w.first()) / w.stride();
                let stride = if iv.size() <= 1 {
                    1
                } else {
                    iv.stride() / w.stride()
                };
                kept.push(Interval::with_stride(first, last, stride));
            }
        }
        Domain::new(kept)
    }

    /// [`Layout::touches`] through the view: query and results are in view
    /// coordinates, patch ids are the base layout's.
    pub fn touches(&self, query: &Domain) -> Vec<(PatchId, Domain)> {
        let clipped = query.intersect(&self.domain);
        if clipped.is_empty() {
            return Vec::new();
        }
        self.base
            .touches(&self.to_base_domain(&clipped))
            .into_iter()
            .map(|(id, d)| (id, self.to_view_domain(&d)))
            .collect()
    }

    /// [`Layout::touches_alloc`] through the view.
    pub fn touches_alloc(&self, query: &Domain) -> Vec<(PatchId, Domain)> {
        let clipped = query.intersect(&self.domain);
        if clipped.is_empty() {
            return Vec::new();
        }
        self.base
            .touches_alloc(&self.to_base_domain(&clipped))
            .into_iter()
            .map(|(id, d)| (id, self.to_view_domain(&d)))
            .collect()
    }

    /// Owner of a view point, delegated to the base layout.
    ///
    /// # Panics
    ///
    /// As [`Layout::global_id`]: a point outside every patch is a
    /// programming error.
    pub fn global_id(&self, point: &[i64]) -> PatchId {
        self.base.global_id(&self.base_point(point))
    }

    /// A narrower view of the same base layout.
    ///
    /// `window` is in this view's coordinates; the result is rebased to
    /// zero again.
    pub fn view(&self, window: &Domain) -> Result<LayoutView> {
        if window.dim() != self.dim() {
            return Err(LayoutError::DimensionMismatch {
                policy: window.dim(),
                domain: self.dim(),
            });
        }
        if !self.domain.contains(window) {
            return Err(LayoutError::PatchOutsideGlobal {
                patch: window.to_string(),
                global: self.domain.to_string(),
            });
        }
        // to_base_domain keeps one interval per base axis, frozen axes as
        // single points, so the mapping realigns by base-axis index.
        let base_window = self.to_base_domain(window);
        let axes: Vec<AxisMap> = self
            .axes
            .iter()
            .enumerate()
            .map(|(a, m)| match m {
                AxisMap::Kept(_) => AxisMap::Kept(base_window.axis(a)),
                AxisMap::Frozen(at) => AxisMap::Frozen(*at),
            })
            .collect();
        let domain = Self::rebased_domain(&axes);
        Ok(Self {
            base: Arc::clone(&self.base),
            axes,
            domain,
        })
    }

    /// Freeze `axis` (a view axis) at view coordinate `coord`, dropping it
    /// from the result. Reduces dimensionality by one.
    pub fn slice(&self, axis: usize, coord: i64) -> Result<LayoutView> {
        if axis >= self.dim() {
            return Err(LayoutError::AxisOutOfRange {
                axis,
                dim: self.dim(),
            });
        }
        if !self.domain.axis(axis).contains(coord) {
            return Err(LayoutError::SliceOutsideView { axis, coord });
        }

        let mut view_axis = 0;
        let axes: Vec<AxisMap> = self
            .axes
            .iter()
            .map(|m| match m {
                AxisMap::Kept(w) => {
                    let mapped = if view_axis == axis {
                        AxisMap::Frozen(w.first() + coord * w.stride())
                    } else {
                        AxisMap::Kept(*w)
                    };
                    view_axis += 1;
                    mapped
                }
                AxisMap::Frozen(at) => AxisMap::Frozen(*at),
            })
            .collect();
        let domain = Self::rebased_domain(&axes);
        Ok(Self {
            base: Arc::clone(&self.base),
            axes,
            domain,
        })
    }
}

// ================================================================================================
// Tests
// ================================================================================================
