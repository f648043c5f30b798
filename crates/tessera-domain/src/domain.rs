//! Multi-axis index domains
//!
//! A [`Domain`] is the product of one [`Interval`] per axis: an axis-aligned
//! rectangular region of index points, possibly strided. Domains are the
//! lingua franca of the workspace: partition results, patch ownership,
//! guard margins, touches-query answers and storage extents are all domains.
//!
//! Offset arithmetic is row-major with the last axis fastest, matching how
//! the storage engine lays out patch buffers.

use crate::interval::Interval;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An axis-aligned rectangular set of index points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Domain {
    axes: Vec<Interval>,
}

impl Domain {
    /// Create a domain from per-axis intervals.
    pub fn new(axes: Vec<Interval>) -> Self {
        Self { axes }
    }

    /// Create a unit-stride domain from per-axis `(first, last)` bounds.
    pub fn rect(bounds: &[(i64, i64)]) -> Self {
        Self {
            axes: bounds.iter().map(|&(f, l)| Interval::new(f, l)).collect(),
        }
    }

    /// Create a 1-D unit-stride domain.
    pub fn line(first: i64, last: i64) -> Self {
        Self {
            axes: vec![Interval::new(first, last)],
        }
    }

    /// Number of axes.
    pub fn dim(&self) -> usize {
        self.axes.len()
    }

    /// The interval along `axis`.
    pub fn axis(&self, axis: usize) -> Interval {
        self.axes[axis]
    }

    /// All per-axis intervals.
    pub fn axes(&self) -> &[Interval] {
        &self.axes
    }

    /// Total number of index points (product over axes).
    pub fn size(&self) -> usize {
        self.axes.iter().map(|iv| iv.size()).product()
    }

    /// True when any axis is empty (the domain holds no points).
    pub fn is_empty(&self) -> bool {
        self.axes.iter().any(|iv| iv.is_empty())
    }

    /// True when `point` lies in the domain.
    ///
    /// # Panics
    ///
    /// Panics if `point.len() != self.dim()`.
    pub fn contains_point(&self, point: &[i64]) -> bool {
        assert_eq!(point.len(), self.dim(), "point dimensionality mismatch");
        self.axes.iter().zip(point).all(|(iv, &p)| iv.contains(p))
    }

    /// True when every point of `other` lies in `self`.
    pub fn contains(&self, other: &Domain) -> bool {
        other.is_empty()
            || self
                .axes
                .iter()
                .zip(&other.axes)
                .all(|(a, b)| a.contains_interval(*b))
    }

    /// Per-axis intersection. Empty on any axis empties the whole domain.
    pub fn intersect(&self, other: &Domain) -> Domain {
        debug_assert_eq!(self.dim(), other.dim());
        Domain {
            axes: self
                .axes
                .iter()
                .zip(&other.axes)
                .map(|(a, b)| a.intersect(*b))
                .collect(),
        }
    }

    /// Union test: do the two domains share at least one point?
    pub fn touches(&self, other: &Domain) -> bool {
        !self.is_empty() && !other.is_empty() && !self.intersect(other).is_empty()
    }

    /// Shift every point by the per-axis `offset`.
    pub fn translate(&self, offset: &[i64]) -> Domain {
        assert_eq!(offset.len(), self.dim(), "offset dimensionality mismatch");
        Domain {
            axes: self
                .axes
                .iter()
                .zip(offset)
                .map(|(iv, &o)| iv.translate(o))
                .collect(),
        }
    }

    /// Extend each axis by `lo[a]` points downward and `hi[a]` upward.
    pub fn grow(&self, lo: &[usize], hi: &[usize]) -> Domain {
        assert_eq!(lo.len(), self.dim());
        assert_eq!(hi.len(), self.dim());
        Domain {
            axes: self
                .axes
                .iter()
                .enumerate()
                .map(|(a, iv)| iv.grow(lo[a], hi[a]))
                .collect(),
        }
    }

    /// Row-major (last axis fastest) offset of `point` within the domain.
    ///
    /// Returns `None` when `point` is not a member.
    pub fn offset_of(&self, point: &[i64]) -> Option<usize> {
        if point.len() != self.dim() {
            return None;
        }
        let mut offset = 0usize;
        for (iv, &p) in self.axes.iter().zip(point) {
            let ord = iv.ordinal_of(p)?;
            offset = offset * iv.size() + ord;
        }
        Some(offset)
    }

    /// Visit every member point in row-major order (last axis fastest).
    ///
    /// The callback borrows a scratch coordinate buffer, so iteration does
    /// not allocate per point.
    pub fn for_each_point<F: FnMut(&[i64])>(&self, mut f: F) {
        if self.is_empty() {
            return;
        }
        let mut point: Vec<i64> = self.axes.iter().map(|iv| iv.first()).collect();
        loop {
            f(&point);
            // Odometer increment, last axis fastest.
            let mut axis = self.dim();
            loop {
                if axis == 0 {
                    return;
                }
                axis -= 1;
                let iv = self.axes[axis];
                if point[axis] + iv.stride() <= iv.last() {
                    point[axis] += iv.stride();
                    break;
                }
                point[axis] = iv.first();
            }
        }
    }

    /// Allocating point iterator, for tests and diagnostics.
    pub fn iter_points(&self) -> PointIter {
        PointIter {
            domain: self.clone(),
            next: if self.is_empty() {
                None
            } else {
                Some(self.axes.iter().map(|iv| iv.first()).collect())
            },
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, iv) in self.axes.iter().enumerate() {
            if i > 0 {
                write!(f, "x")?;
            }
            write!(f, "{iv}")?;
        }
        Ok(())
    }
}

/// Iterator over the points of a [`Domain`] in row-major order.
pub struct PointIter {
    domain: Domain,
    next: Option<Vec<i64>>,
}

impl Iterator for PointIter {
    type Item = Vec<i64>;

    fn next(&mut self) -> Option<Vec<i64>> {
        let current = self.next.take()?;
        let mut succ = current.clone();
        let mut axis = self.domain.dim();
        loop {
            if axis == 0 {
                // Odometer wrapped: this was the final point.
                break;
            }
            axis -= 1;
            let iv = self.domain.axis(axis);
            if succ[axis] + iv.stride() <= iv.last() {
                succ[axis] += iv.stride();
                self.next = Some(succ);
                break;
            }
            succ[axis] = iv.first();
        }
        Some(current)
    }
}

// ================================================================================================
// Tests
// ================================================================================================
