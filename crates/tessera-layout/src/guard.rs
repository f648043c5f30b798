//! Guard layers and the guard-fill schedule
//!
//! Every patch allocates a margin of guard (halo) cells around the domain it
//! owns. [`GuardLayers`] describes the margin widths; [`GuardSchedule`] is
//! the derived list of copies that makes each guard cell a replica of the
//! owning patch's value.
//!
//! The schedule is computed once per layout topology and cached: for each
//! patch, the guard margin is decomposed into disjoint per-axis faces, each
//! face (and, under periodic boundary conditions, its wrapped image) is
//! intersected against every owned domain, and each non-empty intersection
//! becomes one [`FillRequest`].

use crate::node::{Node, PatchId};
use std::fmt;
use tessera_domain::{Domain, Interval};

/// Guard margin widths, per axis and per side.
///
/// Internal widths apply where a patch face borders another patch; external
/// widths apply where it lies on the global domain boundary. Under periodic
/// boundary conditions the external margin is filled with wrapped data, so
/// its width participates in schedule construction like an internal one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardLayers {
    internal_lower: Vec<usize>,
    internal_upper: Vec<usize>,
    external_lower: Vec<usize>,
    external_upper: Vec<usize>,
}

impl GuardLayers {
    /// No guards on any axis.
    pub fn none(dim: usize) -> Self {
        Self::uniform(dim, 0, 0)
    }

    /// The same `internal` and `external` width on every axis and side.
    pub fn uniform(dim: usize, internal: usize, external: usize) -> Self {
        Self {
            internal_lower: vec![internal; dim],
            internal_upper: vec![internal; dim],
            external_lower: vec![external; dim],
            external_upper: vec![external; dim],
        }
    }

    /// Fully explicit widths. All four vectors must share one length.
    pub fn with_widths(
        internal_lower: Vec<usize>,
        internal_upper: Vec<usize>,
        external_lower: Vec<usize>,
        external_upper: Vec<usize>,
    ) -> Self {
        let dim = internal_lower.len();
        assert!(
            internal_upper.len() == dim && external_lower.len() == dim && external_upper.len() == dim,
            "guard width vectors must agree on dimensionality"
        );
        Self {
            internal_lower,
            internal_upper,
            external_lower,
            external_upper,
        }
    }

    /// Number of axes described.
    pub fn dim(&self) -> usize {
        self.internal_lower.len()
    }

    /// Internal width on the lower side of `axis`.
    pub fn internal_lower(&self, axis: usize) -> usize {
        self.internal_lower[axis]
    }

    /// Internal width on the upper side of `axis`.
    pub fn internal_upper(&self, axis: usize) -> usize {
        self.internal_upper[axis]
    }

    /// External width on the lower side of `axis`.
    pub fn external_lower(&self, axis: usize) -> usize {
        self.external_lower[axis]
    }

    /// External width on the upper side of `axis`.
    pub fn external_upper(&self, axis: usize) -> usize {
        self.external_upper[axis]
    }

    /// Widest guard depth along `axis` that can pull from a neighbor.
    pub(crate) fn max_fill_depth(&self, axis: usize, periodic: bool) -> usize {
        let mut depth = self.internal_lower[axis].max(self.internal_upper[axis]);
        if periodic {
            depth = depth
                .max(self.external_lower[axis])
                .max(self.external_upper[axis]);
        }
        depth
    }

    /// Expand `owned` by the applicable guard width on each face.
    ///
    /// Faces flush with the global boundary take the external width, all
    /// others the internal width.
    pub fn allocate(&self, owned: &Domain, global: &Domain) -> Domain {
        let lo: Vec<usize> = (0..owned.dim())
            .map(|a| {
                if owned.axis(a).first() == global.axis(a).first() {
                    self.external_lower[a]
                } else {
                    self.internal_lower[a]
                }
            })
            .collect();
        let hi: Vec<usize> = (0..owned.dim())
            .map(|a| {
                if owned.axis(a).last() == global.axis(a).last() {
                    self.external_upper[a]
                } else {
                    self.internal_upper[a]
                }
            })
            .collect();
        owned.grow(&lo, &hi)
    }
}

/// One copy of the guard-fill schedule.
///
/// `region` is expressed in the source patch's owned coordinates; the
/// matching destination guard cells sit at `region` translated by `offset`.
/// The offset is zero except for periodic wrap-around images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillRequest {
    pub source: PatchId,
    pub destination: PatchId,
    pub region: Domain,
    pub offset: Vec<i64>,
}

impl FillRequest {
    /// The destination guard region, in the destination's coordinates.
    pub fn destination_region(&self) -> Domain {
        self.region.translate(&self.offset)
    }

    /// True when this request wraps around a periodic boundary.
    pub fn is_wrapped(&self) -> bool {
        self.offset.iter().any(|&o| o != 0)
    }
}

impl fmt::Display for FillRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} over {}", self.source, self.destination, self.region)?;
        if self.is_wrapped() {
            write!(f, " (wrapped)")?;
        }
        Ok(())
    }
}

/// The cached guard-fill schedule of one layout topology.
///
/// Requests are ordered by (source, destination) so consumers can process
/// all of one source's requests contiguously and then clear its dirty flag.
#[derive(Debug, Clone, Default)]
pub struct GuardSchedule {
    requests: Vec<FillRequest>,
}

impl GuardSchedule {
    /// All fill requests, ordered by (source, destination).
    pub fn requests(&self) -> &[FillRequest] {
        &self.requests
    }

    /// Number of fill requests.
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// True when no guard traffic is required.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Iterate over the requests in schedule order.
    pub fn iter(&self) -> std::slice::Iter<'_, FillRequest> {
        self.requests.iter()
    }
}

/// Decompose `allocated` minus `owned` into disjoint rectangular faces.
///
/// For axis `a`, the lower/upper strips run the owned extent on axes before
/// `a` and the allocated extent on axes after it, so the strips tile the
/// guard margin without overlap (corners belong to the highest axis).
pub(crate) fn guard_faces(owned: &Domain, allocated: &Domain) -> Vec<Domain> {
    let dim = owned.dim();
    let mut faces = Vec::new();
    for a in 0..dim {
        let own = owned.axis(a);
        let alloc = allocated.axis(a);
        for strip in [
            Interval::new(alloc.first(), own.first() - 1),
            Interval::new(own.last() + 1, alloc.last()),
        ] {
            if strip.is_empty() {
                continue;
            }
            let axes: Vec<Interval> = (0..dim)
                .map(|b| match b.cmp(&a) {
                    std::cmp::Ordering::Less => owned.axis(b),
                    std::cmp::Ordering::Equal => strip,
                    std::cmp::Ordering::Greater => allocated.axis(b),
                })
                .collect();
            faces.push(Domain::new(axes));
        }
    }
    faces
}

/// Build the guard-fill schedule for a validated patch list.
///
/// For every patch's guard faces, each periodic image of the face is
/// intersected against every owned domain; non-empty intersections become
/// fill requests. Guard-width and dimensionality validation has already
/// happened at layout construction, so building cannot fail.
pub(crate) fn build_schedule(global: &Domain, nodes: &[Node], periodic: &[bool]) -> GuardSchedule {
    debug_assert_eq!(periodic.len(), global.dim());

    let mut requests = Vec::new();
    for dest in nodes {
        for face in guard_faces(dest.owned(), dest.allocated()) {
            for shift in periodic_shifts(&face, global, periodic) {
                let image = face.translate(&shift);
                for source in nodes {
                    let overlap = image.intersect(source.owned());
                    if overlap.is_empty() {
                        continue;
                    }
                    let offset: Vec<i64> = shift.iter().map(|&s| -s).collect();
                    requests.push(FillRequest {
                        source: source.id(),
                        destination: dest.id(),
                        region: overlap,
                        offset,
                    });
                }
            }
        }
    }

    requests.sort_by_key(|r| (r.source, r.destination));
    tracing::debug!(
        patches = nodes.len(),
        requests = requests.len(),
        "built guard-fill schedule"
    );
    GuardSchedule { requests }
}

/// Enumerate the translation vectors under which `face` can land on owned
/// data: the identity, plus one global-extent wrap per periodic axis the
/// face escapes, and their combinations.
fn periodic_shifts(face: &Domain, global: &Domain, periodic: &[bool]) -> Vec<Vec<i64>> {
    let dim = global.dim();
    let mut per_axis: Vec<Vec<i64>> = Vec::with_capacity(dim);
    for a in 0..dim {
        let mut options = vec![0i64];
        if periodic[a] {
            let extent = global.axis(a).size() as i64;
            if face.axis(a).first() < global.axis(a).first() {
                options.push(extent);
            }
            if face.axis(a).last() > global.axis(a).last() {
                options.push(-extent);
            }
        }
        per_axis.push(options);
    }

    // Cartesian product of the per-axis options.
    let mut shifts: Vec<Vec<i64>> = vec![Vec::new()];
    for options in per_axis {
        let mut next = Vec::with_capacity(shifts.len() * options.len());
        for prefix in &shifts {
            for &opt in &options {
                let mut v = prefix.clone();
                v.push(opt);
                next.push(v);
            }
        }
        shifts = next;
    }
    shifts
}

// ================================================================================================
// Tests
// ================================================================================================
