//! # tessera-domain - Index Space Primitives
//!
//! Foundational descriptors for every other Tessera crate: strided integer
//! intervals ([`Interval`]) and their multi-axis products ([`Domain`]).
//!
//! A `Domain` describes a rectangular region of a global index space. The
//! partitioner cuts domains into patch-owned sub-domains, the layout answers
//! intersection queries over them, and the storage engine uses them to map
//! index points onto buffer offsets. Everything here is plain value-type
//! arithmetic: no allocation beyond the axis vector, no interior mutability.
//!
//! ## Example
//!
//! ```
//! use tessera_domain::Domain;
//!
//! // A 9x9 zero-based domain.
//! let global = Domain::rect(&[(0, 8), (0, 8)]);
//! assert_eq!(global.size(), 81);
//!
//! // Intersections clip to the common region.
//! let query = Domain::rect(&[(6, 12), (-3, 2)]);
//! let clipped = global.intersect(&query);
//! assert_eq!(clipped, Domain::rect(&[(6, 8), (0, 2)]));
//! ```

pub mod domain;
pub mod interval;

pub use domain::{Domain, PointIter};
pub use interval::Interval;
