//! Error types for layout construction and queries

/// Result type for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors raised while building or mutating a layout.
///
/// Every variant here is a configuration error in the sense of the error
/// taxonomy: it indicates an invalid decomposition request and is fatal by
/// contract. Callers are expected to abort with the diagnostic, not to retry
/// with different inputs at runtime.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// A uniform-block partition asked for zero blocks along an axis
    #[error("zero block count on axis {axis}")]
    ZeroBlockCount { axis: usize },

    /// A uniform-block partition asked for more blocks than the axis has cells
    #[error("axis {axis} has {cells} cells but {blocks} blocks were requested")]
    MoreBlocksThanCells {
        axis: usize,
        blocks: usize,
        cells: usize,
    },

    /// Grid breakpoints must be strictly increasing and interior to the axis
    #[error("non-monotonic or out-of-range breakpoint {value} on axis {axis}")]
    BadBreakpoint { axis: usize, value: i64 },

    /// Two tiles of a tile-list partition share at least one point
    #[error("overlapping tiles: tile {first} and tile {second}")]
    OverlappingTiles { first: usize, second: usize },

    /// A tile or patch extends outside the global domain
    #[error("patch domain {patch} escapes the global domain {global}")]
    PatchOutsideGlobal { patch: String, global: String },

    /// Guard width along an axis exceeds the smallest neighboring patch
    #[error("guard width {guard} on axis {axis} exceeds smallest patch extent {extent}")]
    GuardWiderThanPatch {
        axis: usize,
        guard: usize,
        extent: usize,
    },

    /// Policy dimensionality does not match the global domain
    #[error("policy describes {policy} axes but the global domain has {domain}")]
    DimensionMismatch { policy: usize, domain: usize },

    /// The global domain holds no points
    #[error("cannot partition an empty global domain")]
    EmptyGlobalDomain,

    /// Context mapping needs at least one context
    #[error("context count must be positive")]
    ZeroContexts,

    /// An affinity policy produced an incomplete or out-of-range assignment
    #[error("affinity policy produced a bad assignment: {0}")]
    BadAffinityAssignment(String),

    /// Dynamic resize was requested on a non-dynamic layout
    #[error("layout was not built with the dynamic policy")]
    NotDynamic,

    /// Dynamic destroy named points outside the patch's owned domain
    #[error("destroy region {region} is not owned by patch {patch}")]
    DestroyOutsidePatch { patch: u32, region: String },

    /// An explicit patch list referenced no patches
    #[error("explicit patch list is empty")]
    EmptyPatchList,

    /// A view slice referenced an axis the layout does not have
    #[error("axis {axis} out of range for a {dim}-dimensional layout")]
    AxisOutOfRange { axis: usize, dim: usize },

    /// A view window or slice coordinate falls outside the viewed region
    #[error("view coordinate {coord} on axis {axis} is outside the viewed region")]
    SliceOutsideView { axis: usize, coord: i64 },
}
