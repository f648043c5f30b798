//! Error types for storage engine operations

use tessera_layout::LayoutError;

/// Result type for storage engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in storage engine operations.
///
/// Unlike layout configuration errors, the bounds-violation variants here
/// are deliberately catchable: test harnesses verify bounds checking works
/// without killing the process, and the variants carry enough detail to
/// report the offending access.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Stale or never-allocated arena handle
    #[error("invalid block handle: slot {index} generation {generation}")]
    InvalidHandle { index: u32, generation: u32 },

    /// Element access past the end of a buffer
    #[error("buffer access out of bounds: offset {offset} >= length {len}")]
    OutOfBounds { offset: usize, len: usize },

    /// Point access outside the block's domain
    #[error("point {point} is outside block domain {domain}")]
    PointOutsideBlock { point: String, domain: String },

    /// Scalar accessor used on an expanded block
    #[error("block is not compressed")]
    NotCompressed,

    /// Compression operation requested on a dense-only block
    #[error("block is dense and never compresses")]
    NotCompressible,

    /// A view region must lie inside the block it views
    #[error("view region {region} escapes block domain {domain}")]
    ViewOutsideBlock { region: String, domain: String },

    /// A fill request crossed contexts with no transport installed
    #[error("fill request from {from_patch} to {destination} crosses contexts and no transport is installed")]
    RemoteFill {
        from_patch: tessera_layout::PatchId,
        destination: tessera_layout::PatchId,
    },

    /// A patch named by the schedule has no storage block
    #[error("no storage block for {patch}")]
    MissingBlock { patch: tessera_layout::PatchId },

    /// Dynamic resize requires exclusive ownership of the layout
    #[error("layout is shared; dynamic resize requires exclusive ownership")]
    SharedLayout,

    /// Dynamic resize moves elements past patch ends, which guard margins
    /// would shadow
    #[error("dynamic resize requires a guardless layout")]
    GuardedDynamic,

    /// Layout error raised through a storage operation
    #[error(transparent)]
    Layout(#[from] LayoutError),
}
