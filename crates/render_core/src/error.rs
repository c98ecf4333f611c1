//! Error types for the render core
//!
//! Every variant here is a broken contract on the caller's side (a malformed
//! camera, a zero cascade count, an arena that cannot be addressed). Callers
//! are expected to treat them as fatal. Degenerate but valid input such as a
//! zero-scale entity or an empty scene never produces an error.

use thiserror::Error;

/// Errors raised by the geometry arena
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// The arena was configured with a zero block size or vertex stride
    #[error("Invalid arena layout: block size {block_size}, stride {stride_bytes} bytes")]
    InvalidLayout {
        /// Vertices per block
        block_size: usize,
        /// Bytes per vertex
        stride_bytes: usize,
    },

    /// The arena was configured to grow by zero blocks
    #[error("Invalid arena growth: growth_blocks must be at least 1")]
    ZeroGrowth,

    /// The requested allocation cannot be addressed in a `usize` byte range
    #[error("Arena capacity overflow: cannot place {blocks} blocks past offset {offset}")]
    CapacityOverflow {
        /// Current high-water mark in bytes
        offset: usize,
        /// Blocks requested
        blocks: usize,
    },

    /// The allocation was made by a different arena
    #[error("Allocation belongs to buffer {found}, this arena owns buffer {expected}")]
    ForeignAllocation {
        /// Buffer owned by this arena
        expected: u32,
        /// Buffer named by the allocation
        found: u32,
    },

    /// Vertex data does not fit in the allocation it was written to
    #[error("Write of {bytes} bytes exceeds allocation of {capacity} bytes")]
    WriteOutOfBounds {
        /// Bytes supplied
        bytes: usize,
        /// Bytes covered by the allocation
        capacity: usize,
    },
}

/// Errors raised while partitioning a camera frustum into shadow cascades
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    /// At least one cascade is required
    #[error("Cascade count must be at least 1")]
    ZeroCascadeCount,

    /// Maximum shadow distance must be positive and finite
    #[error("Invalid maximum shadow distance: {0}")]
    InvalidShadowDistance(f32),

    /// The split scheme produced a boundary not beyond the previous one
    #[error("Split distance {distance} at boundary {index} does not increase")]
    NonIncreasingSplit {
        /// Boundary index, 1 is the far end of the first cascade
        index: usize,
        /// Offending distance
        distance: f32,
    },
}

/// Errors raised by the scene pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A camera component failed validation
    #[error("Invalid camera on entity {entity}: {reason}")]
    InvalidCamera {
        /// Debug name of the offending entity
        entity: String,
        /// What was wrong with it
        reason: String,
    },

    /// Cascade partitioning failed
    #[error("Cascade error: {0}")]
    Cascade(#[from] CascadeError),

    /// Arena operation failed
    #[error("Arena error: {0}")]
    Arena(#[from] ArenaError),
}
