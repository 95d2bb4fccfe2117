//! Error kinds produced by the floorplanner core.
//!
//! The source material this crate is derived from leans on broad
//! `try`/`except` blocks that silently swallow failures. We do not port that
//! pattern: every fallible boundary returns a [`FloorplanError`] instead.

use thiserror::Error;

/// All ways a pipeline stage or engine operation can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FloorplanError {
    /// The input JSON record is structurally invalid (missing fields, wrong
    /// types, malformed representation sections).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The block catalog contains no blocks at all.
    #[error("empty block set")]
    EmptyBlockSet,

    /// A representation or move referenced a block name the catalog does
    /// not know about.
    #[error("unknown block: {0}")]
    UnknownBlock(String),

    /// A variant has non-positive or non-finite width/height.
    #[error("malformed variant for block {block}: {reason}")]
    MalformedVariant { block: String, reason: String },

    /// A decode produced a numerically degenerate placement (e.g. zero-area
    /// bounding box, overflowing coordinate). Fatal at construction time;
    /// demoted to an infinite-fitness rejection inside the SA loop.
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// The driver was asked to stop via its cooperative cancellation token.
    /// Not a failure: callers surface this as a normal result record with
    /// `canceled: true`, never as an [`crate::io::ErrorRecord`].
    #[error("canceled")]
    Canceled,
}

pub type Result<T> = std::result::Result<T, FloorplanError>;
