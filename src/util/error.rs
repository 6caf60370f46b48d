//! Error types for iriscode.

use thiserror::Error;

/// Result alias for iriscode operations.
pub type IrisCodeResult<T> = std::result::Result<T, IrisCodeError>;

/// Errors that can occur when building or comparing iris templates.
///
/// Degenerate overlap between two templates (zero jointly-valid bits) is not
/// an error; distance functions report it in-band via
/// [`DistanceScore::valid`](crate::distance::DistanceScore).
#[derive(Debug, Error)]
pub enum IrisCodeError {
    /// Grid width or height is zero or overflows.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the grid width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// The backing buffer is too small for the requested shape.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// An index is out of range for the named collection.
    #[error("{context} index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// Two planes that must be compared do not have the same shape.
    #[error("shape mismatch: {left_width}x{left_height} vs {right_width}x{right_height}")]
    ShapeMismatch {
        left_width: usize,
        left_height: usize,
        right_width: usize,
        right_height: usize,
    },
    /// A numeric parameter is outside its documented range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    /// A distance metric name is not one of the supported family.
    #[error("unknown metric name: {name:?}")]
    UnknownMetric { name: String },
    /// An enrollment raster could not be loaded or decoded.
    #[error("image i/o error: {reason}")]
    ImageIo { reason: String },
}
