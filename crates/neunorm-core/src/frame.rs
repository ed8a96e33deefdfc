use ndarray::{Array2, ArrayView2};
use num_traits::{AsPrimitive, Bounded};

use crate::error::{NeunormError, Result};

/// A single radiograph.
/// Pixel values are raw counts converted to f32; normalized frames hold
/// transmission ratios that may exceed 1 or go negative.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    pub metadata: FrameMetadata,
}

impl Frame {
    pub fn new(data: Array2<f32>) -> Self {
        Self {
            data,
            metadata: FrameMetadata::default(),
        }
    }

    pub fn with_metadata(data: Array2<f32>, metadata: FrameMetadata) -> Self {
        Self { data, metadata }
    }

    /// Build a frame from an array of any primitive numeric type.
    ///
    /// The conversion to f32 happens here once. The largest value of `T`
    /// is recorded as the saturation count unless `T` is a float type.
    pub fn from_counts<T>(counts: ArrayView2<'_, T>) -> Self
    where
        T: AsPrimitive<f32> + Bounded,
    {
        let max: f32 = T::max_value().as_();
        let metadata = FrameMetadata {
            saturation: (max.is_finite() && max < f32::MAX).then_some(max),
            ..Default::default()
        };
        Self {
            data: counts.mapv(|v| v.as_()),
            metadata,
        }
    }

    /// A new frame carrying this frame's metadata, for stage outputs.
    pub fn derive(&self, data: Array2<f32>) -> Self {
        Self {
            data,
            metadata: self.metadata.clone(),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// `(height, width)`, matching ndarray's `dim()`.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Fails unless `other` covers the same detector pixels: same shape and
    /// same origin.
    pub fn check_same_geometry(&self, other: &Frame) -> Result<()> {
        if other.shape() != self.shape() {
            return Err(NeunormError::ShapeMismatch {
                expected: self.shape(),
                found: other.shape(),
            });
        }
        if other.metadata.origin != self.metadata.origin {
            return Err(NeunormError::OriginMismatch {
                expected: self.metadata.origin,
                found: other.metadata.origin,
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameMetadata {
    /// Source identifier, usually the file name.
    pub source: String,
    /// Acquisition time in microseconds since the Unix epoch.
    pub timestamp_us: Option<u64>,
    /// Detector coordinate `(x, y)` of the top-left pixel.
    pub origin: (usize, usize),
    /// Largest count the acquisition type can hold, if integer.
    pub saturation: Option<f32>,
}

impl FrameMetadata {
    pub fn named(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }
}
