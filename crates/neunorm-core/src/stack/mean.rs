use ndarray::Array2;

use crate::error::{NeunormError, Result};
use crate::frame::Frame;

/// Reduce frames to their per-pixel mean.
///
/// Accumulates in f64 so long integer-count stacks do not lose precision.
pub fn mean_stack(frames: &[Frame]) -> Result<Frame> {
    let first = frames.first().ok_or(NeunormError::EmptyStack("input"))?;

    let (h, w) = super::common_shape(frames)?;
    let n = frames.len() as f64;

    let mut sum = Array2::<f64>::zeros((h, w));

    for frame in frames {
        sum.zip_mut_with(&frame.data, |acc, &v| *acc += v as f64);
    }

    let mean = sum.mapv(|v| (v / n) as f32);
    Ok(Frame::with_metadata(mean, super::reduced_metadata(first, "mean", frames.len())))
}
