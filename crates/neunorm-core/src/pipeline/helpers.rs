use ndarray::{Array2, Zip};

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{NeunormError, Result};
use crate::frame::Frame;
use crate::stack::ImageStack;

/// `minuend - subtrahend`, keeping the minuend's metadata.
pub fn subtract(minuend: &Frame, subtrahend: &Frame) -> Result<Frame> {
    minuend.check_same_geometry(subtrahend)?;
    Ok(minuend.derive(&minuend.data - &subtrahend.data))
}

/// Subtract one dark-field reference from every frame of a stack.
pub fn dark_field_correction(stack: &ImageStack, df_reference: &Frame) -> Result<ImageStack> {
    stack.map_frames(|frame| subtract(frame, df_reference))
}

/// Pixelwise `numerator / denominator`.
///
/// A pixel whose denominator is not positive is a dead or saturated detector
/// region and yields 0, as does any non-finite quotient.
pub fn divide_guarded(numerator: &Array2<f32>, denominator: &Array2<f32>) -> Result<Array2<f32>> {
    if numerator.dim() != denominator.dim() {
        return Err(NeunormError::ShapeMismatch {
            expected: numerator.dim(),
            found: denominator.dim(),
        });
    }

    let divide = |&n: &f32, &d: &f32| {
        if d > 0.0 {
            let q = n / d;
            if q.is_finite() {
                q
            } else {
                0.0
            }
        } else {
            0.0
        }
    };

    let zip = Zip::from(numerator).and(denominator);
    Ok(if numerator.len() >= PARALLEL_PIXEL_THRESHOLD {
        zip.par_map_collect(divide)
    } else {
        zip.map_collect(divide)
    })
}
