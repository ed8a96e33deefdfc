use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{NeunormError, Result};
use crate::frame::Frame;

/// Reduce frames to their per-pixel median.
///
/// Uses `select_nth_unstable` for O(n) median without full sort.
/// Parallelizes at the row level for images >= 256x256.
pub fn median_stack(frames: &[Frame]) -> Result<Frame> {
    let first = frames.first().ok_or(NeunormError::EmptyStack("input"))?;

    let (h, w) = super::common_shape(frames)?;
    let n = frames.len();

    let data = if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        // Row-parallel: each row allocates its own pixel_values
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut pixel_values = vec![0.0f32; n];
                (0..w)
                    .map(|col| {
                        for (i, frame) in frames.iter().enumerate() {
                            pixel_values[i] = frame.data[[row, col]];
                        }
                        median_of(&mut pixel_values)
                    })
                    .collect()
            })
            .collect();

        let mut result = Array2::<f32>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        result
    } else {
        let mut result = Array2::<f32>::zeros((h, w));
        let mut pixel_values = vec![0.0f32; n];

        for row in 0..h {
            for col in 0..w {
                for (i, frame) in frames.iter().enumerate() {
                    pixel_values[i] = frame.data[[row, col]];
                }
                result[[row, col]] = median_of(&mut pixel_values);
            }
        }
        result
    };

    Ok(Frame::with_metadata(data, super::reduced_metadata(first, "median", n)))
}

/// Median of a scratch buffer; the buffer is reordered. Even lengths average
/// the two middle values. Returns 0 for an empty slice.
pub(crate) fn median_of(values: &mut [f32]) -> f32 {
    let n = values.len();
    if n == 0 {
        0.0
    } else if n == 1 {
        values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b)).1
    } else {
        let mid = n / 2;
        values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        let upper = values[mid];
        let lower = *values[..mid]
            .select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b))
            .1;
        (lower + upper) / 2.0
    }
}
