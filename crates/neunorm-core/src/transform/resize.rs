use std::fmt;

use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{NeunormError, Result};
use crate::frame::Frame;
use crate::stack::ImageStack;

/// Resampling kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleMethod {
    /// Each output pixel collects the input area it covers. Total intensity
    /// is preserved, so binned data keeps count statistics.
    #[default]
    Area,
    /// Each output pixel copies the input pixel under its centre.
    Nearest,
}

impl fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Area => write!(f, "Area"),
            Self::Nearest => write!(f, "Nearest"),
        }
    }
}

/// Resample every frame to `(height, width)`.
///
/// Resampled frames get origin (0, 0): the detector pixel grid no longer
/// applies to them.
pub fn resize(
    stack: &ImageStack,
    target_shape: (usize, usize),
    method: ResampleMethod,
) -> Result<ImageStack> {
    let (height, width) = target_shape;
    if height == 0 || width == 0 {
        return Err(NeunormError::InvalidDimensions { width, height });
    }
    if let Some((h, w)) = stack.shape() {
        if h == 0 || w == 0 {
            return Err(NeunormError::InvalidDimensions {
                width: w,
                height: h,
            });
        }
    }

    let resized = stack.map_frames(|frame| {
        let data = match method {
            ResampleMethod::Area => area_resample(frame.data.view(), target_shape),
            ResampleMethod::Nearest => nearest_resample(frame.data.view(), target_shape),
        };
        Ok(resampled_frame(frame, data))
    })?;

    info!(
        frames = stack.len(),
        width,
        height,
        method = %method,
        "Stack resized"
    );
    Ok(resized)
}

/// Resample from pixel pitch `current` to pixel pitch `target`.
///
/// Each dimension becomes `round(dim * current / target)`, at least 1.
pub fn resize_to_pitch(
    stack: &ImageStack,
    current: f64,
    target: f64,
    method: ResampleMethod,
) -> Result<ImageStack> {
    for (name, pitch) in [("current", current), ("target", target)] {
        if !(pitch.is_finite() && pitch > 0.0) {
            return Err(NeunormError::InvalidParameter(format!(
                "{name} pixel pitch must be positive, got {pitch}"
            )));
        }
    }
    let Some((h, w)) = stack.shape() else {
        return Ok(stack.clone());
    };

    let scale = current / target;
    let scaled = |dim: usize| ((dim as f64 * scale).round() as usize).max(1);
    resize(stack, (scaled(h), scaled(w)), method)
}

/// Sum `factor x factor` pixel blocks. Rows and columns that do not fill a
/// whole block are dropped.
pub fn bin(stack: &ImageStack, factor: usize) -> Result<ImageStack> {
    if factor == 0 {
        return Err(NeunormError::InvalidParameter(
            "bin factor must be >= 1".into(),
        ));
    }
    let Some((h, w)) = stack.shape() else {
        return Ok(stack.clone());
    };
    let (bh, bw) = (h / factor, w / factor);
    if bh == 0 || bw == 0 {
        return Err(NeunormError::InvalidDimensions {
            width: bw,
            height: bh,
        });
    }

    let binned = stack.map_frames(|frame| {
        let trimmed = frame.data.slice(s![..bh * factor, ..bw * factor]);
        Ok(resampled_frame(frame, area_resample(trimmed, (bh, bw))))
    })?;
    info!(frames = stack.len(), factor, "Stack binned");
    Ok(binned)
}

fn resampled_frame(frame: &Frame, data: Array2<f32>) -> Frame {
    let mut out = frame.derive(data);
    out.metadata.origin = (0, 0);
    out.metadata.saturation = None;
    out
}

/// Sum-preserving resample. Each output cell adds up the input pixels it
/// covers, weighted by the covered fraction; columns are reduced first, then
/// rows.
fn area_resample(data: ArrayView2<'_, f32>, target_shape: (usize, usize)) -> Array2<f32> {
    let (h, w) = data.dim();
    let (th, tw) = target_shape;
    let row_spans = overlap_spans(h, th);
    let col_spans = overlap_spans(w, tw);

    let mut partial = Array2::<f32>::zeros((h, tw));
    for (mut out_row, in_row) in partial.rows_mut().into_iter().zip(data.rows()) {
        for (out, span) in out_row.iter_mut().zip(&col_spans) {
            *out = span
                .weights
                .iter()
                .enumerate()
                .map(|(k, &weight)| weight * in_row[span.first + k])
                .sum();
        }
    }

    let mut out = Array2::<f32>::zeros((th, tw));
    for (mut out_row, span) in out.rows_mut().into_iter().zip(&row_spans) {
        for (k, &weight) in span.weights.iter().enumerate() {
            out_row.scaled_add(weight, &partial.row(span.first + k));
        }
    }
    out
}

/// Input pixels covered by one output cell along an axis.
struct Span {
    first: usize,
    /// Covered length of pixels `first..`, in input-pixel units.
    weights: Vec<f32>,
}

/// One span per output cell; the weights of every input pixel sum to 1.
fn overlap_spans(n_in: usize, n_out: usize) -> Vec<Span> {
    let step = n_in as f64 / n_out as f64;
    (0..n_out)
        .map(|i| {
            let lo = i as f64 * step;
            let hi = (i + 1) as f64 * step;
            let first = (lo.floor() as usize).min(n_in - 1);
            let last = (hi.ceil() as usize).clamp(first + 1, n_in);
            let weights = (first..last)
                .map(|j| (hi.min((j + 1) as f64) - lo.max(j as f64)).max(0.0) as f32)
                .collect();
            Span { first, weights }
        })
        .collect()
}

fn nearest_resample(data: ArrayView2<'_, f32>, target_shape: (usize, usize)) -> Array2<f32> {
    let (h, w) = data.dim();
    let (th, tw) = target_shape;
    let source = |i: usize, n_in: usize, n_out: usize| {
        (((i as f64 + 0.5) * n_in as f64 / n_out as f64) as usize).min(n_in - 1)
    };
    Array2::from_shape_fn((th, tw), |(row, col)| {
        data[[source(row, h, th), source(col, w, tw)]]
    })
}
