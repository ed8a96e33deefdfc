use std::fmt;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::consts::{
    DEFAULT_GAMMA_MEDIAN_FACTOR, DEFAULT_GAMMA_RADIUS, MAD_TO_SIGMA, PARALLEL_PIXEL_THRESHOLD,
    SATURATION_MARGIN,
};
use crate::error::{NeunormError, Result};
use crate::frame::Frame;
use crate::stack::median::median_of;
use crate::stack::ImageStack;

/// Rule deciding whether a pixel is a gamma hit.
///
/// All local statistics use the window around the pixel with the pixel
/// itself left out.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GammaRule {
    /// Flag `v > factor * median` (median must be positive, `factor > 1`).
    LocalMedian { factor: f32 },
    /// Flag `v - median > sigma * 1.4826 * MAD`. With a zero MAD any pixel
    /// above the median is flagged.
    LocalSigma { sigma: f32 },
    /// Flag pixels within 5 counts of `max_value`, or of the frame's integer
    /// saturation value when `max_value` is `None`. Float frames without an
    /// explicit `max_value` are left alone.
    Saturation { max_value: Option<f32> },
    /// Flag `threshold * v > frame mean`, with `0 < threshold <= 1`. Cheap,
    /// but a bright region of the object can be taken for gamma hits.
    GlobalMean { threshold: f32 },
}

impl Default for GammaRule {
    fn default() -> Self {
        Self::LocalMedian {
            factor: DEFAULT_GAMMA_MEDIAN_FACTOR,
        }
    }
}

impl fmt::Display for GammaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalMedian { factor } => write!(f, "Local median (x{factor})"),
            Self::LocalSigma { sigma } => write!(f, "Local sigma ({sigma} sigma)"),
            Self::Saturation { max_value: None } => write!(f, "Saturation"),
            Self::Saturation {
                max_value: Some(max),
            } => write!(f, "Saturation (max {max})"),
            Self::GlobalMean { threshold } => write!(f, "Global mean (x{threshold})"),
        }
    }
}

/// Parameters for gamma spike removal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GammaFilterParams {
    /// Window radius; the neighbourhood is (2r+1)x(2r+1) clamped to the frame.
    pub radius: usize,
    pub rule: GammaRule,
}

impl Default for GammaFilterParams {
    fn default() -> Self {
        Self {
            radius: DEFAULT_GAMMA_RADIUS,
            rule: GammaRule::default(),
        }
    }
}

impl GammaFilterParams {
    pub fn validate(&self) -> Result<()> {
        if self.radius == 0 {
            return Err(NeunormError::InvalidParameter(
                "gamma filter radius must be >= 1".into(),
            ));
        }
        match self.rule {
            GammaRule::LocalMedian { factor } if factor.is_nan() || factor <= 1.0 => {
                Err(NeunormError::InvalidParameter(format!(
                    "local median factor must be > 1, got {factor}"
                )))
            }
            GammaRule::LocalSigma { sigma } if sigma.is_nan() || sigma <= 0.0 => {
                Err(NeunormError::InvalidParameter(format!(
                    "local sigma threshold must be > 0, got {sigma}"
                )))
            }
            GammaRule::Saturation {
                max_value: Some(max),
            } if !max.is_finite() => Err(NeunormError::InvalidParameter(format!(
                "saturation value must be finite, got {max}"
            ))),
            GammaRule::GlobalMean { threshold } if !(threshold > 0.0 && threshold <= 1.0) => {
                Err(NeunormError::InvalidParameter(format!(
                    "global mean threshold must be in (0, 1], got {threshold}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A filtered frame and the number of pixels that were replaced.
#[derive(Clone, Debug)]
pub struct GammaFiltered {
    pub frame: Frame,
    pub replaced: usize,
}

/// Replace gamma hits in one frame by the median of their neighbourhood.
///
/// Flags and medians are computed on the input, so the scan order does not
/// matter. Clusters wider than the window can survive one pass; run the
/// filter again to remove them.
pub fn gamma_filter(frame: &Frame, params: &GammaFilterParams) -> Result<GammaFiltered> {
    params.validate()?;

    let cutoff = match params.rule {
        GammaRule::Saturation { max_value } => match max_value.or(frame.metadata.saturation) {
            Some(max) => Some(max - SATURATION_MARGIN),
            None => {
                debug!(
                    source = %frame.metadata.source,
                    "No integer saturation value, skipping gamma filter"
                );
                return Ok(GammaFiltered {
                    frame: frame.clone(),
                    replaced: 0,
                });
            }
        },
        GammaRule::GlobalMean { threshold } => {
            let mean = frame.data.iter().map(|&v| v as f64).sum::<f64>()
                / frame.data.len().max(1) as f64;
            Some((mean / threshold as f64) as f32)
        }
        _ => None,
    };

    let data = &frame.data;
    let (h, w) = data.dim();
    let filter = RowFilter {
        data,
        radius: params.radius,
        rule: params.rule,
        cutoff,
    };

    let rows: Vec<(Vec<f32>, usize)> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(|row| filter.run(row)).collect()
    } else {
        (0..h).map(|row| filter.run(row)).collect()
    };

    let mut result = Array2::<f32>::zeros((h, w));
    let mut replaced = 0;
    for (row, (row_data, count)) in rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            result[[row, col]] = val;
        }
        replaced += count;
    }

    if replaced > 0 {
        debug!(source = %frame.metadata.source, replaced, "Gamma pixels replaced");
    }

    Ok(GammaFiltered {
        frame: frame.derive(result),
        replaced,
    })
}

/// Gamma-filter every frame of a stack.
pub fn gamma_filter_stack(stack: &ImageStack, params: &GammaFilterParams) -> Result<ImageStack> {
    params.validate()?;
    let filtered = stack.map_frames(|frame| gamma_filter(frame, params).map(|g| g.frame))?;
    info!(frames = stack.len(), rule = %params.rule, "Gamma filter applied");
    Ok(filtered)
}

struct RowFilter<'a> {
    data: &'a Array2<f32>,
    radius: usize,
    rule: GammaRule,
    /// Fixed flagging level for the frame-wide rules.
    cutoff: Option<f32>,
}

impl RowFilter<'_> {
    fn run(&self, row: usize) -> (Vec<f32>, usize) {
        let (h, w) = self.data.dim();
        let r = self.radius;
        let row_lo = row.saturating_sub(r);
        let row_hi = (row + r).min(h - 1);

        let side = 2 * r + 1;
        let mut window = Vec::with_capacity(side * side);
        let mut deviations = Vec::with_capacity(side * side);
        let mut out = Vec::with_capacity(w);
        let mut replaced = 0;

        for col in 0..w {
            let v = self.data[[row, col]];

            // Frame-wide rules only need the window for pixels they flag.
            if let Some(limit) = self.cutoff {
                if v <= limit {
                    out.push(v);
                    continue;
                }
            }

            window.clear();
            let col_lo = col.saturating_sub(r);
            let col_hi = (col + r).min(w - 1);
            for y in row_lo..=row_hi {
                for x in col_lo..=col_hi {
                    if y != row || x != col {
                        window.push(self.data[[y, x]]);
                    }
                }
            }

            if window.is_empty() {
                out.push(v);
                continue;
            }

            let median = median_of(&mut window);
            let flagged = match self.rule {
                GammaRule::LocalMedian { factor } => median > 0.0 && v > factor * median,
                GammaRule::LocalSigma { sigma } => {
                    deviations.clear();
                    deviations.extend(window.iter().map(|&n| (n - median).abs()));
                    let mad = median_of(&mut deviations);
                    if mad > 0.0 {
                        v - median > sigma * MAD_TO_SIGMA * mad
                    } else {
                        v > median
                    }
                }
                GammaRule::Saturation { .. } | GammaRule::GlobalMean { .. } => true,
            };

            if flagged {
                out.push(median);
                replaced += 1;
            } else {
                out.push(v);
            }
        }

        (out, replaced)
    }
}
