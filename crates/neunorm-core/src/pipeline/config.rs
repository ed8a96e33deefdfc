use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filters::gamma::GammaFilterParams;
use crate::roi::Roi;
use crate::stack::{CombineMode, ImageStack};
use crate::transform::resize::{bin, resize, resize_to_pitch, ResampleMethod};

/// Full configuration of one normalization run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Remove gamma spikes from sample, open-beam and dark-field frames first.
    pub use_gamma_filter: bool,
    pub gamma: GammaFilterParams,
    pub ob_reduction: ReferenceReduction,
    pub df_reduction: CombineMode,
    /// Open-beam regions used for background matching; empty disables it.
    pub rois: Vec<Roi>,
    /// Crop applied to the normalized stack.
    pub crop: Option<Roi>,
    /// Resampling applied after the crop.
    pub resize: Option<ResizeConfig>,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            use_gamma_filter: true,
            gamma: GammaFilterParams::default(),
            ob_reduction: ReferenceReduction::default(),
            df_reduction: CombineMode::default(),
            rois: Vec::new(),
            crop: None,
            resize: None,
        }
    }
}

/// How open-beam frames are turned into the denominator reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceReduction {
    /// One reference frame, the per-pixel mean of all open beams.
    #[default]
    Mean,
    /// One reference frame, the per-pixel median of all open beams.
    Median,
    /// Sample `i` is divided by open beam `i`; counts must match.
    Paired,
}

impl fmt::Display for ReferenceReduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "Mean"),
            Self::Median => write!(f, "Median"),
            Self::Paired => write!(f, "Paired"),
        }
    }
}

/// Resampling step applied to the normalized stack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ResizeConfig {
    /// Resample to an explicit `(height, width)`.
    Shape {
        height: usize,
        width: usize,
        method: ResampleMethod,
    },
    /// Resample from one pixel pitch to another (same unit for both).
    Pitch {
        current: f64,
        target: f64,
        method: ResampleMethod,
    },
    /// Integer binning by `factor` in both directions.
    Bin { factor: usize },
}

impl ResizeConfig {
    pub fn apply(&self, stack: &ImageStack) -> Result<ImageStack> {
        match *self {
            Self::Shape {
                height,
                width,
                method,
            } => resize(stack, (height, width), method),
            Self::Pitch {
                current,
                target,
                method,
            } => resize_to_pitch(stack, current, target, method),
            Self::Bin { factor } => bin(stack, factor),
        }
    }
}

impl fmt::Display for ResizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape {
                height,
                width,
                method,
            } => write!(f, "{width}x{height} ({method})"),
            Self::Pitch {
                current,
                target,
                method,
            } => write!(f, "pitch {current} -> {target} ({method})"),
            Self::Bin { factor } => write!(f, "bin {factor}x{factor}"),
        }
    }
}
