//! ROI-based background matching.
//!
//! A normalized frame can still carry a global scale error when the sample
//! and open-beam acquisitions saw different flux or exposure. A region known
//! to contain no sample (open beam in both images) measures that mismatch
//! as a single ratio, which then rescales the whole frame.

use tracing::debug;

use crate::error::{NeunormError, Result};
use crate::frame::Frame;
use crate::roi::Roi;

/// Mean of `frame` over `roi`.
pub fn roi_mean(frame: &Frame, roi: &Roi) -> Result<f64> {
    pooled_mean(frame, std::slice::from_ref(roi))
}

/// Mean over several ROIs taken together: total counts divided by total
/// pixel count. Pixels covered by two ROIs count twice.
pub fn pooled_mean(frame: &Frame, rois: &[Roi]) -> Result<f64> {
    if rois.is_empty() {
        return Err(NeunormError::InvalidRoi("no ROI given".into()));
    }

    let mut total = 0.0f64;
    let mut pixels = 0usize;
    for roi in rois {
        let view = roi.view(frame)?;
        total += view.iter().map(|&v| v as f64).sum::<f64>();
        pixels += view.len();
    }
    Ok(total / pixels as f64)
}

/// Ratio `mean(sample over roi) / mean(open beam over roi)`.
pub fn compute_ratio(sample: &Frame, ob_reference: &Frame, roi: &Roi) -> Result<f32> {
    compute_ratio_multi(sample, ob_reference, std::slice::from_ref(roi))
}

/// Ratio of pooled ROI means, for callers matching against several regions.
///
/// Fails with `DegenerateRoi` when the open-beam mean is zero or not finite.
pub fn compute_ratio_multi(sample: &Frame, ob_reference: &Frame, rois: &[Roi]) -> Result<f32> {
    // Validate against both frames before reading either.
    for roi in rois {
        roi.local_bounds(sample)?;
        roi.local_bounds(ob_reference)?;
    }

    let ob_mean = pooled_mean(ob_reference, rois)?;
    if ob_mean == 0.0 || !ob_mean.is_finite() {
        return Err(NeunormError::DegenerateRoi(format!(
            "open beam {}",
            describe(rois)
        )));
    }
    let sample_mean = pooled_mean(sample, rois)?;
    let ratio = (sample_mean / ob_mean) as f32;

    debug!(
        source = %sample.metadata.source,
        sample_mean,
        ob_mean,
        ratio,
        "ROI background ratio"
    );
    Ok(ratio)
}

/// Multiply every pixel of `frame` by `ratio`.
pub fn apply_ratio(frame: &Frame, ratio: f32) -> Frame {
    frame.derive(frame.data.mapv(|v| v * ratio))
}

pub(crate) fn describe(rois: &[Roi]) -> String {
    rois.iter()
        .map(Roi::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
