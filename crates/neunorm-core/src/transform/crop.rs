use tracing::info;

use crate::error::Result;
use crate::frame::Frame;
use crate::roi::Roi;
use crate::stack::ImageStack;

/// Restrict one frame to `roi`. The result remembers its detector origin,
/// so cropping again with the same ROI returns the frame unchanged.
pub fn crop_frame(frame: &Frame, roi: &Roi) -> Result<Frame> {
    let data = roi.view(frame)?.to_owned();
    let mut cropped = frame.derive(data);
    cropped.metadata.origin = (roi.x0, roi.y0);
    Ok(cropped)
}

/// Restrict every frame of a stack to `roi`.
///
/// Fails with `InvalidRoi` when the rectangle leaves the frames.
pub fn crop(stack: &ImageStack, roi: &Roi) -> Result<ImageStack> {
    if let Some(first) = stack.frames().first() {
        roi.local_bounds(first)?;
    }
    let cropped = stack.map_frames(|frame| crop_frame(frame, roi))?;
    info!(frames = stack.len(), %roi, "Stack cropped");
    Ok(cropped)
}
