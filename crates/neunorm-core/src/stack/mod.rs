pub mod mean;
pub mod median;

use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayView3, Axis};
use num_traits::{AsPrimitive, Bounded};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::consts::PARALLEL_FRAME_THRESHOLD;
use crate::error::{NeunormError, Result};
use crate::frame::{Frame, FrameMetadata};

use self::mean::mean_stack;
use self::median::median_stack;

/// How a multi-frame reference set is reduced to one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombineMode {
    #[default]
    Mean,
    Median,
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mean => write!(f, "Mean"),
            Self::Median => write!(f, "Median"),
        }
    }
}

impl FromStr for CombineMode {
    type Err = NeunormError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            other => Err(NeunormError::UnsupportedCombineMode(other.to_string())),
        }
    }
}

/// Ordered frames sharing one `(height, width)` shape and detector origin.
///
/// Used alike for sample, open-beam and dark-field acquisitions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageStack {
    frames: Vec<Frame>,
}

impl ImageStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stack, checking every frame against the first one's geometry.
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self> {
        let mut stack = Self {
            frames: Vec::with_capacity(frames.len()),
        };
        for frame in frames {
            stack.add(frame)?;
        }
        Ok(stack)
    }

    /// Split an `(n, height, width)` array into frames named `image_0001`, ...
    pub fn from_array3<T>(data: ArrayView3<'_, T>) -> Self
    where
        T: AsPrimitive<f32> + Bounded,
    {
        let frames = data
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(i, plane)| {
                let mut frame = Frame::from_counts(plane);
                frame.metadata.source = format!("image_{:04}", i + 1);
                frame
            })
            .collect();
        Self { frames }
    }

    /// Append a frame; its shape and detector origin must match the frames
    /// already present.
    pub fn add(&mut self, frame: Frame) -> Result<()> {
        if let Some(first) = self.frames.first() {
            first.check_same_geometry(&frame)?;
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `(height, width)` of the frames, `None` for an empty stack.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.frames.first().map(Frame::shape)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Shape of a stack that must hold at least one frame.
    /// `role` names the stack in the error ("sample", "open beam", ...).
    pub fn require_shape(&self, role: &'static str) -> Result<(usize, usize)> {
        self.shape().ok_or(NeunormError::EmptyStack(role))
    }

    /// Elementwise mean of all frames, in floating point.
    pub fn average(&self) -> Result<Frame> {
        mean_stack(&self.frames)
    }

    /// Reduce the stack to one reference frame.
    pub fn combine(&self, mode: CombineMode) -> Result<Frame> {
        match mode {
            CombineMode::Mean => mean_stack(&self.frames),
            CombineMode::Median => median_stack(&self.frames),
        }
    }

    /// Apply a per-frame transform, producing a new stack in the same order.
    ///
    /// Frames are processed in parallel once the stack is large enough.
    pub fn map_frames<F>(&self, f: F) -> Result<ImageStack>
    where
        F: Fn(&Frame) -> Result<Frame> + Sync,
    {
        self.map_frames_indexed(|_, frame| f(frame))
    }

    /// Like [`map_frames`](Self::map_frames), also passing each frame's index.
    pub fn map_frames_indexed<F>(&self, f: F) -> Result<ImageStack>
    where
        F: Fn(usize, &Frame) -> Result<Frame> + Sync,
    {
        let frames: Vec<Frame> = if self.frames.len() >= PARALLEL_FRAME_THRESHOLD {
            self.frames
                .par_iter()
                .enumerate()
                .map(|(i, frame)| f(i, frame))
                .collect::<Result<_>>()?
        } else {
            self.frames
                .iter()
                .enumerate()
                .map(|(i, frame)| f(i, frame))
                .collect::<Result<_>>()?
        };
        Self::from_frames(frames)
    }
}

impl<'a> IntoIterator for &'a ImageStack {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Shape shared by all frames of a slice.
pub(crate) fn common_shape(frames: &[Frame]) -> Result<(usize, usize)> {
    let expected = frames
        .first()
        .map(Frame::shape)
        .ok_or(NeunormError::EmptyStack("input"))?;
    match frames.iter().map(Frame::shape).find(|s| *s != expected) {
        Some(found) => Err(NeunormError::ShapeMismatch { expected, found }),
        None => Ok(expected),
    }
}

/// Metadata for a frame reduced from several acquisitions: geometry and
/// saturation come from the first frame, there is no single timestamp.
pub(crate) fn reduced_metadata(first: &Frame, method: &str, count: usize) -> FrameMetadata {
    FrameMetadata {
        source: format!("{method} of {count} frames"),
        timestamp_us: None,
        origin: first.metadata.origin,
        saturation: first.metadata.saturation,
    }
}
