use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::{NeunormError, Result};
use crate::frame::Frame;

/// Axis-aligned rectangle in detector coordinates, half-open:
/// columns `x0..x1`, rows `y0..y1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Roi {
    pub fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Result<Self> {
        let roi = Self { x0, y0, x1, y1 };
        roi.check_ordered()?;
        Ok(roi)
    }

    /// The ROI covering a whole frame, in that frame's detector coordinates.
    pub fn full_frame(frame: &Frame) -> Self {
        let (ox, oy) = frame.metadata.origin;
        Self {
            x0: ox,
            y0: oy,
            x1: ox + frame.width(),
            y1: oy + frame.height(),
        }
    }

    pub fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    fn check_ordered(&self) -> Result<()> {
        if self.x0 >= self.x1 || self.y0 >= self.y1 {
            return Err(NeunormError::InvalidRoi(format!(
                "{self} is empty (need x0 < x1 and y0 < y1)"
            )));
        }
        Ok(())
    }

    /// Row and column ranges of this ROI inside `frame`'s pixel array.
    ///
    /// Fails with `InvalidRoi` unless the rectangle lies fully inside the frame.
    pub fn local_bounds(&self, frame: &Frame) -> Result<(Range<usize>, Range<usize>)> {
        self.check_ordered()?;
        let (ox, oy) = frame.metadata.origin;
        let (h, w) = frame.shape();
        if self.x0 < ox || self.y0 < oy || self.x1 > ox + w || self.y1 > oy + h {
            return Err(NeunormError::InvalidRoi(format!(
                "{self} exceeds frame bounds ({}, {}, {}, {})",
                ox,
                oy,
                ox + w,
                oy + h
            )));
        }
        Ok((self.y0 - oy..self.y1 - oy, self.x0 - ox..self.x1 - ox))
    }

    /// Borrow the pixels of `frame` inside this ROI.
    pub fn view<'a>(&self, frame: &'a Frame) -> Result<ArrayView2<'a, f32>> {
        let (rows, cols) = self.local_bounds(frame)?;
        Ok(frame.data.slice(s![rows, cols]))
    }
}

impl fmt::Display for Roi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ROI({}, {}, {}, {})", self.x0, self.y0, self.x1, self.y1)
    }
}

/// Parses `"x0,y0,x1,y1"`.
impl FromStr for Roi {
    type Err = NeunormError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<usize> = s
            .split(',')
            .map(|p| p.trim().parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| NeunormError::InvalidRoi(format!("'{s}': {e}")))?;
        match parts[..] {
            [x0, y0, x1, y1] => Self::new(x0, y0, x1, y1),
            _ => Err(NeunormError::InvalidRoi(format!(
                "'{s}': expected four comma-separated values x0,y0,x1,y1"
            ))),
        }
    }
}
