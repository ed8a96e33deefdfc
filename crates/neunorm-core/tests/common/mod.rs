#![allow(dead_code)]

use ndarray::Array2;

use neunorm_core::frame::{Frame, FrameMetadata};
use neunorm_core::stack::ImageStack;

/// A frame filled with one value, named `source`.
pub fn uniform_frame(h: usize, w: usize, value: f32, source: &str) -> Frame {
    Frame::with_metadata(Array2::from_elem((h, w), value), FrameMetadata::named(source))
}

/// `n` uniform frames named `<prefix>_0`, `<prefix>_1`, ...
pub fn uniform_stack(n: usize, h: usize, w: usize, value: f32, prefix: &str) -> ImageStack {
    let frames = (0..n)
        .map(|i| uniform_frame(h, w, value, &format!("{prefix}_{i}")))
        .collect();
    ImageStack::from_frames(frames).expect("uniform frames share a shape")
}

/// Stack built from explicit frames.
pub fn stack_of(frames: Vec<Frame>) -> ImageStack {
    ImageStack::from_frames(frames).expect("frames share a shape")
}

/// Frame whose pixel `(row, col)` holds `row * w + col`.
pub fn ramp_frame(h: usize, w: usize) -> Frame {
    let data = Array2::from_shape_fn((h, w), |(r, c)| (r * w + c) as f32);
    Frame::with_metadata(data, FrameMetadata::named("ramp"))
}

/// Uniform background with one spike at `(row, col)`.
pub fn spiked_frame(h: usize, w: usize, background: f32, spike: f32, at: (usize, usize)) -> Frame {
    let mut frame = uniform_frame(h, w, background, "spiked");
    frame.data[at] = spike;
    frame
}

pub fn assert_all_close(frame: &Frame, expected: f32, tol: f32) {
    for ((r, c), &v) in frame.data.indexed_iter() {
        assert!(
            (v - expected).abs() < tol,
            "pixel ({r}, {c}) = {v}, expected {expected}"
        );
    }
}
