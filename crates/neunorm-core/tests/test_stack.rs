mod common;

use ndarray::{Array2, Array3};

use neunorm_core::error::NeunormError;
use neunorm_core::frame::Frame;
use neunorm_core::stack::mean::mean_stack;
use neunorm_core::stack::median::median_stack;
use neunorm_core::stack::{CombineMode, ImageStack};

use common::{assert_all_close, stack_of, uniform_frame, uniform_stack};

// ---------------------------------------------------------------------------
// add / shape invariant
// ---------------------------------------------------------------------------

#[test]
fn test_add_accepts_matching_shape() {
    let mut stack = ImageStack::new();
    stack.add(uniform_frame(4, 6, 1.0, "a")).unwrap();
    stack.add(uniform_frame(4, 6, 2.0, "b")).unwrap();
    assert_eq!(stack.len(), 2);
    assert_eq!(stack.shape(), Some((4, 6)));
}

#[test]
fn test_add_rejects_shape_mismatch() {
    let mut stack = ImageStack::new();
    stack.add(uniform_frame(4, 6, 1.0, "a")).unwrap();
    let err = stack.add(uniform_frame(6, 4, 1.0, "b")).unwrap_err();
    assert!(
        matches!(
            err,
            NeunormError::ShapeMismatch {
                expected: (4, 6),
                found: (6, 4)
            }
        ),
        "got: {err}"
    );
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_from_frames_rejects_mixed_shapes() {
    let frames = vec![uniform_frame(4, 4, 1.0, "a"), uniform_frame(4, 5, 1.0, "b")];
    assert!(matches!(
        ImageStack::from_frames(frames),
        Err(NeunormError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_add_rejects_frame_from_other_detector_region() {
    let mut stack = ImageStack::new();
    stack.add(uniform_frame(4, 4, 1.0, "a")).unwrap();
    let mut shifted = uniform_frame(4, 4, 1.0, "b");
    shifted.metadata.origin = (4, 0);

    let err = stack.add(shifted).unwrap_err();
    assert!(
        matches!(
            err,
            NeunormError::OriginMismatch {
                expected: (0, 0),
                found: (4, 0)
            }
        ),
        "got: {err}"
    );
    assert_eq!(stack.len(), 1);
}

#[test]
fn test_empty_stack_has_no_shape() {
    let stack = ImageStack::new();
    assert!(stack.is_empty());
    assert_eq!(stack.shape(), None);
    assert!(matches!(
        stack.require_shape("open beam"),
        Err(NeunormError::EmptyStack("open beam"))
    ));
}

// ---------------------------------------------------------------------------
// ingestion from 3-D arrays
// ---------------------------------------------------------------------------

#[test]
fn test_from_array3_splits_frames_and_names_them() {
    let data = Array3::from_shape_fn((3, 2, 2), |(i, _, _)| (i as u16 + 1) * 100);
    let stack = ImageStack::from_array3(data.view());

    assert_eq!(stack.len(), 3);
    assert_eq!(stack.shape(), Some((2, 2)));
    let names: Vec<&str> = stack.iter().map(|f| f.metadata.source.as_str()).collect();
    assert_eq!(names, ["image_0001", "image_0002", "image_0003"]);
    assert_all_close(&stack.frames()[2], 300.0, 1e-6);
    assert_eq!(stack.frames()[0].metadata.saturation, Some(65535.0));
}

#[test]
fn test_from_counts_float_has_no_saturation() {
    let data = Array2::<f32>::from_elem((2, 2), 0.5);
    let frame = Frame::from_counts(data.view());
    assert_eq!(frame.metadata.saturation, None);

    let bytes = Array2::<u8>::from_elem((2, 2), 7);
    let frame = Frame::from_counts(bytes.view());
    assert_eq!(frame.metadata.saturation, Some(255.0));
    assert_eq!(frame.data[[1, 1]], 7.0);
}

// ---------------------------------------------------------------------------
// average / combine
// ---------------------------------------------------------------------------

#[test]
fn test_average_of_constant_frames_is_constant() {
    let stack = uniform_stack(10, 4, 4, 1234.0, "ob");
    let avg = stack.average().unwrap();
    assert_all_close(&avg, 1234.0, 1e-3);
}

#[test]
fn test_average_does_not_truncate_integer_counts() {
    let counts = Array3::<u16>::from_shape_fn((2, 3, 3), |(i, _, _)| i as u16 + 1);
    let stack = ImageStack::from_array3(counts.view());
    let avg = stack.average().unwrap();
    assert_all_close(&avg, 1.5, 1e-6);
}

#[test]
fn test_average_empty_stack_fails() {
    let stack = ImageStack::new();
    assert!(matches!(stack.average(), Err(NeunormError::EmptyStack(_))));
    assert!(mean_stack(&[]).is_err());
}

#[test]
fn test_combine_mean_matches_average() {
    let stack = stack_of(vec![
        uniform_frame(3, 3, 10.0, "a"),
        uniform_frame(3, 3, 20.0, "b"),
        uniform_frame(3, 3, 60.0, "c"),
    ]);
    let mean = stack.combine(CombineMode::Mean).unwrap();
    assert_eq!(mean, stack.average().unwrap());
    assert_all_close(&mean, 30.0, 1e-4);
}

#[test]
fn test_combine_median_ignores_minority_outlier() {
    let stack = stack_of(vec![
        uniform_frame(5, 5, 100.0, "a"),
        uniform_frame(5, 5, 100.0, "b"),
        uniform_frame(5, 5, 9000.0, "gamma burst"),
    ]);
    let median = stack.combine(CombineMode::Median).unwrap();
    assert_all_close(&median, 100.0, 1e-6);
}

#[test]
fn test_median_even_count_averages_middle_values() {
    let frames: Vec<Frame> = [1.0f32, 3.0, 7.0, 9.0]
        .iter()
        .map(|&v| uniform_frame(4, 4, v, "f"))
        .collect();
    let result = median_stack(&frames).unwrap();
    assert_all_close(&result, 5.0, 1e-6);
}

#[test]
fn test_median_parallel_path_matches_per_pixel_median() {
    // 256x256 crosses the row-parallel threshold.
    let frames: Vec<Frame> = (0..3)
        .map(|i| {
            let data = Array2::from_shape_fn((256, 256), |(r, c)| (r + c + i * 10) as f32);
            Frame::new(data)
        })
        .collect();
    let result = median_stack(&frames).unwrap();
    assert_eq!(result.data[[0, 0]], 10.0);
    assert_eq!(result.data[[255, 255]], 520.0);
}

#[test]
fn test_combined_frame_describes_its_origin() {
    let stack = uniform_stack(3, 2, 2, 1.0, "df");
    let reference = stack.combine(CombineMode::Median).unwrap();
    assert_eq!(reference.metadata.source, "median of 3 frames");
    assert_eq!(reference.metadata.timestamp_us, None);
}

// ---------------------------------------------------------------------------
// CombineMode parsing
// ---------------------------------------------------------------------------

#[test]
fn test_combine_mode_from_str() {
    assert_eq!("mean".parse::<CombineMode>().unwrap(), CombineMode::Mean);
    assert_eq!(" Median ".parse::<CombineMode>().unwrap(), CombineMode::Median);
}

#[test]
fn test_combine_mode_unknown_is_unsupported() {
    let err = "sigma-clip".parse::<CombineMode>().unwrap_err();
    assert!(matches!(err, NeunormError::UnsupportedCombineMode(ref m) if m == "sigma-clip"));
}

// ---------------------------------------------------------------------------
// map_frames
// ---------------------------------------------------------------------------

#[test]
fn test_map_frames_preserves_order_on_parallel_path() {
    let frames: Vec<Frame> = (0..12)
        .map(|i| uniform_frame(2, 2, i as f32, &format!("f{i}")))
        .collect();
    let stack = stack_of(frames);

    let doubled = stack
        .map_frames(|f| Ok(f.derive(f.data.mapv(|v| v * 2.0))))
        .unwrap();

    for (i, frame) in doubled.iter().enumerate() {
        assert_eq!(frame.metadata.source, format!("f{i}"));
        assert_eq!(frame.data[[0, 0]], 2.0 * i as f32);
    }
    // Input untouched.
    assert_eq!(stack.frames()[5].data[[0, 0]], 5.0);
}

#[test]
fn test_map_frames_propagates_errors() {
    let stack = uniform_stack(2, 2, 2, 1.0, "s");
    let result = stack.map_frames(|_| Err(NeunormError::InvalidParameter("boom".into())));
    assert!(matches!(result, Err(NeunormError::InvalidParameter(_))));
}
