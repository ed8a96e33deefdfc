/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum frame count to use frame-level Rayon parallelism.
pub const PARALLEL_FRAME_THRESHOLD: usize = 4;

/// Default gamma filter window radius; the window is (2r+1)x(2r+1).
pub const DEFAULT_GAMMA_RADIUS: usize = 2;

/// Default multiplier for the local-median gamma rule.
pub const DEFAULT_GAMMA_MEDIAN_FACTOR: f32 = 3.0;

/// Scale factor turning a median absolute deviation into a Gaussian sigma estimate.
pub const MAD_TO_SIGMA: f32 = 1.4826;

/// Headroom below the saturation value above which a pixel counts as a gamma hit.
pub const SATURATION_MARGIN: f32 = 5.0;

/// Full-scale value of 16-bit exports.
pub const U16_FULL_SCALE: f32 = 65535.0;

/// Full-scale value of 8-bit exports.
pub const U8_FULL_SCALE: f32 = 255.0;

/// File extensions the folder loader picks up (lowercase).
pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 3] = ["tif", "tiff", "png"];

/// Extensions of formats recognised but not decoded by the loader.
pub const UNSUPPORTED_IMAGE_EXTENSIONS: [&str; 8] =
    ["fits", "fit", "hdf", "h4", "hdf4", "he2", "h5", "hdf5"];
