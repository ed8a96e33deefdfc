use thiserror::Error;

#[derive(Error, Debug)]
pub enum NeunormError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Shape mismatch: expected {expected:?} (height, width), found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Detector origin mismatch: expected {expected:?} (x, y), found {found:?}")]
    OriginMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Empty {0} stack")]
    EmptyStack(&'static str),

    #[error("Invalid ROI: {0}")]
    InvalidRoi(String),

    #[error("Degenerate ROI: mean over {0} is zero")]
    DegenerateRoi(String),

    #[error("Unsupported combine mode: {0}")]
    UnsupportedCombineMode(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Paired reduction needs one open beam per sample ({samples} samples, {open_beams} open beams)")]
    CountMismatch { samples: usize, open_beams: usize },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, NeunormError>;
