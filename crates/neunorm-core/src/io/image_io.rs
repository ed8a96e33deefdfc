use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Primitive};
use ndarray::Array2;
use num_traits::{AsPrimitive, Bounded};
use serde::{Deserialize, Serialize};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tracing::{debug, info, warn};

use crate::consts::{
    SUPPORTED_IMAGE_EXTENSIONS, U16_FULL_SCALE, U8_FULL_SCALE, UNSUPPORTED_IMAGE_EXTENSIONS,
};
use crate::error::{NeunormError, Result};
use crate::frame::Frame;
use crate::stack::ImageStack;

/// Output container for exported frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    /// 32-bit float grayscale TIFF holding the values as they are.
    #[default]
    FloatTiff,
    /// 16-bit grayscale TIFF scaled by the export value range.
    Tiff,
    /// 8-bit grayscale PNG scaled by the export value range.
    Png,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::FloatTiff | Self::Tiff => "tif",
            Self::Png => "png",
        }
    }
}

/// How a stack is written to disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Prepended to every file name as `<prefix>_`.
    pub prefix: Option<String>,
    /// Values mapped to black and full scale by the integer formats;
    /// anything outside is clamped. Float TIFFs ignore it.
    pub value_range: (f32, f32),
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::FloatTiff,
            prefix: Some("normalized".into()),
            value_range: (0.0, 1.0),
        }
    }
}

/// Load one grayscale image as raw counts.
///
/// Integer and float grayscale data keep their values and saturation count.
/// Other pixel layouts are converted to 16-bit grayscale first.
pub fn load_frame(path: &Path) -> Result<Frame> {
    check_extension(path)?;

    let wide = if has_extension(path, &["tif", "tiff"]) {
        load_wide_tiff(path)?
    } else {
        None
    };
    let mut frame = match wide {
        Some(frame) => frame,
        None => decode_image(path)?,
    };

    frame.metadata.source = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    frame.metadata.timestamp_us = modification_time_us(path);

    debug!(
        path = %path.display(),
        width = frame.width(),
        height = frame.height(),
        "Frame loaded"
    );
    Ok(frame)
}

/// Load several files into one stack, in the given order.
pub fn load_stack<P: AsRef<Path>>(paths: &[P]) -> Result<ImageStack> {
    let mut stack = ImageStack::new();
    for path in paths {
        stack.add(load_frame(path.as_ref())?)?;
    }
    Ok(stack)
}

/// Load every supported image of a folder, sorted by file name.
pub fn load_folder(dir: &Path) -> Result<ImageStack> {
    let paths = list_images(dir)?;
    if paths.is_empty() {
        warn!(dir = %dir.display(), "No supported images found");
    }
    let stack = load_stack(&paths)?;
    info!(dir = %dir.display(), frames = stack.len(), "Folder loaded");
    Ok(stack)
}

/// Supported image files directly inside `dir`, sorted by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, &SUPPORTED_IMAGE_EXTENSIONS) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Write one frame.
///
/// Float TIFFs store the values unchanged, so transmissions above 1 or
/// below 0 survive. The integer formats map `value_range` onto their full
/// scale and clamp.
pub fn save_frame(
    frame: &Frame,
    path: &Path,
    format: ExportFormat,
    value_range: (f32, f32),
) -> Result<()> {
    let (w, h) = (frame.width() as u32, frame.height() as u32);
    if format == ExportFormat::FloatTiff {
        let pixels: Vec<f32> = frame.data.iter().copied().collect();
        let mut file = BufWriter::new(File::create(path)?);
        TiffEncoder::new(&mut file)?.write_image::<Gray32Float>(w, h, &pixels)?;
        file.flush()?;
        return Ok(());
    }

    let (lo, hi) = value_range;
    if hi.is_nan() || lo.is_nan() || hi <= lo {
        return Err(NeunormError::InvalidParameter(format!(
            "export value range must be increasing, got ({lo}, {hi})"
        )));
    }
    let unit = |v: f32| ((v - lo) / (hi - lo)).clamp(0.0, 1.0);

    if format == ExportFormat::Png {
        let pixels: Vec<u8> = frame
            .data
            .iter()
            .map(|&v| (unit(v) * U8_FULL_SCALE).round() as u8)
            .collect();
        let img = ImageBuffer::<Luma<u8>, Vec<u8>>::from_raw(w, h, pixels)
            .ok_or_else(|| dimension_error(frame))?;
        img.save_with_format(path, ImageFormat::Png)?;
    } else {
        let pixels: Vec<u16> = frame
            .data
            .iter()
            .map(|&v| (unit(v) * U16_FULL_SCALE).round() as u16)
            .collect();
        let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w, h, pixels)
            .ok_or_else(|| dimension_error(frame))?;
        img.save_with_format(path, ImageFormat::Tiff)?;
    }
    Ok(())
}

/// Write every frame of `stack` into the existing folder `dir` as
/// `<prefix>_<source stem>.<ext>`. Returns the written paths in stack order.
pub fn export_stack(
    stack: &ImageStack,
    dir: &Path,
    options: &ExportOptions,
) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(NeunormError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("output folder '{}' does not exist", dir.display()),
        )));
    }

    let mut written = Vec::with_capacity(stack.len());
    for (i, frame) in stack.iter().enumerate() {
        let name = export_file_name(
            &frame.metadata.source,
            i,
            options.prefix.as_deref(),
            options.format,
        );
        let path = dir.join(name);
        save_frame(frame, &path, options.format, options.value_range)?;
        written.push(path);
    }

    info!(
        dir = %dir.display(),
        frames = written.len(),
        format = ?options.format,
        "Stack exported"
    );
    Ok(written)
}

/// `<prefix>_<stem>.<ext>`; frames without a source get `image_NNNN`.
pub fn export_file_name(
    source: &str,
    index: usize,
    prefix: Option<&str>,
    format: ExportFormat,
) -> String {
    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("image_{:04}", index + 1));
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}_{stem}.{}", format.extension()),
        None => format!("{stem}.{}", format.extension()),
    }
}

fn decode_image(path: &Path) -> Result<Frame> {
    match image::open(path)? {
        DynamicImage::ImageLuma8(buf) => frame_from_buffer(buf),
        DynamicImage::ImageLuma16(buf) => frame_from_buffer(buf),
        other => {
            warn!(
                path = %path.display(),
                color = ?other.color(),
                "Converting non-grayscale image to 16-bit luminance"
            );
            frame_from_buffer(other.to_luma16())
        }
    }
}

/// 32- and 64-bit grayscale TIFFs, which `image` does not decode.
/// `None` for every other layout.
fn load_wide_tiff(path: &Path) -> Result<Option<Frame>> {
    let mut decoder = Decoder::new(BufReader::new(File::open(path)?))?;
    if !matches!(decoder.colortype()?, tiff::ColorType::Gray(32 | 64)) {
        return Ok(None);
    }
    let (w, h) = decoder.dimensions()?;
    let frame = match decoder.read_image()? {
        DecodingResult::F32(v) => frame_from_samples(v, w, h)?,
        DecodingResult::F64(v) => frame_from_samples(v, w, h)?,
        DecodingResult::U32(v) => frame_from_samples(v, w, h)?,
        DecodingResult::I32(v) => frame_from_samples(v, w, h)?,
        _ => return Err(NeunormError::UnsupportedFormat(path.display().to_string())),
    };
    Ok(Some(frame))
}

fn frame_from_buffer<T>(buf: ImageBuffer<Luma<T>, Vec<T>>) -> Result<Frame>
where
    T: Primitive + AsPrimitive<f32> + Bounded,
{
    let (w, h) = buf.dimensions();
    frame_from_samples(buf.into_raw(), w, h)
}

fn frame_from_samples<T>(samples: Vec<T>, w: u32, h: u32) -> Result<Frame>
where
    T: AsPrimitive<f32> + Bounded,
{
    let data = Array2::from_shape_vec((h as usize, w as usize), samples).map_err(|_| {
        NeunormError::InvalidDimensions {
            width: w as usize,
            height: h as usize,
        }
    })?;
    Ok(Frame::from_counts(data.view()))
}

fn dimension_error(frame: &Frame) -> NeunormError {
    NeunormError::InvalidDimensions {
        width: frame.width(),
        height: frame.height(),
    }
}

fn check_extension(path: &Path) -> Result<()> {
    if has_extension(path, &UNSUPPORTED_IMAGE_EXTENSIONS) {
        return Err(NeunormError::UnsupportedFormat(path.display().to_string()));
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn modification_time_us(path: &Path) -> Option<u64> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    let since_epoch = modified.duration_since(UNIX_EPOCH).ok()?;
    u64::try_from(since_epoch.as_micros()).ok()
}
