pub mod config;
pub mod info;
pub mod normalize;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use neunorm_core::io::image_io::{list_images, load_stack, ExportOptions};
use neunorm_core::pipeline::config::NormalizationConfig;
use neunorm_core::stack::ImageStack;
use serde::{Deserialize, Serialize};

/// Contents of a run file: what `config` prints and `normalize --config` reads.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFile {
    pub normalization: NormalizationConfig,
    pub export: ExportOptions,
}

impl RunFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&contents).context("Invalid run config")
    }
}

/// Load a stack from a mix of folders and image files.
///
/// Folders contribute their supported images sorted by name; files keep the
/// order given on the command line.
pub fn load_inputs(paths: &[PathBuf], role: &str) -> Result<ImageStack> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = list_images(path)
                .with_context(|| format!("Failed to list {role} folder {}", path.display()))?;
            if found.is_empty() {
                bail!("No tif/tiff/png images in {role} folder {}", path.display());
            }
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    load_stack(&files).with_context(|| format!("Failed to load {role} images"))
}
