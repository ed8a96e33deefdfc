use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use neunorm_core::io::image_io::{export_stack, ExportFormat, ExportOptions};
use neunorm_core::pipeline::config::{NormalizationConfig, ReferenceReduction, ResizeConfig};
use neunorm_core::pipeline::NormalizationEngine;
use neunorm_core::roi::Roi;
use neunorm_core::stack::CombineMode;
use tracing::debug;

use super::{load_inputs, RunFile};
use crate::progress::BarReporter;
use crate::summary::{print_normalize_summary, RunInputs};

#[derive(Clone, ValueEnum)]
pub enum ObReductionArg {
    Mean,
    Median,
    Paired,
}

#[derive(Clone, ValueEnum)]
pub enum DfReductionArg {
    Mean,
    Median,
}

#[derive(Clone, ValueEnum)]
pub enum FormatArg {
    /// 32-bit float TIFF, values unscaled
    Float,
    /// 16-bit TIFF over the 0..1 range
    Tiff,
    /// 8-bit PNG over the 0..1 range
    Png,
}

#[derive(Args)]
pub struct NormalizeArgs {
    /// Sample images or folders
    #[arg(short, long, required = true, num_args = 1..)]
    pub sample: Vec<PathBuf>,

    /// Open-beam images or folders
    #[arg(long, num_args = 1..)]
    pub ob: Vec<PathBuf>,

    /// Dark-field images or folders
    #[arg(long, num_args = 1..)]
    pub df: Vec<PathBuf>,

    /// Run config file (TOML); replaces the processing flags below
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Open-beam region for background matching, as x0,y0,x1,y1 (repeatable)
    #[arg(long)]
    pub roi: Vec<Roi>,

    /// Skip gamma spike removal
    #[arg(long)]
    pub no_gamma: bool,

    /// How open-beam frames form the reference
    #[arg(long, value_enum, default_value = "mean")]
    pub ob_reduction: ObReductionArg,

    /// How dark-field frames form the reference
    #[arg(long, value_enum, default_value = "mean")]
    pub df_reduction: DfReductionArg,

    /// Crop the result to x0,y0,x1,y1
    #[arg(long)]
    pub crop: Option<Roi>,

    /// Bin the result by an integer factor
    #[arg(long)]
    pub bin: Option<usize>,

    /// Output file format
    #[arg(long, value_enum, default_value = "float")]
    pub format: FormatArg,

    /// File name prefix for exported frames (empty for none)
    #[arg(long, default_value = "normalized")]
    pub prefix: String,

    /// Worker threads (default: all cores)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Output folder, created if missing
    #[arg(short, long, default_value = "normalized")]
    pub output: PathBuf,
}

pub fn run(args: &NormalizeArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let run_file = match args.config {
        Some(ref path) => RunFile::load(path)?,
        None => build_run_from_args(args),
    };
    debug!(?run_file, "Run configuration");

    let sample = load_inputs(&args.sample, "sample")?;
    let ob = if args.ob.is_empty() {
        None
    } else {
        Some(load_inputs(&args.ob, "open beam")?)
    };
    let df = if args.df.is_empty() {
        None
    } else {
        Some(load_inputs(&args.df, "dark field")?)
    };

    if ob.is_none() && run_file.normalization.rois.is_empty() {
        bail!("Without open-beam images at least one --roi is needed");
    }

    print_normalize_summary(
        &RunInputs {
            sample: &sample,
            ob: ob.as_ref(),
            df: df.as_ref(),
            output: &args.output,
        },
        &run_file.normalization,
        &run_file.export,
    );

    let engine = NormalizationEngine::new(run_file.normalization);
    let reporter = BarReporter::new()?;
    let normalized = match ob {
        Some(ref ob) => engine.process_reported(&sample, ob, df.as_ref(), &reporter)?,
        None => engine.process_sample_only(&sample, &reporter)?,
    };
    reporter.finish();

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;
    let written = export_stack(&normalized, &args.output, &run_file.export)?;

    println!(
        "\n{} frame(s) saved to {}",
        written.len(),
        args.output.display()
    );
    Ok(())
}

fn build_run_from_args(args: &NormalizeArgs) -> RunFile {
    let normalization = NormalizationConfig {
        use_gamma_filter: !args.no_gamma,
        ob_reduction: match args.ob_reduction {
            ObReductionArg::Mean => ReferenceReduction::Mean,
            ObReductionArg::Median => ReferenceReduction::Median,
            ObReductionArg::Paired => ReferenceReduction::Paired,
        },
        df_reduction: match args.df_reduction {
            DfReductionArg::Mean => CombineMode::Mean,
            DfReductionArg::Median => CombineMode::Median,
        },
        rois: args.roi.clone(),
        crop: args.crop,
        resize: args.bin.map(|factor| ResizeConfig::Bin { factor }),
        ..Default::default()
    };

    let export = ExportOptions {
        format: match args.format {
            FormatArg::Float => ExportFormat::FloatTiff,
            FormatArg::Tiff => ExportFormat::Tiff,
            FormatArg::Png => ExportFormat::Png,
        },
        prefix: Some(args.prefix.clone()).filter(|p| !p.is_empty()),
        ..Default::default()
    };

    RunFile {
        normalization,
        export,
    }
}
