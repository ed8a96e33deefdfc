use std::borrow::Cow;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use crate::background::{apply_ratio, compute_ratio_multi, describe, pooled_mean};
use crate::error::{NeunormError, Result};
use crate::filters::gamma::gamma_filter_stack;
use crate::frame::Frame;
use crate::roi::Roi;
use crate::stack::{CombineMode, ImageStack};
use crate::transform::crop::crop;

use super::config::{NormalizationConfig, ReferenceReduction};
use super::helpers::{divide_guarded, subtract};
use super::types::{NoOpReporter, PipelineStage, ProgressReporter};

/// Normalizes sample radiographs against open-beam and dark-field references.
///
/// Holds only its configuration; every call works on the stacks it is given
/// and returns new ones.
#[derive(Clone, Debug, Default)]
pub struct NormalizationEngine {
    config: NormalizationConfig,
}

impl NormalizationEngine {
    pub fn new(config: NormalizationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizationConfig {
        &self.config
    }

    /// `(sample - DF) / (OB - DF)` per frame, or `sample / OB` without
    /// dark fields, followed by ROI background matching when ROIs are set.
    pub fn normalize(
        &self,
        sample: &ImageStack,
        ob: &ImageStack,
        df: Option<&ImageStack>,
    ) -> Result<ImageStack> {
        normalize_reported(sample, ob, df, &self.config, &NoOpReporter)
    }

    pub fn normalize_reported(
        &self,
        sample: &ImageStack,
        ob: &ImageStack,
        df: Option<&ImageStack>,
        reporter: &dyn ProgressReporter,
    ) -> Result<ImageStack> {
        normalize_reported(sample, ob, df, &self.config, reporter)
    }

    /// Normalize, then apply the configured crop and resize steps.
    pub fn process(
        &self,
        sample: &ImageStack,
        ob: &ImageStack,
        df: Option<&ImageStack>,
    ) -> Result<ImageStack> {
        self.process_reported(sample, ob, df, &NoOpReporter)
    }

    pub fn process_reported(
        &self,
        sample: &ImageStack,
        ob: &ImageStack,
        df: Option<&ImageStack>,
        reporter: &dyn ProgressReporter,
    ) -> Result<ImageStack> {
        let normalized = normalize_reported(sample, ob, df, &self.config, reporter)?;
        self.post_process(normalized, reporter)
    }

    /// Normalize a sample stack by its own ROI mean, for data sets without
    /// open beams. Gamma filtering and post-processing follow the config.
    pub fn process_sample_only(
        &self,
        sample: &ImageStack,
        reporter: &dyn ProgressReporter,
    ) -> Result<ImageStack> {
        validate_sample_only(sample, &self.config.rois)?;
        let sample = if self.config.use_gamma_filter {
            reporter.begin_stage(PipelineStage::GammaFiltering, Some(sample.len()));
            let filtered = gamma_filter_stack(sample, &self.config.gamma)?;
            reporter.finish_stage();
            Cow::Owned(filtered)
        } else {
            Cow::Borrowed(sample)
        };

        reporter.begin_stage(PipelineStage::Normalizing, Some(sample.len()));
        let normalized = normalize_without_ob(&sample, &self.config.rois)?;
        reporter.finish_stage();
        self.post_process(normalized, reporter)
    }

    fn post_process(
        &self,
        mut stack: ImageStack,
        reporter: &dyn ProgressReporter,
    ) -> Result<ImageStack> {
        if let Some(roi) = &self.config.crop {
            reporter.begin_stage(PipelineStage::Cropping, Some(stack.len()));
            stack = crop(&stack, roi)?;
            reporter.finish_stage();
        }
        if let Some(resize) = &self.config.resize {
            reporter.begin_stage(PipelineStage::Resizing, Some(stack.len()));
            stack = resize.apply(&stack)?;
            reporter.finish_stage();
        }
        Ok(stack)
    }
}

/// Normalize `sample` against `ob` (and `df`, if given) with `config`.
///
/// Crop and resize settings in `config` are not applied here; see
/// [`NormalizationEngine::process`].
pub fn normalize(
    sample: &ImageStack,
    ob: &ImageStack,
    df: Option<&ImageStack>,
    config: &NormalizationConfig,
) -> Result<ImageStack> {
    normalize_reported(sample, ob, df, config, &NoOpReporter)
}

/// [`normalize`] with a progress reporter.
pub fn normalize_reported(
    sample: &ImageStack,
    ob: &ImageStack,
    df: Option<&ImageStack>,
    config: &NormalizationConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ImageStack> {
    // An empty dark-field stack means no dark-field correction.
    let df = df.filter(|d| !d.is_empty());
    validate_inputs(sample, ob, df, config)?;

    info!(
        samples = sample.len(),
        open_beams = ob.len(),
        dark_fields = df.map_or(0, ImageStack::len),
        rois = config.rois.len(),
        reduction = %config.ob_reduction,
        "Starting normalization"
    );

    let (sample, ob, df) = if config.use_gamma_filter {
        let total = sample.len() + ob.len() + df.map_or(0, ImageStack::len);
        reporter.begin_stage(PipelineStage::GammaFiltering, Some(total));
        let sample_f = gamma_filter_stack(sample, &config.gamma)?;
        reporter.advance(sample.len());
        let ob_f = gamma_filter_stack(ob, &config.gamma)?;
        reporter.advance(sample.len() + ob.len());
        let df_f = df.map(|d| gamma_filter_stack(d, &config.gamma)).transpose()?;
        reporter.advance(total);
        reporter.finish_stage();
        (Cow::Owned(sample_f), Cow::Owned(ob_f), df_f.map(Cow::Owned))
    } else {
        (Cow::Borrowed(sample), Cow::Borrowed(ob), df.map(Cow::Borrowed))
    };

    reporter.begin_stage(PipelineStage::CombiningReferences, None);
    let df_ref = df
        .as_deref()
        .map(|d| d.combine(config.df_reduction))
        .transpose()?;
    let denominators = open_beam_references(&ob, config.ob_reduction, df_ref.as_ref())?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Normalizing, Some(sample.len()));
    let done = AtomicUsize::new(0);
    let normalized = sample.map_frames_indexed(|i, frame| {
        let denominator = if denominators.len() == 1 {
            &denominators[0]
        } else {
            &denominators[i]
        };
        let numerator = match &df_ref {
            Some(dark) => Cow::Owned(subtract(frame, dark)?),
            None => Cow::Borrowed(frame),
        };

        let mut data = divide_guarded(&numerator.data, &denominator.data)?;
        if !config.rois.is_empty() {
            let ratio = compute_ratio_multi(&numerator, denominator, &config.rois)?;
            data.mapv_inplace(|v| v * ratio);
        }

        reporter.advance(done.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(frame.derive(data))
    })?;
    reporter.finish_stage();

    info!(frames = normalized.len(), "Normalization complete");
    Ok(normalized)
}

/// Divide every sample frame by the pooled mean of its own ROIs.
pub fn normalize_without_ob(sample: &ImageStack, rois: &[Roi]) -> Result<ImageStack> {
    validate_sample_only(sample, rois)?;

    let normalized = sample.map_frames(|frame| {
        let mean = pooled_mean(frame, rois)?;
        if mean == 0.0 || !mean.is_finite() {
            return Err(NeunormError::DegenerateRoi(format!(
                "{} in {}",
                describe(rois),
                frame.metadata.source
            )));
        }
        Ok(apply_ratio(frame, (1.0 / mean) as f32))
    })?;

    info!(
        frames = normalized.len(),
        rois = rois.len(),
        "Sample-only normalization complete"
    );
    Ok(normalized)
}

fn validate_sample_only(sample: &ImageStack, rois: &[Roi]) -> Result<()> {
    sample.require_shape("sample")?;
    if rois.is_empty() {
        return Err(NeunormError::InvalidRoi(
            "sample-only normalization needs at least one ROI".into(),
        ));
    }
    for roi in rois {
        roi.local_bounds(&sample.frames()[0])?;
    }
    Ok(())
}

fn validate_inputs(
    sample: &ImageStack,
    ob: &ImageStack,
    df: Option<&ImageStack>,
    config: &NormalizationConfig,
) -> Result<()> {
    sample.require_shape("sample")?;
    ob.require_shape("open beam")?;
    let reference = &sample.frames()[0];
    let others = [ob.frames().first(), df.and_then(|d| d.frames().first())];
    for frame in others.into_iter().flatten() {
        reference.check_same_geometry(frame)?;
    }

    if config.ob_reduction == ReferenceReduction::Paired && ob.len() != sample.len() {
        return Err(NeunormError::CountMismatch {
            samples: sample.len(),
            open_beams: ob.len(),
        });
    }

    let firsts = [sample.frames().first(), ob.frames().first()];
    for roi in &config.rois {
        for frame in firsts.iter().flatten() {
            roi.local_bounds(frame)?;
        }
    }
    Ok(())
}

/// Denominator frames: one combined reference, or one per sample when paired,
/// with the dark-field reference already subtracted.
fn open_beam_references(
    ob: &ImageStack,
    reduction: ReferenceReduction,
    df_ref: Option<&Frame>,
) -> Result<Vec<Frame>> {
    let references = match reduction {
        ReferenceReduction::Mean => vec![ob.combine(CombineMode::Mean)?],
        ReferenceReduction::Median => vec![ob.combine(CombineMode::Median)?],
        ReferenceReduction::Paired => ob.frames().to_vec(),
    };
    match df_ref {
        Some(dark) => references.iter().map(|r| subtract(r, dark)).collect(),
        None => Ok(references),
    }
}
