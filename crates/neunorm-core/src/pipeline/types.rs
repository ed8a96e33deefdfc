/// Normalization stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    GammaFiltering,
    CombiningReferences,
    Normalizing,
    Cropping,
    Resizing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GammaFiltering => write!(f, "Removing gamma spikes"),
            Self::CombiningReferences => write!(f, "Combining references"),
            Self::Normalizing => write!(f, "Normalizing"),
            Self::Cropping => write!(f, "Cropping"),
            Self::Resizing => write!(f, "Resizing"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when no reporter is supplied.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
