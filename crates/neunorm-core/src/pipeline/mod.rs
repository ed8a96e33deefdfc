pub mod config;
mod helpers;
mod orchestrator;
mod types;

pub use helpers::{dark_field_correction, divide_guarded, subtract};
pub use orchestrator::{
    normalize, normalize_reported, normalize_without_ob, NormalizationEngine,
};
pub use types::{NoOpReporter, PipelineStage, ProgressReporter};
