use neunorm_core::filters::gamma::{GammaFilterParams, GammaRule};
use neunorm_core::pipeline::config::{NormalizationConfig, ReferenceReduction, ResizeConfig};
use neunorm_core::pipeline::PipelineStage;
use neunorm_core::roi::Roi;
use neunorm_core::stack::CombineMode;
use neunorm_core::transform::resize::ResampleMethod;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_default_config() {
    let config = NormalizationConfig::default();
    assert!(config.use_gamma_filter);
    assert_eq!(config.gamma.radius, 2);
    assert_eq!(config.gamma.rule, GammaRule::LocalMedian { factor: 3.0 });
    assert_eq!(config.ob_reduction, ReferenceReduction::Mean);
    assert_eq!(config.df_reduction, CombineMode::Mean);
    assert!(config.rois.is_empty());
    assert!(config.crop.is_none());
    assert!(config.resize.is_none());
}

#[test]
fn test_default_gamma_params_are_valid() {
    assert!(GammaFilterParams::default().validate().is_ok());
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_reference_reduction_display() {
    assert_eq!(ReferenceReduction::Mean.to_string(), "Mean");
    assert_eq!(ReferenceReduction::Median.to_string(), "Median");
    assert_eq!(ReferenceReduction::Paired.to_string(), "Paired");
}

#[test]
fn test_gamma_rule_display() {
    assert_eq!(
        GammaRule::LocalMedian { factor: 3.0 }.to_string(),
        "Local median (x3)"
    );
    assert_eq!(
        GammaRule::Saturation { max_value: None }.to_string(),
        "Saturation"
    );
    assert_eq!(
        GammaRule::Saturation {
            max_value: Some(4095.0)
        }
        .to_string(),
        "Saturation (max 4095)"
    );
    assert_eq!(
        GammaRule::GlobalMean { threshold: 0.1 }.to_string(),
        "Global mean (x0.1)"
    );
}

#[test]
fn test_resize_config_display() {
    let shape = ResizeConfig::Shape {
        height: 256,
        width: 512,
        method: ResampleMethod::Area,
    };
    assert_eq!(shape.to_string(), "512x256 (Area)");
    assert_eq!(ResizeConfig::Bin { factor: 2 }.to_string(), "bin 2x2");
}

#[test]
fn test_pipeline_stage_display() {
    assert_eq!(
        PipelineStage::GammaFiltering.to_string(),
        "Removing gamma spikes"
    );
    assert_eq!(PipelineStage::Normalizing.to_string(), "Normalizing");
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

#[test]
fn test_config_json_roundtrip() {
    let config = NormalizationConfig {
        use_gamma_filter: false,
        gamma: GammaFilterParams {
            radius: 1,
            rule: GammaRule::LocalSigma { sigma: 4.0 },
        },
        ob_reduction: ReferenceReduction::Paired,
        df_reduction: CombineMode::Median,
        rois: vec![Roi::new(0, 0, 10, 10).unwrap(), Roi::new(90, 0, 100, 10).unwrap()],
        crop: Some(Roi::new(5, 5, 95, 95).unwrap()),
        resize: Some(ResizeConfig::Pitch {
            current: 55.0,
            target: 110.0,
            method: ResampleMethod::Nearest,
        }),
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: NormalizationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_partial_config_fills_defaults() {
    let json = r#"{ "ob_reduction": "Median", "rois": [{ "x0": 0, "y0": 0, "x1": 4, "y1": 4 }] }"#;
    let config: NormalizationConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.ob_reduction, ReferenceReduction::Median);
    assert_eq!(config.rois, vec![Roi::new(0, 0, 4, 4).unwrap()]);
    assert!(config.use_gamma_filter);
    assert_eq!(config.gamma, GammaFilterParams::default());
}
