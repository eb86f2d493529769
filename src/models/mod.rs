use crate::config::SwapConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use validator::Validate;

/// Per-request options. Keys other than these two are ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct SwapOptions {
    pub face_swapper_model: Option<String>,
    #[validate(custom(function = "crate::utils::validation::validate_selector_mode"))]
    pub face_selector_mode: Option<String>,
}

/// Everything an invocation needs to know about how to swap. Built per call
/// and passed down explicitly; nothing reads these from shared state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapSettings {
    pub face_swapper_model: String,
    pub face_selector_mode: String,
    /// Whether the selector mode came from the request rather than defaults
    pub selector_mode_requested: bool,
    pub face_mask_types: Vec<String>,
    pub face_mask_blur: f64,
    pub face_mask_padding: i64,
    pub face_swapper_pixel_boost: String,
    pub face_mask_regions: Vec<String>,
    pub reference_face_distance: f64,
    pub output_image_resolution: String,
}

impl SwapSettings {
    pub fn defaults(config: &SwapConfig) -> Self {
        Self {
            face_swapper_model: config.default_model.clone(),
            face_selector_mode: config.default_selector_mode.clone(),
            selector_mode_requested: false,
            face_mask_types: vec!["box".to_string()],
            face_mask_blur: 0.3,
            face_mask_padding: 0,
            face_swapper_pixel_boost: "1x".to_string(),
            face_mask_regions: vec!["skin".to_string()],
            reference_face_distance: 0.6,
            output_image_resolution: "1x".to_string(),
        }
    }

    /// Server defaults overridden by whatever the request set.
    pub fn resolve(config: &SwapConfig, options: Option<&SwapOptions>) -> Self {
        let mut settings = Self::defaults(config);
        if let Some(options) = options {
            if let Some(model) = &options.face_swapper_model {
                settings.face_swapper_model = model.clone();
            }
            if let Some(mode) = &options.face_selector_mode {
                settings.face_selector_mode = mode.clone();
                settings.selector_mode_requested = true;
            }
        }
        settings
    }
}

/// One face swap to perform. The output file does not exist yet.
#[derive(Debug, Clone)]
pub struct SwapJob {
    pub source: PathBuf,
    pub target: PathBuf,
    pub output: PathBuf,
    pub settings: SwapSettings,
}

/// What a finished swap reports besides the output file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwapOutput {
    /// Faces found in the target; only the library backend counts them
    pub faces_detected: Option<usize>,
}

/// Result of running an external process to completion or timeout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessOutcome {
    /// Exit code; -1 when the process was killed by a signal
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && self.return_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_defaults() {
        let config = SwapConfig::default();
        let settings = SwapSettings::resolve(&config, None);
        assert_eq!(settings.face_swapper_model, "inswapper_128");
        assert_eq!(settings.face_selector_mode, "one");
        assert!(!settings.selector_mode_requested);
        assert_eq!(settings.face_mask_types, vec!["box"]);
    }

    #[test]
    fn test_resolve_applies_options() {
        let config = SwapConfig::default();
        let options = SwapOptions {
            face_swapper_model: Some("simswap_256".to_string()),
            face_selector_mode: Some("many".to_string()),
        };
        let settings = SwapSettings::resolve(&config, Some(&options));
        assert_eq!(settings.face_swapper_model, "simswap_256");
        assert_eq!(settings.face_selector_mode, "many");
        assert!(settings.selector_mode_requested);
    }

    #[test]
    fn test_options_ignore_unknown_keys() {
        let options: SwapOptions = serde_json::from_str(
            r#"{"face_selector_mode": "many", "face_enhancer": true, "extra": [1, 2]}"#,
        )
        .unwrap();
        assert_eq!(options.face_selector_mode.as_deref(), Some("many"));
        assert!(options.face_swapper_model.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_reject_unknown_selector_mode() {
        let options = SwapOptions {
            face_swapper_model: None,
            face_selector_mode: Some("largest".to_string()),
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_outcome_success() {
        let ok = ProcessOutcome::default();
        assert!(ok.success());
        let timed_out = ProcessOutcome {
            timed_out: true,
            ..Default::default()
        };
        assert!(!timed_out.success());
    }
}
