use serde::Deserialize;

use crate::error::FitError;

/// Output encoding for region crops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG, keeps any alpha channel.
    #[default]
    Png,

    /// JPEG at [`FittingConfig::quality`]; alpha is flattened onto white.
    Jpeg,
}

/// Tunable constants for region composition and mask synthesis.
///
/// Every field has a default, so a JSON document only needs the fields it
/// overrides:
///
/// ```
/// use fitmask::FittingConfig;
///
/// let config = FittingConfig::from_json(r#"{ "upper_ratio": 0.6 }"#).unwrap();
/// assert_eq!(config.upper_ratio, 0.6);
/// assert_eq!(config.horizontal_pad, 0.10);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FittingConfig {
    /// Horizontal padding as a fraction of the subject box width.
    pub horizontal_pad: f32,
    /// Vertical padding as a fraction of the subject box height.
    pub vertical_pad: f32,
    /// Fraction of the padded box kept for `upper` when no hip is known.
    pub upper_ratio: f32,
    /// Fraction of the padded box kept for `lower` when no hip is known.
    pub lower_ratio: f32,
    /// Pixels between the left hip and the upper/lower crop edge.
    pub hip_crop_margin: u32,
    /// Pixels added below the averaged hip line in masks.
    pub hip_mask_offset: u32,
    /// Hip line as a fraction of image height when no pose is available.
    pub default_hip_ratio: f32,
    /// Head height as a fraction of the person box, used when shoulders are unusable.
    pub head_box_ratio: f32,
    pub output_format: OutputFormat,
    /// JPEG quality in `[0, 1]`.
    pub quality: f32,
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            horizontal_pad: 0.10,
            vertical_pad: 0.05,
            upper_ratio: 0.55,
            lower_ratio: 0.45,
            hip_crop_margin: 20,
            hip_mask_offset: 10,
            default_hip_ratio: 0.6,
            head_box_ratio: 0.13,
            output_format: OutputFormat::Png,
            quality: 0.9,
        }
    }
}

impl FittingConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, FitError> {
        let config: FittingConfig =
            serde_json::from_str(json).map_err(|e| FitError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FitError> {
        if !(self.horizontal_pad >= 0.0 && self.vertical_pad >= 0.0) {
            return Err(FitError::InvalidConfig(
                "padding fractions must be non-negative".into(),
            ));
        }
        let unit = [
            ("upper_ratio", self.upper_ratio),
            ("lower_ratio", self.lower_ratio),
            ("default_hip_ratio", self.default_hip_ratio),
            ("head_box_ratio", self.head_box_ratio),
            ("quality", self.quality),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(FitError::InvalidConfig(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }
        Ok(())
    }
}
