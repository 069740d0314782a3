//! Classification parameters and the configuration record they load from.

use serde::{Deserialize, Serialize};

use crate::bgremove::encoder::OutputContainer;
use crate::error::ParameterError;

/// Largest edge smoothing radius offered by the configuration surface
pub const MAX_EDGE_SMOOTHING_RADIUS: u32 = 5;

/// Colour distance at which a pixel stops being background when the
/// foreground strength is zero
pub const MAX_BACKGROUND_DISTANCE: f64 = 80.0;

/// Which corners are averaged into the reference background colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CornerSampling {
    /// Top-left, top-right and bottom-left
    #[default]
    ThreeCorners,
    /// All four corners
    FourCorners,
}

/// Which neighbours the edge test compares each pixel against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeDetection {
    /// Only the pixel directly above
    #[default]
    Vertical,
    /// The pixel above and the pixel to the left
    VerticalAndHorizontal,
}

/// Parameters controlling background classification, smoothing and output
///
/// Deserialises from a camelCase JSON record; missing fields fall back to
/// the defaults below.
///
/// ```
/// use imageops_bgremove::{ClassificationParameters, OutputContainer};
///
/// let params = ClassificationParameters::from_json(
///     r#"{ "edgeSmoothingRadius": 1, "foregroundStrength": 0.3, "outputContainer": "webp" }"#,
/// )?;
/// assert_eq!(params.edge_smoothing_radius, 1);
/// assert_eq!(params.output_container, OutputContainer::WebP);
/// # Ok::<(), imageops_bgremove::ParameterError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassificationParameters {
    /// Half-width of the alpha box blur; `0` disables smoothing
    pub edge_smoothing_radius: u32,
    /// Scales the background distance threshold; higher keeps more pixels
    pub foreground_strength: f64,
    /// Container the result is encoded into
    pub output_container: OutputContainer,
    pub corner_sampling: CornerSampling,
    pub edge_detection: EdgeDetection,
}

impl Default for ClassificationParameters {
    fn default() -> Self {
        Self {
            edge_smoothing_radius: 2,
            foreground_strength: 0.5,
            output_container: OutputContainer::Png,
            corner_sampling: CornerSampling::default(),
            edge_detection: EdgeDetection::default(),
        }
    }
}

impl ClassificationParameters {
    /// Creates validated parameters with the default sampling strategies.
    ///
    /// # Errors
    ///
    /// * `ParameterError::ForegroundStrengthOutOfRange` - strength outside `[0, 1]` or NaN
    /// * `ParameterError::EdgeSmoothingRadiusTooLarge` - radius above [`MAX_EDGE_SMOOTHING_RADIUS`]
    pub fn new(
        edge_smoothing_radius: u32,
        foreground_strength: f64,
        output_container: OutputContainer,
    ) -> Result<Self, ParameterError> {
        let params = Self {
            edge_smoothing_radius,
            foreground_strength,
            output_container,
            ..Self::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Builds parameters from raw control values the way the slider UI does:
    /// radius is capped at 5, strength is clamped to `[0, 1]` and snapped to
    /// steps of 0.1. A NaN strength falls back to the default.
    #[must_use]
    pub fn from_controls(
        edge_smoothing_radius: u32,
        foreground_strength: f64,
        output_container: OutputContainer,
    ) -> Self {
        let strength = if foreground_strength.is_nan() {
            Self::default().foreground_strength
        } else {
            (foreground_strength.clamp(0.0, 1.0) * 10.0).round() / 10.0
        };

        Self {
            edge_smoothing_radius: edge_smoothing_radius.min(MAX_EDGE_SMOOTHING_RADIUS),
            foreground_strength: strength,
            output_container,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration record.
    ///
    /// # Errors
    ///
    /// * `ParameterError::Config` - the JSON is malformed or has unknown variants
    /// * any error from [`validate`](Self::validate)
    pub fn from_json(json: &str) -> Result<Self, ParameterError> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| ParameterError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Checks that every field is within its supported range.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !(0.0..=1.0).contains(&self.foreground_strength) {
            return Err(ParameterError::ForegroundStrengthOutOfRange(
                self.foreground_strength,
            ));
        }

        if self.edge_smoothing_radius > MAX_EDGE_SMOOTHING_RADIUS {
            return Err(ParameterError::EdgeSmoothingRadiusTooLarge {
                radius: self.edge_smoothing_radius,
                max: MAX_EDGE_SMOOTHING_RADIUS,
            });
        }

        Ok(())
    }

    /// Colour distance below which a non-edge pixel counts as background.
    ///
    /// The strength is clamped before use, so the result is always in
    /// `[0, 80]`; a NaN strength yields `0`.
    #[must_use]
    pub fn background_threshold(&self) -> f64 {
        let strength = if self.foreground_strength.is_nan() {
            1.0
        } else {
            self.foreground_strength.clamp(0.0, 1.0)
        };
        MAX_BACKGROUND_DISTANCE * (1.0 - strength)
    }
}
