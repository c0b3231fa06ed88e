//! Targeting configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.
//! Loading from disk is left to the caller; this module only parses and
//! validates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default horizontal field of view (degrees)
pub const DEFAULT_FOV_DEG: f64 = 65.0;

/// Tuning constant for distance-based sprite scaling: `k / (d + k)`
pub const DEFAULT_SCALE_K: f64 = 45.0;

pub const DEFAULT_MIN_SCALE: f64 = 0.45;
pub const DEFAULT_MAX_SCALE: f64 = 1.0;

/// Pitch beyond this is treated as the edge of the screen (degrees)
pub const DEFAULT_PITCH_LIMIT_DEG: f64 = 60.0;

/// How long the location source may stay silent before the fallback point
/// is substituted (milliseconds)
pub const DEFAULT_FALLBACK_WAIT_MS: u64 = 8000;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("field of view must be in (0, 360], got {0}")]
    InvalidFov(f64),
    #[error("viewport must be positive, got {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
    #[error("scale range must satisfy 0 < min <= max <= 1, got min {min} max {max}")]
    InvalidScaleRange { min: f64, max: f64 },
    #[error("scale constant must be positive, got {0}")]
    InvalidScaleConstant(f64),
    #[error("pitch limit must be positive, got {0}")]
    InvalidPitchLimit(f64),
    #[error("invalid config: {0}")]
    Parse(String),
}

/// Screen size the sprite is projected onto (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            width: 390.0,
            height: 844.0,
        }
    }
}

/// Opt-in substitution of a synthetic position near the target when the
/// location source stays silent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackConfig {
    pub enabled: bool,
    pub wait_ms: u64,
    /// Distance of the synthetic point from the target (meters)
    pub offset_meters: f64,
    /// Direction from the target to the synthetic point (degrees)
    pub bearing_degrees: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            enabled: false,
            wait_ms: DEFAULT_FALLBACK_WAIT_MS,
            offset_meters: 10.0,
            bearing_degrees: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArConfig {
    /// Horizontal field of view (degrees)
    pub fov_degrees: f64,
    pub viewport: Viewport,
    pub scale_k: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub pitch_limit_degrees: f64,
    pub fallback: FallbackConfig,
}

impl Default for ArConfig {
    fn default() -> Self {
        ArConfig {
            fov_degrees: DEFAULT_FOV_DEG,
            viewport: Viewport::default(),
            scale_k: DEFAULT_SCALE_K,
            min_scale: DEFAULT_MIN_SCALE,
            max_scale: DEFAULT_MAX_SCALE,
            pitch_limit_degrees: DEFAULT_PITCH_LIMIT_DEG,
            fallback: FallbackConfig::default(),
        }
    }
}

impl ArConfig {
    /// Parse and validate a JSON config document
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: ArConfig =
            serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fov_degrees > 0.0 && self.fov_degrees <= 360.0) {
            return Err(ConfigError::InvalidFov(self.fov_degrees));
        }
        if !(self.viewport.width > 0.0 && self.viewport.height > 0.0) {
            return Err(ConfigError::InvalidViewport {
                width: self.viewport.width,
                height: self.viewport.height,
            });
        }
        if !(self.scale_k > 0.0) {
            return Err(ConfigError::InvalidScaleConstant(self.scale_k));
        }
        if !(self.min_scale > 0.0 && self.min_scale <= self.max_scale && self.max_scale <= 1.0) {
            return Err(ConfigError::InvalidScaleRange {
                min: self.min_scale,
                max: self.max_scale,
            });
        }
        if !(self.pitch_limit_degrees > 0.0) {
            return Err(ConfigError::InvalidPitchLimit(self.pitch_limit_degrees));
        }
        Ok(())
    }

    pub fn half_fov(&self) -> f64 {
        self.fov_degrees / 2.0
    }
}
