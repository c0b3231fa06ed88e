//! Screen-space projection of a target sprite
//!
//! Horizontal position follows the relative angle across the field of view,
//! vertical position follows device pitch, and the sprite shrinks with
//! distance.

use serde::{Deserialize, Serialize};

use crate::config::ArConfig;

/// Where to draw the target sprite, in viewport pixels.
///
/// `x` and `y` are absent while the relative angle is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPosition {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub scale: f64,
}

/// Sprite scale for a target at `distance` meters.
///
/// `k / (d + k)`, clamped to the configured range. Never increases with
/// distance; an unknown (infinite) distance gives the minimum scale.
pub fn sprite_scale(distance: f64, config: &ArConfig) -> f64 {
    let k = config.scale_k;
    let raw = if distance.is_finite() {
        k / (distance.max(0.0) + k)
    } else {
        0.0
    };
    raw.max(config.min_scale).min(config.max_scale)
}

/// Horizontal pixel position for a relative angle.
///
/// The relative angle is normalized against half the field of view, so a
/// target on the edge of the view lands on the edge of the viewport and one
/// outside the view lands off screen.
pub fn screen_x(relative_angle: f64, config: &ArConfig) -> f64 {
    let x_norm = (relative_angle / config.half_fov()) * 0.5;
    (0.5 + x_norm) * config.viewport.width
}

/// Vertical pixel position for a device pitch.
///
/// Pitch is clamped to `±pitch_limit`; level is the vertical center and
/// tilting up moves the sprite towards the top.
pub fn screen_y(pitch: f64, config: &ArConfig) -> f64 {
    let limit = config.pitch_limit_degrees;
    let clamped = pitch.max(-limit).min(limit);
    (0.5 - clamped / (2.0 * limit)) * config.viewport.height
}

pub fn project(
    relative_angle: Option<f64>,
    pitch: f64,
    distance: f64,
    config: &ArConfig,
) -> ScreenPosition {
    let scale = sprite_scale(distance, config);
    match relative_angle {
        Some(rel) => ScreenPosition {
            x: Some(screen_x(rel, config)),
            y: Some(screen_y(pitch, config)),
            scale,
        },
        None => ScreenPosition {
            x: None,
            y: None,
            scale,
        },
    }
}
