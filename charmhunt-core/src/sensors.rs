//! Sensor sample and capability types
//!
//! These are the values exchanged between the platform sensor providers and
//! the targeting engine. The providers themselves live with the runtime; the
//! core only needs to know what a sample looks like and how a permission
//! negotiation can end.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::normalize_degrees;

/// Errors reported by a location or orientation source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SensorError {
    /// The platform has no such sensor
    #[error("sensor unavailable: {0}")]
    Unavailable(String),
    /// The user or platform refused access
    #[error("permission denied")]
    PermissionDenied,
    /// No sample arrived within the platform timeout
    #[error("timed out waiting for sensor")]
    Timeout,
    /// Any other transient platform error
    #[error("sensor error: {0}")]
    Other(String),
}

/// Outcome of an explicit permission negotiation.
///
/// Some platforms require a user-gesture-triggered request before sensors
/// may be read; others do not ask at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionState {
    Granted,
    Denied,
    NotRequired,
}

impl PermissionState {
    pub fn allows_access(&self) -> bool {
        !matches!(self, PermissionState::Denied)
    }
}

/// Where a sensor feed currently stands, as seen by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SensorStatus {
    /// Not started, or no sample received yet
    #[default]
    Pending,
    /// At least one sample received
    Active,
    Denied,
    Unavailable,
}

impl std::fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SensorStatus::Pending => "pending",
            SensorStatus::Active => "active",
            SensorStatus::Denied => "denied",
            SensorStatus::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}

/// One reading from the orientation sensor.
///
/// `heading_degrees` is a compass heading in `[0, 360)`; `None` means the
/// device has not delivered a compass reading (common on desktops).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationSample {
    pub heading_degrees: Option<f64>,
    /// Forward/back tilt in `[-180, 180]`
    pub pitch_degrees: f64,
}

impl OrientationSample {
    pub fn new(heading_degrees: Option<f64>, pitch_degrees: f64) -> Self {
        OrientationSample {
            heading_degrees: heading_degrees.map(normalize_degrees),
            pitch_degrees,
        }
    }

    /// Build a sample from raw device orientation angles.
    ///
    /// `alpha` rotates counter-clockwise from north, so the compass heading
    /// is `360 - alpha`. `beta` is the forward/back tilt. Missing angles give
    /// an absent heading and a level pitch respectively.
    pub fn from_device(alpha: Option<f64>, beta: Option<f64>) -> Self {
        OrientationSample {
            heading_degrees: alpha.map(|a| normalize_degrees(360.0 - a)),
            pitch_degrees: beta.unwrap_or(0.0),
        }
    }
}
