//! AR Targeting State
//!
//! `ArState` is derived from three inputs: the player's position, the latest
//! orientation sample and the target spawn. It has no lifecycle of its own
//! and is recomputed from scratch whenever any input changes.

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::ArConfig;
use crate::geo::{self, GeoPoint};
use crate::hunt::{guidance, Guidance};
use crate::projection::{self, ScreenPosition};
use crate::sensors::OrientationSample;

/// A target pinned to a real-world position, with a capture radius
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spawn {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lat: f64,
    pub lng: f64,
    /// Capture radius in meters
    pub radius: f64,
}

impl Spawn {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64, radius: f64) -> Self {
        Spawn {
            id: id.into(),
            name: None,
            lat,
            lng,
            radius,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    /// Name for log lines and labels, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Why the target is or is not on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    /// Player position or target unknown
    NoPosition,
    /// Bearing known but no compass heading yet
    AcquiringCompass,
    /// Heading known, target outside the field of view
    OutOfView,
    InView,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArState {
    /// Meters to the target; infinite when either end is unknown.
    /// JSON carries the infinite distance as `null`.
    #[serde(deserialize_with = "distance_or_unknown")]
    pub distance_meters: f64,
    pub bearing_degrees: Option<f64>,
    /// In `(-180, 180]`, positive to the right
    pub relative_angle_degrees: Option<f64>,
    pub visible: bool,
    pub in_radius: bool,
    pub visibility: Visibility,
    pub screen: ScreenPosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<Guidance>,
}

impl ArState {
    /// Derive the full state from the current inputs.
    pub fn compute(
        position: Option<GeoPoint>,
        orientation: Option<&OrientationSample>,
        target: Option<&Spawn>,
        config: &ArConfig,
    ) -> ArState {
        let endpoints = position.zip(target.map(Spawn::position));

        let distance_meters = endpoints
            .map(|(me, it)| geo::distance(me, it))
            .unwrap_or(f64::INFINITY);
        let bearing_degrees = endpoints.map(|(me, it)| geo::bearing(me, it));

        let heading = orientation.and_then(|o| o.heading_degrees);
        let pitch = orientation.map(|o| o.pitch_degrees).unwrap_or(0.0);

        let relative_angle_degrees = bearing_degrees
            .zip(heading)
            .map(|(b, h)| geo::relative_angle(b, h));

        let visible = relative_angle_degrees
            .map(|rel| rel.abs() <= config.half_fov())
            .unwrap_or(false);

        let visibility = match (bearing_degrees, relative_angle_degrees) {
            (None, _) => Visibility::NoPosition,
            (Some(_), None) => Visibility::AcquiringCompass,
            (Some(_), Some(_)) if visible => Visibility::InView,
            (Some(_), Some(_)) => Visibility::OutOfView,
        };

        // Infinite distance compares false against any finite radius
        let in_radius = target.map(|t| distance_meters <= t.radius).unwrap_or(false);

        let screen = projection::project(relative_angle_degrees, pitch, distance_meters, config);

        let mut state = ArState {
            distance_meters,
            bearing_degrees,
            relative_angle_degrees,
            visible,
            in_radius,
            visibility,
            screen,
            hint: None,
        };
        state.hint = guidance(&state, &config.viewport);
        state
    }

    /// The state with nothing known yet
    pub fn unknown(config: &ArConfig) -> ArState {
        ArState::compute(None, None, None, config)
    }

    pub fn distance_known(&self) -> bool {
        self.distance_meters.is_finite()
    }
}

fn distance_or_unknown<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::INFINITY))
}
