//! Latest-sample cache for one hunt
//!
//! The tracker owns the most recent position and orientation for a single
//! target and re-derives the [`ArState`] on every update. It does no I/O and
//! has no notion of time, so it can be driven by any event loop.
//!
//! ```rust,ignore
//! use charmhunt_core::{ArConfig, GeoPoint, OrientationSample, Spawn, TargetTracker};
//!
//! let mut tracker = TargetTracker::new(Spawn::new("w1", 0.0, 0.001, 50.0), ArConfig::default());
//! tracker.update_position(GeoPoint::new(0.0, 0.0));
//! let state = tracker.update_orientation(OrientationSample::new(Some(90.0), 0.0));
//! assert!(state.visible);
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ArConfig;
use crate::geo::{self, GeoPoint};
use crate::sensors::{OrientationSample, SensorStatus};
use crate::state::{ArState, Spawn};

/// Everything a consumer needs to render one frame of the hunt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub state: ArState,
    pub position: Option<GeoPoint>,
    pub heading_degrees: Option<f64>,
    /// Set while `position` is the synthetic fallback point
    pub using_fallback_location: bool,
    pub location: SensorStatus,
    pub compass: SensorStatus,
}

#[derive(Debug, Clone)]
pub struct TargetTracker {
    target: Spawn,
    config: ArConfig,
    position: Option<GeoPoint>,
    orientation: Option<OrientationSample>,
    using_fallback: bool,
    location_status: SensorStatus,
    compass_status: SensorStatus,
    state: ArState,
}

impl TargetTracker {
    pub fn new(target: Spawn, config: ArConfig) -> Self {
        let state = ArState::compute(None, None, Some(&target), &config);
        TargetTracker {
            target,
            config,
            position: None,
            orientation: None,
            using_fallback: false,
            location_status: SensorStatus::Pending,
            compass_status: SensorStatus::Pending,
            state,
        }
    }

    pub fn target(&self) -> &Spawn {
        &self.target
    }

    pub fn config(&self) -> &ArConfig {
        &self.config
    }

    pub fn state(&self) -> &ArState {
        &self.state
    }

    pub fn position(&self) -> Option<GeoPoint> {
        self.position
    }

    pub fn using_fallback(&self) -> bool {
        self.using_fallback
    }

    pub fn has_real_fix(&self) -> bool {
        self.position.is_some() && !self.using_fallback
    }

    /// Store a real position fix. Replaces any fallback point.
    pub fn update_position(&mut self, position: GeoPoint) -> &ArState {
        if self.using_fallback {
            log::info!(
                "{}: real location fix received, leaving fallback mode",
                self.target.id
            );
        }
        self.position = Some(position);
        self.using_fallback = false;
        self.location_status = SensorStatus::Active;
        self.recompute()
    }

    pub fn update_orientation(&mut self, sample: OrientationSample) -> &ArState {
        self.orientation = Some(sample);
        if sample.heading_degrees.is_some() {
            self.compass_status = SensorStatus::Active;
        }
        self.recompute()
    }

    /// The synthetic position near the target used when no fix arrives
    pub fn fallback_position(&self) -> GeoPoint {
        let fallback = &self.config.fallback;
        geo::destination(
            self.target.position(),
            fallback.bearing_degrees,
            fallback.offset_meters,
        )
    }

    /// Substitute the fallback position. Ignored once a real fix exists.
    ///
    /// Returns true if the fallback was applied.
    pub fn use_fallback_position(&mut self) -> bool {
        if self.has_real_fix() {
            return false;
        }
        let point = self.fallback_position();
        log::warn!(
            "{}: no location fix, using fallback position {:.6},{:.6}",
            self.target.id,
            point.lat,
            point.lng
        );
        self.position = Some(point);
        self.using_fallback = true;
        self.recompute();
        true
    }

    pub fn set_location_status(&mut self, status: SensorStatus) {
        self.location_status = status;
    }

    pub fn set_compass_status(&mut self, status: SensorStatus) {
        self.compass_status = status;
    }

    pub fn location_status(&self) -> SensorStatus {
        self.location_status
    }

    pub fn compass_status(&self) -> SensorStatus {
        self.compass_status
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            position: self.position,
            heading_degrees: self.orientation.and_then(|o| o.heading_degrees),
            using_fallback_location: self.using_fallback,
            location: self.location_status,
            compass: self.compass_status,
        }
    }

    fn recompute(&mut self) -> &ArState {
        self.state = ArState::compute(
            self.position,
            self.orientation.as_ref(),
            Some(&self.target),
            &self.config,
        );
        log::trace!("{}: {:?}", self.target.id, self.state);
        &self.state
    }
}
