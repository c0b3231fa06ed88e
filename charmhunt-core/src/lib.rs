//! Charmhunt Core
//!
//! Platform-independent targeting engine for the Charmhunt location game.
//! Turns a GPS position, a compass heading and a target's fixed coordinates
//! into a screen position, a visibility test and a capture-range test.
//!
//! This crate does no I/O and pulls in no async runtime. Sensor streams are
//! driven by the embedding runtime (see the `charmhunt-session` crate),
//! which feeds samples into a [`TargetTracker`].
//!
//! # Modules
//!
//! - [`geo`]: haversine distance, bearing, relative angle, destination point
//! - [`compass`]: eight-way direction arrows and distance labels
//! - [`projection`]: sprite placement and scaling
//! - [`state`]: [`Spawn`] targets and the derived [`ArState`]
//! - [`tracker`]: latest-sample cache producing [`Snapshot`]s
//! - [`sensors`]: sample, permission and sensor error types
//! - [`config`]: [`ArConfig`] and its defaults
//! - [`hunt`]: guidance hints, target selection and the capture flow

pub mod compass;
pub mod config;
pub mod geo;
pub mod hunt;
pub mod projection;
pub mod sensors;
pub mod state;
pub mod tracker;

pub use compass::{direction_arrow, format_distance, Direction};
pub use config::{ArConfig, ConfigError, FallbackConfig, Viewport};
pub use geo::{bearing, distance, relative_angle, GeoPoint};
pub use hunt::{
    attempt_capture, can_capture, Authenticator, Capture, CaptureError, CaptureOutcome,
    CaptureStore, Guidance, MemoryStore, ProximityIndicator, SpawnDirectory, StoreError, UserId,
};
pub use projection::ScreenPosition;
pub use sensors::{OrientationSample, PermissionState, SensorError, SensorStatus};
pub use state::{ArState, Spawn, Visibility};
pub use tracker::{Snapshot, TargetTracker};
