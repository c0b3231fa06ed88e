//! Sensor stream providers for hunt sessions.
//!
//! A session never touches platform sensors directly. It asks a
//! [`LocationProvider`] and an [`OrientationProvider`] for streams of samples
//! and drops those streams when it stops, which is how the providers learn
//! that the watch has ended.
//!
//! The channel-backed providers here hand the sending half to the caller, so
//! tests, replay feeds and embedding applications can push samples in
//! whatever way suits them.

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::stream::{BoxStream, StreamExt};

use charmhunt_core::{GeoPoint, OrientationSample, PermissionState, SensorError};

pub type LocationStream = BoxStream<'static, Result<GeoPoint, SensorError>>;
pub type OrientationStream = BoxStream<'static, Result<OrientationSample, SensorError>>;

/// Source of position fixes.
#[async_trait]
pub trait LocationProvider: Send {
    /// Start a continuous position watch.
    ///
    /// Returns an error if the platform has no location capability.
    async fn watch_position(&mut self) -> Result<LocationStream, SensorError>;
}

/// Source of compass heading and pitch.
#[async_trait]
pub trait OrientationProvider: Send {
    /// Negotiate access. Must be triggered from a user interaction on
    /// platforms that require it.
    async fn request_permission(&mut self) -> PermissionState;

    /// Start the orientation stream. Only called after access was granted.
    async fn watch_orientation(&mut self) -> Result<OrientationStream, SensorError>;
}

/// Sending half of a channel-backed location provider
#[derive(Clone)]
pub struct LocationFeed {
    tx: mpsc::UnboundedSender<Result<GeoPoint, SensorError>>,
}

impl LocationFeed {
    /// Push a fix. Returns false once the session has stopped watching.
    pub fn send_fix(&self, point: GeoPoint) -> bool {
        self.tx.unbounded_send(Ok(point)).is_ok()
    }

    pub fn send_error(&self, error: SensorError) -> bool {
        self.tx.unbounded_send(Err(error)).is_ok()
    }

    /// True once the receiving stream has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Sending half of a channel-backed orientation provider
#[derive(Clone)]
pub struct OrientationFeed {
    tx: mpsc::UnboundedSender<Result<OrientationSample, SensorError>>,
}

impl OrientationFeed {
    pub fn send_sample(&self, sample: OrientationSample) -> bool {
        self.tx.unbounded_send(Ok(sample)).is_ok()
    }

    pub fn send_error(&self, error: SensorError) -> bool {
        self.tx.unbounded_send(Err(error)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Location provider fed through a [`LocationFeed`]
pub struct ChannelLocation {
    rx: Option<mpsc::UnboundedReceiver<Result<GeoPoint, SensorError>>>,
}

/// Orientation provider fed through an [`OrientationFeed`]
pub struct ChannelOrientation {
    permission: PermissionState,
    rx: Option<mpsc::UnboundedReceiver<Result<OrientationSample, SensorError>>>,
}

/// Create a location provider and the feed that drives it.
pub fn channel_location() -> (LocationFeed, ChannelLocation) {
    let (tx, rx) = mpsc::unbounded();
    (LocationFeed { tx }, ChannelLocation { rx: Some(rx) })
}

/// Create an orientation provider that answers permission requests with
/// `permission`, and the feed that drives it.
pub fn channel_orientation(permission: PermissionState) -> (OrientationFeed, ChannelOrientation) {
    let (tx, rx) = mpsc::unbounded();
    (
        OrientationFeed { tx },
        ChannelOrientation {
            permission,
            rx: Some(rx),
        },
    )
}

#[async_trait]
impl LocationProvider for ChannelLocation {
    async fn watch_position(&mut self) -> Result<LocationStream, SensorError> {
        self.rx
            .take()
            .map(|rx| rx.boxed())
            .ok_or_else(|| SensorError::Unavailable("location feed already in use".to_string()))
    }
}

#[async_trait]
impl OrientationProvider for ChannelOrientation {
    async fn request_permission(&mut self) -> PermissionState {
        self.permission
    }

    async fn watch_orientation(&mut self) -> Result<OrientationStream, SensorError> {
        if !self.permission.allows_access() {
            return Err(SensorError::PermissionDenied);
        }
        self.rx
            .take()
            .map(|rx| rx.boxed())
            .ok_or_else(|| SensorError::Unavailable("orientation feed already in use".to_string()))
    }
}

/// Provider for a device without the sensor at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSensor;

#[async_trait]
impl LocationProvider for NoSensor {
    async fn watch_position(&mut self) -> Result<LocationStream, SensorError> {
        Err(SensorError::Unavailable("no location capability".to_string()))
    }
}

#[async_trait]
impl OrientationProvider for NoSensor {
    async fn request_permission(&mut self) -> PermissionState {
        PermissionState::NotRequired
    }

    async fn watch_orientation(&mut self) -> Result<OrientationStream, SensorError> {
        Err(SensorError::Unavailable("no orientation capability".to_string()))
    }
}
