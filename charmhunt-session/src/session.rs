//! AR targeting session
//!
//! A [`HuntSession`] runs as a single task that owns a [`TargetTracker`] and
//! reacts to whatever arrives first: a position fix, an orientation sample,
//! a permission request from the UI, the fallback timer or cancellation.
//! Every change is published as a [`Snapshot`], so consumers re-render on
//! each emitted state and never poll. [`SessionHandle::subscribe`] follows the
//! latest state; [`SessionHandle::events`] delivers every snapshot in order.
//!
//! ```rust,ignore
//! let session = HuntSession::new(spawn, ArConfig::default(), location, orientation).start();
//! let mut updates = session.subscribe();
//!
//! // From the "grant compass" button handler:
//! if !session.request_orientation_permission().await {
//!     show_compass_denied_message();
//! }
//!
//! while updates.changed().await.is_ok() {
//!     render(&updates.borrow_and_update());
//! }
//! ```

use std::time::Duration;

use futures::stream::{BoxStream, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use charmhunt_core::{
    ArConfig, GeoPoint, OrientationSample, SensorError, SensorStatus, Snapshot, Spawn,
    TargetTracker,
};

use crate::providers::{LocationProvider, OrientationProvider, OrientationStream};

/// Requests from the UI side to the running session
enum Command {
    EnableOrientation(oneshot::Sender<bool>),
}

// Permission requests are rare; a tiny queue is plenty
const COMMAND_QUEUE_LEN: usize = 4;

/// Snapshots kept for `events()` receivers that fall behind
const EVENT_BACKLOG: usize = 256;

pub struct HuntSession<L, O> {
    tracker: TargetTracker,
    location: L,
    orientation: O,
}

impl<L, O> HuntSession<L, O>
where
    L: LocationProvider + 'static,
    O: OrientationProvider + 'static,
{
    pub fn new(target: Spawn, config: ArConfig, location: L, orientation: O) -> Self {
        HuntSession {
            tracker: TargetTracker::new(target, config),
            location,
            orientation,
        }
    }

    /// Spawn the session task on the current runtime.
    pub fn start(self) -> SessionHandle {
        let key = self.tracker.target().id.clone();
        let (state_tx, state_rx) = watch::channel(self.tracker.snapshot());
        let (events_tx, _) = broadcast::channel(EVENT_BACKLOG);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_LEN);
        let cancel = CancellationToken::new();

        log::debug!(
            "{}: starting hunt for {} (radius {}m, fov {}°)",
            key,
            self.tracker.target().display_name(),
            self.tracker.target().radius,
            self.tracker.config().fov_degrees
        );

        let task = SessionTask {
            key: key.clone(),
            tracker: self.tracker,
            location: self.location,
            orientation: self.orientation,
            orientation_started: false,
            location_error_reported: false,
            state_tx,
            events_tx: events_tx.clone(),
        };
        let join = tokio::spawn(task.run(command_rx, cancel.clone()));

        SessionHandle {
            key,
            state_rx,
            events_tx,
            command_tx,
            cancel,
            join: Some(join),
        }
    }
}

/// Handle to a running session. Dropping it stops the session.
pub struct SessionHandle {
    key: String,
    state_rx: watch::Receiver<Snapshot>,
    events_tx: broadcast::Sender<Snapshot>,
    command_tx: mpsc::Sender<Command>,
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl SessionHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Receiver for the latest state. Snapshots published in quick
    /// succession are seen as one change.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.state_rx.clone()
    }

    /// Every snapshot published from now on, in order. A receiver more than
    /// `EVENT_BACKLOG` snapshots behind gets `RecvError::Lagged`.
    pub fn events(&self) -> broadcast::Receiver<Snapshot> {
        self.events_tx.subscribe()
    }

    /// The most recently published snapshot
    pub fn snapshot(&self) -> Snapshot {
        *self.state_rx.borrow()
    }

    /// Ask for compass access and start the orientation stream if granted.
    ///
    /// Call this from a direct user interaction. Returns false if access was
    /// denied, the sensor is unavailable or the session has stopped; the
    /// session keeps running in either case. Once the stream is running,
    /// further calls return true without re-subscribing.
    pub async fn request_orientation_permission(&self) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .command_tx
            .send(Command::EnableOrientation(reply_tx))
            .await
            .is_err()
        {
            log::debug!("{}: permission request after session stopped", self.key);
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Stop the session. Both sensor streams are dropped by the task.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.join.as_ref().map(|j| j.is_finished()).unwrap_or(true)
    }

    /// Stop the session and wait for its task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take() {
            if let Err(e) = join.await {
                log::error!("{}: session task failed: {}", self.key, e);
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct SessionTask<L, O> {
    key: String,
    tracker: TargetTracker,
    location: L,
    orientation: O,
    orientation_started: bool,
    location_error_reported: bool,
    state_tx: watch::Sender<Snapshot>,
    events_tx: broadcast::Sender<Snapshot>,
}

impl<L, O> SessionTask<L, O>
where
    L: LocationProvider,
    O: OrientationProvider,
{
    async fn run(mut self, mut commands: mpsc::Receiver<Command>, cancel: CancellationToken) {
        let mut location = match self.location.watch_position().await {
            Ok(stream) => Some(stream),
            Err(e) => {
                self.on_location_error(e);
                None
            }
        };
        let mut orientation: Option<OrientationStream> = None;

        let fallback = self.tracker.config().fallback;
        let mut fallback_armed = fallback.enabled;
        let fallback_timer = sleep(Duration::from_millis(fallback.wait_ms));
        tokio::pin!(fallback_timer);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("{}: session cancelled", self.key);
                    break;
                }
                Some(command) = commands.recv() => match command {
                    Command::EnableOrientation(reply) => {
                        let granted = self.enable_orientation(&mut orientation).await;
                        let _ = reply.send(granted);
                    }
                },
                item = next_item(&mut location) => match item {
                    Some(Ok(point)) => {
                        fallback_armed = false;
                        self.on_position(point);
                    }
                    Some(Err(e)) => self.on_location_error(e),
                    None => {
                        log::info!("{}: location stream ended", self.key);
                        location = None;
                    }
                },
                item = next_item(&mut orientation) => match item {
                    Some(Ok(sample)) => self.on_orientation(sample),
                    Some(Err(e)) => self.on_orientation_error(e),
                    None => {
                        log::info!("{}: orientation stream ended", self.key);
                        orientation = None;
                    }
                },
                () = &mut fallback_timer, if fallback_armed => {
                    fallback_armed = false;
                    if self.tracker.use_fallback_position() {
                        self.publish();
                    }
                }
            }
        }

        // Dropping the streams ends the providers' watches
        drop(location);
        drop(orientation);
        log::debug!("{}: session stopped", self.key);
    }

    async fn enable_orientation(&mut self, orientation: &mut Option<OrientationStream>) -> bool {
        if self.orientation_started {
            return true;
        }

        let permission = self.orientation.request_permission().await;
        if !permission.allows_access() {
            log::warn!("{}: orientation permission denied", self.key);
            self.tracker.set_compass_status(SensorStatus::Denied);
            self.publish();
            return false;
        }

        match self.orientation.watch_orientation().await {
            Ok(stream) => {
                log::debug!(
                    "{}: orientation stream started ({:?})",
                    self.key,
                    permission
                );
                *orientation = Some(stream);
                self.orientation_started = true;
                true
            }
            Err(e) => {
                log::warn!("{}: cannot start orientation stream: {}", self.key, e);
                self.tracker.set_compass_status(status_for(&e));
                self.publish();
                false
            }
        }
    }

    fn on_position(&mut self, point: GeoPoint) {
        log::trace!("{}: fix {:.6},{:.6}", self.key, point.lat, point.lng);
        self.location_error_reported = false;
        self.tracker.update_position(point);
        self.publish();
    }

    fn on_orientation(&mut self, sample: OrientationSample) {
        self.tracker.update_orientation(sample);
        self.publish();
    }

    fn on_location_error(&mut self, error: SensorError) {
        match error {
            SensorError::Timeout | SensorError::Other(_) => {
                log::debug!("{}: location: {}", self.key, error);
            }
            SensorError::Unavailable(_) | SensorError::PermissionDenied => {
                if !self.location_error_reported {
                    log::warn!("{}: location: {}", self.key, error);
                    self.location_error_reported = true;
                }
                // A stale fix is still better than nothing
                if self.tracker.position().is_none() {
                    self.tracker.set_location_status(status_for(&error));
                    self.publish();
                }
            }
        }
    }

    fn on_orientation_error(&mut self, error: SensorError) {
        log::debug!("{}: orientation: {}", self.key, error);
        if matches!(
            error,
            SensorError::Unavailable(_) | SensorError::PermissionDenied
        ) {
            self.tracker.set_compass_status(status_for(&error));
            self.publish();
        }
    }

    fn publish(&self) {
        let snapshot = self.tracker.snapshot();
        self.state_tx.send_replace(snapshot);
        // Nobody listening is fine
        let _ = self.events_tx.send(snapshot);
    }
}

fn status_for(error: &SensorError) -> SensorStatus {
    match error {
        SensorError::PermissionDenied => SensorStatus::Denied,
        SensorError::Unavailable(_) => SensorStatus::Unavailable,
        SensorError::Timeout | SensorError::Other(_) => SensorStatus::Pending,
    }
}

/// Next item of an optional stream; pending forever when there is none
async fn next_item<T>(stream: &mut Option<BoxStream<'static, T>>) -> Option<T> {
    match stream {
        Some(s) => s.next().await,
        None => std::future::pending().await,
    }
}
