//! Recorded sensor feeds
//!
//! A feed is a JSON-lines file of timestamped sensor events, one per line:
//!
//! ```text
//! {"type":"permission","state":"granted"}
//! {"atMs":0,"type":"location","lat":52.3702,"lng":4.8952}
//! {"atMs":250,"type":"orientation","alpha":270.0,"beta":5.0}
//! {"atMs":4000,"type":"locationError","code":"timeout","message":"no fix"}
//! ```
//!
//! Playing a feed pushes the events into channel providers at their recorded
//! offsets, which makes a walk through a park reproducible at a desk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use charmhunt_core::{GeoPoint, OrientationSample, PermissionState, SensorError};

use crate::providers::{
    channel_location, channel_orientation, ChannelLocation, ChannelOrientation, LocationFeed,
    OrientationFeed,
};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("cannot read feed {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("feed line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
}

/// Kind of location failure, mirroring what platform geolocation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LocationErrorCode {
    Denied,
    Unavailable,
    Timeout,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SensorEvent {
    Location {
        lat: f64,
        lng: f64,
    },
    LocationError {
        #[serde(default)]
        code: LocationErrorCode,
        #[serde(default)]
        message: String,
    },
    /// Raw device angles, see [`OrientationSample::from_device`]
    Orientation {
        alpha: Option<f64>,
        beta: Option<f64>,
    },
    /// Answer the orientation provider gives to permission requests
    Permission {
        state: PermissionState,
    },
}

impl LocationErrorCode {
    fn to_sensor_error(self, message: &str) -> SensorError {
        match self {
            LocationErrorCode::Denied => SensorError::PermissionDenied,
            LocationErrorCode::Unavailable => SensorError::Unavailable(message.to_string()),
            LocationErrorCode::Timeout => SensorError::Timeout,
            LocationErrorCode::Other => SensorError::Other(message.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    /// Offset from the start of playback
    #[serde(default)]
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: SensorEvent,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    entries: Vec<FeedEntry>,
}

/// A feed being played back into a pair of providers
pub struct Playback {
    pub location: ChannelLocation,
    pub orientation: ChannelOrientation,
    /// Finishes once every event has been delivered
    pub task: JoinHandle<()>,
}

impl Feed {
    /// Parse a JSON-lines document. Blank lines and lines starting with `#`
    /// are skipped. Entries are ordered by `atMs`, keeping file order for
    /// equal offsets.
    pub fn parse(s: &str) -> Result<Feed, FeedError> {
        let mut entries = Vec::new();
        for (i, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let entry: FeedEntry = serde_json::from_str(line)
                .map_err(|source| FeedError::Parse { line: i + 1, source })?;
            entries.push(entry);
        }
        entries.sort_by_key(|e| e.at_ms);
        Ok(Feed { entries })
    }

    pub async fn load(path: &Path) -> Result<Feed, FeedError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FeedError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let feed = Feed::parse(&text)?;
        log::debug!(
            "{}: {} events over {:?}",
            path.display(),
            feed.len(),
            feed.duration()
        );
        Ok(feed)
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.entries.last().map(|e| e.at_ms).unwrap_or(0))
    }

    /// The first declared permission answer, or `NotRequired`
    pub fn permission(&self) -> PermissionState {
        self.entries
            .iter()
            .find_map(|e| match e.event {
                SensorEvent::Permission { state } => Some(state),
                _ => None,
            })
            .unwrap_or(PermissionState::NotRequired)
    }

    /// Start playing the feed on the current runtime.
    ///
    /// The senders are dropped when the feed runs out, which ends both
    /// provider streams.
    pub fn play(self, cancel: CancellationToken) -> Playback {
        let (location_feed, location) = channel_location();
        let (orientation_feed, orientation) = channel_orientation(self.permission());
        let task = tokio::spawn(self.run(location_feed, orientation_feed, cancel));
        Playback {
            location,
            orientation,
            task,
        }
    }

    async fn run(
        self,
        location: LocationFeed,
        orientation: OrientationFeed,
        cancel: CancellationToken,
    ) {
        let start = Instant::now();

        for entry in self.entries {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("feed playback cancelled");
                    return;
                }
                _ = sleep_until(start + Duration::from_millis(entry.at_ms)) => {}
            }

            match entry.event {
                SensorEvent::Location { lat, lng } => {
                    location.send_fix(GeoPoint::new(lat, lng));
                }
                SensorEvent::LocationError { code, message } => {
                    location.send_error(code.to_sensor_error(&message));
                }
                SensorEvent::Orientation { alpha, beta } => {
                    orientation.send_sample(OrientationSample::from_device(alpha, beta));
                }
                SensorEvent::Permission { .. } => {}
            }

            if location.is_closed() && orientation.is_closed() {
                log::debug!("feed playback stopped, nobody is listening");
                return;
            }
        }
        log::debug!("feed playback finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{LocationProvider, OrientationProvider};
    use futures::StreamExt;
    use std::io::Write;

    const WALK: &str = r#"
# a short walk
{"type":"permission","state":"denied"}
{"atMs":1000,"type":"orientation","alpha":90}
{"atMs":0,"type":"location","lat":1.5,"lng":-2}

{"atMs":2000,"type":"locationError","code":"timeout","message":"slow"}
"#;

    #[test]
    fn test_parse_orders_entries() {
        let feed = Feed::parse(WALK).unwrap();
        assert_eq!(feed.len(), 4);
        assert_eq!(feed.duration(), Duration::from_millis(2000));
        assert_eq!(feed.permission(), PermissionState::Denied);

        let e = &feed.entries()[1];
        assert_eq!(e.at_ms, 0);
        assert_eq!(e.event, SensorEvent::Location { lat: 1.5, lng: -2.0 });

        assert_eq!(
            feed.entries()[2].event,
            SensorEvent::Orientation {
                alpha: Some(90.0),
                beta: None
            }
        );
    }

    #[test]
    fn test_parse_reports_line() {
        let text = "{\"type\":\"location\",\"lat\":1,\"lng\":2}\n{\"type\":\"teleport\"}";
        let err = Feed::parse(text).unwrap_err();
        match err {
            FeedError::Parse { line, .. } => assert_eq!(line, 2),
            e => panic!("unexpected error {}", e),
        }
    }

    #[test]
    fn test_default_permission_and_error_code() {
        let feed = Feed::parse(r#"{"type":"locationError"}"#).unwrap();
        assert_eq!(feed.permission(), PermissionState::NotRequired);
        assert_eq!(
            feed.entries()[0].event,
            SensorEvent::LocationError {
                code: LocationErrorCode::Other,
                message: String::new()
            }
        );
        assert_eq!(
            LocationErrorCode::Denied.to_sensor_error(""),
            SensorError::PermissionDenied
        );
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(WALK.as_bytes()).unwrap();
        let feed = Feed::load(file.path()).await.unwrap();
        assert_eq!(feed.len(), 4);

        let missing = file.path().with_extension("missing");
        assert!(matches!(
            Feed::load(&missing).await,
            Err(FeedError::Io { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_delivers_in_time() {
        let feed = Feed::parse(
            r#"{"type":"permission","state":"granted"}
{"atMs":0,"type":"location","lat":1,"lng":2}
{"atMs":500,"type":"orientation","alpha":90,"beta":10}
{"atMs":1500,"type":"locationError","code":"unavailable","message":"gone"}"#,
        )
        .unwrap();

        let start = Instant::now();
        let mut playback = feed.play(CancellationToken::new());
        assert_eq!(
            playback.orientation.request_permission().await,
            PermissionState::Granted
        );
        let mut fixes = playback.location.watch_position().await.unwrap();
        let mut samples = playback.orientation.watch_orientation().await.unwrap();

        assert_eq!(fixes.next().await, Some(Ok(GeoPoint::new(1.0, 2.0))));

        let sample = samples.next().await.unwrap().unwrap();
        assert_eq!(sample.heading_degrees, Some(270.0));
        assert_eq!(sample.pitch_degrees, 10.0);
        assert!(start.elapsed() >= Duration::from_millis(500));

        assert_eq!(
            fixes.next().await,
            Some(Err(SensorError::Unavailable("gone".to_string())))
        );
        assert!(start.elapsed() >= Duration::from_millis(1500));

        // Feed exhausted: both streams end
        assert_eq!(fixes.next().await, None);
        assert!(samples.next().await.is_none());
        playback.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_cancel() {
        let feed = Feed::parse(r#"{"atMs":60000,"type":"location","lat":1,"lng":2}"#).unwrap();
        let cancel = CancellationToken::new();
        let mut playback = feed.play(cancel.clone());
        let mut fixes = playback.location.watch_position().await.unwrap();

        cancel.cancel();
        playback.task.await.unwrap();
        assert_eq!(fixes.next().await, None);
    }
}
