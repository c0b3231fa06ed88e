//! Hunt flow: guidance, target selection and captures
//!
//! The spawn listing, capture persistence and bearer-token verification are
//! external services. They are reached through the [`SpawnDirectory`],
//! [`CaptureStore`] and [`Authenticator`] traits; [`MemoryStore`] is an
//! in-memory implementation of the first two.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compass::{direction_arrow, format_distance, Direction};
use crate::config::Viewport;
use crate::geo::{self, GeoPoint};
use crate::state::{ArState, Spawn};

/// Fraction of the viewport height above/below which the player is told to
/// tilt the device instead of turning
const VERTICAL_HINT_BAND: f64 = 0.2;

/// Opaque user identifier issued by the authentication service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// On-screen hint telling the player how to bring the target into view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Guidance {
    TurnLeft,
    TurnRight,
    LookUp,
    LookDown,
    AcquiringCompass,
}

impl Guidance {
    pub fn glyph(&self) -> &'static str {
        match self {
            Guidance::TurnLeft => "←",
            Guidance::TurnRight => "→",
            Guidance::LookUp => "↑",
            Guidance::LookDown => "↓",
            Guidance::AcquiringCompass => "↻",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            Guidance::TurnLeft => "Turn Left",
            Guidance::TurnRight => "Turn Right",
            Guidance::LookUp => "Look Up",
            Guidance::LookDown => "Look Down",
            Guidance::AcquiringCompass => "Looking for compass...",
        }
    }
}

/// Hint for the current state, or `None` when the target is on screen or
/// nothing is known yet.
pub fn guidance(state: &ArState, viewport: &Viewport) -> Option<Guidance> {
    if state.visible {
        return None;
    }
    let Some(rel) = state.relative_angle_degrees else {
        return state.bearing_degrees.map(|_| Guidance::AcquiringCompass);
    };
    match state.screen.y {
        Some(y) if y < viewport.height * VERTICAL_HINT_BAND => Some(Guidance::LookUp),
        Some(y) if y > viewport.height * (1.0 - VERTICAL_HINT_BAND) => Some(Guidance::LookDown),
        _ if rel > 0.0 => Some(Guidance::TurnRight),
        _ => Some(Guidance::TurnLeft),
    }
}

/// The target can be captured when it is on screen and within its radius
pub fn can_capture(state: &ArState) -> bool {
    state.visible && state.in_radius
}

/// How much closer the player has to get, never negative
pub fn remaining_distance(state: &ArState, spawn: &Spawn) -> f64 {
    (state.distance_meters - spawn.radius).max(0.0)
}

/// Pick the spawn to hunt: the first one not yet captured, otherwise the
/// first one.
pub fn select_hunt_target<'a>(
    spawns: &'a [Spawn],
    captured: &HashSet<String>,
) -> Option<&'a Spawn> {
    spawns
        .iter()
        .find(|s| !captured.contains(&s.id))
        .or_else(|| spawns.first())
}

/// Closest spawn the player has not captured, with its distance
pub fn nearest_uncaptured<'a>(
    position: GeoPoint,
    spawns: &'a [Spawn],
    captured: &HashSet<String>,
) -> Option<(&'a Spawn, f64)> {
    spawns
        .iter()
        .filter(|s| !captured.contains(&s.id))
        .map(|s| (s, geo::distance(position, s.position())))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Map-screen indicator pointing at the nearest uncaptured spawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityIndicator {
    pub spawn_id: String,
    pub distance_meters: f64,
    pub distance_label: String,
    pub direction: Direction,
    pub in_range: bool,
}

impl ProximityIndicator {
    /// Build the indicator for a player at `position` facing `heading`.
    pub fn nearest(
        position: GeoPoint,
        heading: f64,
        spawns: &[Spawn],
        captured: &HashSet<String>,
    ) -> Option<ProximityIndicator> {
        let (spawn, distance) = nearest_uncaptured(position, spawns, captured)?;
        let bearing = geo::bearing(position, spawn.position());
        Some(ProximityIndicator {
            spawn_id: spawn.id.clone(),
            distance_meters: distance,
            distance_label: format_distance(distance),
            direction: direction_arrow(geo::relative_bearing(bearing, heading)),
            in_range: distance <= spawn.radius,
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("unknown spawn {0}")]
    UnknownSpawn(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("spawn {0} is not visible and in range")]
    NotCapturable(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A recorded capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    pub spawn_id: String,
    /// Milliseconds since epoch
    pub captured_at: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureOutcome {
    Captured,
    AlreadyCaptured,
}

pub trait SpawnDirectory {
    fn spawns(&self) -> Result<Vec<Spawn>, StoreError>;
}

pub trait CaptureStore {
    fn has_capture(&self, user: &UserId, spawn_id: &str) -> Result<bool, StoreError>;

    /// Record a capture. Saving the same (user, spawn) twice keeps the first.
    fn save_capture(&mut self, user: &UserId, capture: Capture) -> Result<(), StoreError>;

    fn captures(&self, user: &UserId) -> Result<Vec<Capture>, StoreError>;

    fn captured_ids(&self, user: &UserId) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .captures(user)?
            .into_iter()
            .map(|c| c.spawn_id)
            .collect())
    }
}

pub trait Authenticator {
    /// Resolve a bearer credential to a user, `None` if invalid or expired
    fn verify(&self, bearer: &str) -> Option<UserId>;
}

/// Capture `spawn` for the holder of `bearer`.
///
/// The state must show the spawn as capturable; a repeat capture succeeds
/// without writing.
pub fn attempt_capture<A, S>(
    auth: &A,
    store: &mut S,
    bearer: &str,
    spawn: &Spawn,
    state: &ArState,
    now_ms: u64,
) -> Result<CaptureOutcome, CaptureError>
where
    A: Authenticator + ?Sized,
    S: CaptureStore + ?Sized,
{
    let user = auth.verify(bearer).ok_or(CaptureError::Unauthorized)?;

    if !can_capture(state) {
        return Err(CaptureError::NotCapturable(spawn.id.clone()));
    }

    if store.has_capture(&user, &spawn.id)? {
        log::debug!("{}: {} already captured", user, spawn.id);
        return Ok(CaptureOutcome::AlreadyCaptured);
    }

    store.save_capture(
        &user,
        Capture {
            spawn_id: spawn.id.clone(),
            captured_at: now_ms,
        },
    )?;
    log::info!("{}: captured {}", user, spawn.display_name());
    Ok(CaptureOutcome::Captured)
}

/// In-memory spawn directory and capture store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    spawns: Vec<Spawn>,
    /// Captures per user, keyed by spawn id
    captures: BTreeMap<UserId, BTreeMap<String, Capture>>,
}

impl MemoryStore {
    pub fn new(spawns: Vec<Spawn>) -> Self {
        MemoryStore {
            spawns,
            captures: BTreeMap::new(),
        }
    }
}

impl SpawnDirectory for MemoryStore {
    fn spawns(&self) -> Result<Vec<Spawn>, StoreError> {
        Ok(self.spawns.clone())
    }
}

impl CaptureStore for MemoryStore {
    fn has_capture(&self, user: &UserId, spawn_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .captures
            .get(user)
            .map(|c| c.contains_key(spawn_id))
            .unwrap_or(false))
    }

    fn save_capture(&mut self, user: &UserId, capture: Capture) -> Result<(), StoreError> {
        if !self.spawns.iter().any(|s| s.id == capture.spawn_id) {
            return Err(StoreError::UnknownSpawn(capture.spawn_id));
        }
        self.captures
            .entry(user.clone())
            .or_default()
            .entry(capture.spawn_id.clone())
            .or_insert(capture);
        Ok(())
    }

    fn captures(&self, user: &UserId) -> Result<Vec<Capture>, StoreError> {
        Ok(self
            .captures
            .get(user)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArConfig;
    use crate::sensors::OrientationSample;

    struct FixedAuth;

    impl Authenticator for FixedAuth {
        fn verify(&self, bearer: &str) -> Option<UserId> {
            (bearer == "good-token").then(|| UserId("wallet-1".to_string()))
        }
    }

    fn spawns() -> Vec<Spawn> {
        vec![
            Spawn::new("w1", 0.0, 0.01, 50.0).with_name("Sakura"),
            Spawn::new("w2", 0.0, 0.001, 50.0).with_name("Luna"),
            Spawn::new("w3", 0.0, -0.0002, 50.0).with_name("Yuki"),
        ]
    }

    fn captured(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn state_at(position: GeoPoint, heading: Option<f64>, pitch: f64, spawn: &Spawn) -> ArState {
        ArState::compute(
            Some(position),
            Some(&OrientationSample::new(heading, pitch)),
            Some(spawn),
            &ArConfig::default(),
        )
    }

    #[test]
    fn test_select_hunt_target() {
        let spawns = spawns();
        assert_eq!(select_hunt_target(&spawns, &captured(&[])).unwrap().id, "w1");
        assert_eq!(select_hunt_target(&spawns, &captured(&["w1"])).unwrap().id, "w2");
        // Everything captured: fall back to the first one
        assert_eq!(
            select_hunt_target(&spawns, &captured(&["w1", "w2", "w3"])).unwrap().id,
            "w1"
        );
        assert!(select_hunt_target(&[], &captured(&[])).is_none());
    }

    #[test]
    fn test_nearest_uncaptured() {
        let spawns = spawns();
        let here = GeoPoint::new(0.0, 0.0);

        let (nearest, d) = nearest_uncaptured(here, &spawns, &captured(&[])).unwrap();
        assert_eq!(nearest.id, "w3");
        assert!((d - 22.24).abs() < 0.1);

        let (nearest, _) = nearest_uncaptured(here, &spawns, &captured(&["w3"])).unwrap();
        assert_eq!(nearest.id, "w2");

        assert!(nearest_uncaptured(here, &spawns, &captured(&["w1", "w2", "w3"])).is_none());
    }

    #[test]
    fn test_proximity_indicator() {
        let spawns = spawns();
        let here = GeoPoint::new(0.0, 0.0);

        // Facing north, nearest (w3) is due west
        let ind = ProximityIndicator::nearest(here, 0.0, &spawns, &captured(&[])).unwrap();
        assert_eq!(ind.spawn_id, "w3");
        assert_eq!(ind.direction, Direction::West);
        assert_eq!(ind.distance_label, "22m");
        assert!(ind.in_range);

        // Facing west, it is straight ahead
        let ind = ProximityIndicator::nearest(here, 270.0, &spawns, &captured(&[])).unwrap();
        assert_eq!(ind.direction, Direction::North);
    }

    #[test]
    fn test_guidance_turn_direction() {
        let spawns = spawns();
        let here = GeoPoint::new(0.0, 0.0);
        let target = &spawns[1]; // due east

        // Facing north: target to the right
        let state = state_at(here, Some(0.0), 0.0, target);
        assert_eq!(state.hint, Some(Guidance::TurnRight));

        // Facing south: target to the left
        let state = state_at(here, Some(180.0), 0.0, target);
        assert_eq!(state.hint, Some(Guidance::TurnLeft));

        // Facing it
        let state = state_at(here, Some(90.0), 0.0, target);
        assert_eq!(state.hint, None);
    }

    #[test]
    fn test_guidance_vertical() {
        let spawns = spawns();
        let here = GeoPoint::new(0.0, 0.0);
        let target = &spawns[1];

        // Tilted far up while turned away
        let state = state_at(here, Some(0.0), 55.0, target);
        assert_eq!(state.hint, Some(Guidance::LookUp));

        let state = state_at(here, Some(0.0), -55.0, target);
        assert_eq!(state.hint, Some(Guidance::LookDown));
    }

    #[test]
    fn test_remaining_distance() {
        let spawns = spawns();
        let here = GeoPoint::new(0.0, 0.0);

        let state = state_at(here, None, 0.0, &spawns[1]);
        assert!((remaining_distance(&state, &spawns[1]) - 61.19).abs() < 0.1);

        let state = state_at(here, None, 0.0, &spawns[2]);
        assert_eq!(remaining_distance(&state, &spawns[2]), 0.0);
    }

    #[test]
    fn test_attempt_capture() {
        let spawns = spawns();
        let mut store = MemoryStore::new(spawns.clone());
        let here = GeoPoint::new(0.0, 0.0);
        let yuki = &spawns[2];
        let user = UserId("wallet-1".to_string());

        // In range and facing it (due west)
        let state = state_at(here, Some(270.0), 0.0, yuki);
        assert!(can_capture(&state));

        assert_eq!(
            attempt_capture(&FixedAuth, &mut store, "good-token", yuki, &state, 1000),
            Ok(CaptureOutcome::Captured)
        );
        assert!(store.has_capture(&user, "w3").unwrap());

        assert_eq!(
            attempt_capture(&FixedAuth, &mut store, "good-token", yuki, &state, 2000),
            Ok(CaptureOutcome::AlreadyCaptured)
        );
        let captures = store.captures(&user).unwrap();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures[0].captured_at, 1000);
        assert_eq!(store.captured_ids(&user).unwrap(), captured(&["w3"]));
    }

    #[test]
    fn test_attempt_capture_rejections() {
        let spawns = spawns();
        let mut store = MemoryStore::new(spawns.clone());
        let here = GeoPoint::new(0.0, 0.0);
        let yuki = &spawns[2];

        let state = state_at(here, Some(270.0), 0.0, yuki);
        assert_eq!(
            attempt_capture(&FixedAuth, &mut store, "bad-token", yuki, &state, 0),
            Err(CaptureError::Unauthorized)
        );

        // Facing away
        let state = state_at(here, Some(90.0), 0.0, yuki);
        assert_eq!(
            attempt_capture(&FixedAuth, &mut store, "good-token", yuki, &state, 0),
            Err(CaptureError::NotCapturable("w3".to_string()))
        );

        // Visible but out of range
        let luna = &spawns[1];
        let state = state_at(here, Some(90.0), 0.0, luna);
        assert!(state.visible && !state.in_radius);
        assert!(attempt_capture(&FixedAuth, &mut store, "good-token", luna, &state, 0).is_err());
    }

    #[test]
    fn test_memory_store_unknown_spawn() {
        let mut store = MemoryStore::new(spawns());
        let user = UserId("u".to_string());
        assert_eq!(
            store.save_capture(
                &user,
                Capture {
                    spawn_id: "nope".to_string(),
                    captured_at: 0
                }
            ),
            Err(StoreError::UnknownSpawn("nope".to_string()))
        );
        assert!(store.captures(&user).unwrap().is_empty());
        assert_eq!(store.spawns().unwrap().len(), 3);
    }

    #[test]
    fn test_guidance_text() {
        assert_eq!(Guidance::LookUp.glyph(), "↑");
        assert_eq!(Guidance::AcquiringCompass.text(), "Looking for compass...");
    }
}
