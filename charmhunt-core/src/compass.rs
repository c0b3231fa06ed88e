//! Compass rose helpers for the map screen
//!
//! Maps a relative bearing onto one of eight arrow glyphs and formats
//! distances for the on-screen chips.

use serde::{Deserialize, Serialize};

use crate::geo::normalize_degrees;

/// Width of one compass sector in degrees
const SECTOR_WIDTH: f64 = 45.0;

/// One of the eight compass directions, starting at north and going clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    /// Arrow glyph shown on the proximity indicator
    pub fn glyph(&self) -> &'static str {
        match self {
            Direction::North => "⬆️",
            Direction::NorthEast => "↗️",
            Direction::East => "➡️",
            Direction::SouthEast => "↘️",
            Direction::South => "⬇️",
            Direction::SouthWest => "↙️",
            Direction::West => "⬅️",
            Direction::NorthWest => "↖️",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::NorthEast => "NE",
            Direction::East => "E",
            Direction::SouthEast => "SE",
            Direction::South => "S",
            Direction::SouthWest => "SW",
            Direction::West => "W",
            Direction::NorthWest => "NW",
        }
    }

    /// Center of the sector in degrees
    pub fn center(&self) -> f64 {
        Direction::ALL
            .iter()
            .position(|d| d == self)
            .map(|i| i as f64 * SECTOR_WIDTH)
            .unwrap_or(0.0)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Pick the arrow for a relative bearing (0 = straight ahead, clockwise).
///
/// Sectors are 45° wide and centered on the eight directions. A value on a
/// boundary belongs to the sector for which it is the lower bound, so
/// 22.5 is NE and 337.5 is N. Inputs outside `[0, 360)` are wrapped first.
pub fn direction_arrow(relative_bearing: f64) -> Direction {
    let deg = normalize_degrees(relative_bearing);
    let index = ((deg + SECTOR_WIDTH / 2.0) / SECTOR_WIDTH).floor() as usize % 8;
    Direction::ALL[index]
}

/// Format a distance for display: `950m`, `1.5km`.
///
/// Unknown (non-finite) distances render as an ellipsis.
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() {
        return "…".to_string();
    }
    if meters < 1000.0 {
        format!("{}m", meters.round() as i64)
    } else {
        // Halves round away from zero, not to even
        format!("{:.1}km", (meters / 100.0).round() / 10.0)
    }
}
