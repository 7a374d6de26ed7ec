//! Meteorological inputs to a dispersion pass
//!
//! [`AtmosphericConditions`] bundles the wind and turbulence state that every
//! concentration evaluation depends on. Conditions are plain data: the weather
//! feed that produces them lives outside this crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::core_types::units::{Degrees, MetersPerSecond, Radians};

/// Wind speed floor applied wherever `u` appears in a denominator (m/s)
pub const MIN_WIND_SPEED: f64 = 0.1;

/// Default strength of the anisotropic wind adjustments
pub const DEFAULT_WIND_EFFECT_STRENGTH: f64 = 0.8;

/// Pasquill-Gifford atmospheric stability class
///
/// A is the most turbulent (strong daytime convection, wide plumes), F the most
/// stable (clear nights, narrow plumes that stay aloft).
///
/// Deserializes from the single-letter code; unknown codes become [`StabilityClass::D`]
/// through [`StabilityClass::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum StabilityClass {
    /// Very unstable
    A,
    /// Unstable
    B,
    /// Slightly unstable
    C,
    /// Neutral
    #[default]
    D,
    /// Slightly stable
    E,
    /// Stable
    F,
}

impl StabilityClass {
    /// All classes, most to least turbulent
    pub const ALL: [StabilityClass; 6] = [
        StabilityClass::A,
        StabilityClass::B,
        StabilityClass::C,
        StabilityClass::D,
        StabilityClass::E,
        StabilityClass::F,
    ];

    /// Parse a class letter (case-insensitive, surrounding whitespace ignored).
    ///
    /// Anything that isn't A-F falls back to neutral stability (D). Stored
    /// parameters come from forms and older databases where the field may be
    /// empty or garbled; a neutral plume is a better answer than no plume.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "A" => Self::A,
            "B" => Self::B,
            "C" => Self::C,
            "D" => Self::D,
            "E" => Self::E,
            "F" => Self::F,
            other => {
                warn!("Unknown stability class '{}', falling back to D", other);
                Self::D
            }
        }
    }

    /// Single-letter code
    #[must_use]
    pub const fn code(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
            Self::E => 'E',
            Self::F => 'F',
        }
    }
}

impl From<String> for StabilityClass {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl fmt::Display for StabilityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// How the grid pipeline shapes the plume footprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispersionMode {
    /// Symmetric Gaussian core only
    Isotropic,
    /// Wind stretching, rotation and the downwind/upwind multiplier
    #[default]
    Anisotropic,
}

impl DispersionMode {
    /// Number of rays used when probing a source's influence radius.
    ///
    /// The isotropic footprint has no preferred axis, so it needs finer
    /// angular coverage to find its edge.
    #[must_use]
    pub const fn probe_directions(&self) -> usize {
        match self {
            Self::Isotropic => 16,
            Self::Anisotropic => 8,
        }
    }
}

/// Wind and turbulence state for one calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericConditions {
    /// Wind speed at plume height
    pub wind_speed: MetersPerSecond,
    /// Direction the wind blows FROM (0° = north, clockwise)
    pub wind_direction: Degrees,
    /// Pasquill-Gifford class
    #[serde(default)]
    pub stability_class: StabilityClass,
    /// Footprint model for the concentration grid
    #[serde(default)]
    pub dispersion_mode: DispersionMode,
    /// Scale of the anisotropic adjustments (0 disables them)
    #[serde(default = "default_wind_effect_strength")]
    pub wind_effect_strength: f64,
}

fn default_wind_effect_strength() -> f64 {
    DEFAULT_WIND_EFFECT_STRENGTH
}

impl Default for AtmosphericConditions {
    fn default() -> Self {
        Self {
            wind_speed: MetersPerSecond::new(2.4),
            wind_direction: Degrees::new(180.0),
            stability_class: StabilityClass::D,
            dispersion_mode: DispersionMode::Anisotropic,
            wind_effect_strength: DEFAULT_WIND_EFFECT_STRENGTH,
        }
    }
}

impl AtmosphericConditions {
    /// Create conditions with the default mode and wind-effect strength
    pub fn new(wind_speed: f64, wind_direction: f64, stability_class: StabilityClass) -> Self {
        Self {
            wind_speed: MetersPerSecond::new(wind_speed),
            wind_direction: Degrees::new(wind_direction).normalized(),
            stability_class,
            ..Self::default()
        }
    }

    /// Same conditions with a different dispersion mode
    pub fn with_mode(mut self, mode: DispersionMode) -> Self {
        self.dispersion_mode = mode;
        self
    }

    /// Wind speed floored at [`MIN_WIND_SPEED`], safe to divide by
    #[inline]
    #[must_use]
    pub fn effective_wind_speed(&self) -> f64 {
        *self.wind_speed.at_least(MIN_WIND_SPEED)
    }

    /// Compass bearing the plume travels toward (wind direction + 180°)
    #[inline]
    #[must_use]
    pub fn downwind_bearing(&self) -> Radians {
        (self.wind_direction + Degrees::new(180.0))
            .normalized()
            .to_radians()
    }

    /// Compass sector the wind blows from
    #[must_use]
    pub fn compass_point(&self) -> CompassPoint {
        CompassPoint::from_degrees(self.wind_direction)
    }
}

/// Eight-point compass sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompassPoint {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassPoint {
    const SECTORS: [CompassPoint; 8] = [
        Self::North,
        Self::NorthEast,
        Self::East,
        Self::SouthEast,
        Self::South,
        Self::SouthWest,
        Self::West,
        Self::NorthWest,
    ];

    /// Sector containing a direction; sectors are 45° wide centred on each point
    pub fn from_degrees(direction: Degrees) -> Self {
        let deg = *direction.normalized();
        let index = ((deg + 22.5) / 45.0).floor() as usize % 8;
        Self::SECTORS[index]
    }

    /// Parse a lowercase weather-feed code (`"n"`, `"ne"`, ...). Unknown codes map to north.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "ne" => Self::NorthEast,
            "e" => Self::East,
            "se" => Self::SouthEast,
            "s" => Self::South,
            "sw" => Self::SouthWest,
            "w" => Self::West,
            "nw" => Self::NorthWest,
            _ => Self::North,
        }
    }

    /// Centre bearing of the sector
    #[must_use]
    pub fn degrees(&self) -> Degrees {
        let index = Self::SECTORS.iter().position(|p| p == self).unwrap_or(0);
        Degrees::new(index as f64 * 45.0)
    }

    /// Short label (N, NE, ...)
    #[must_use]
    pub const fn abbreviation(&self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
        }
    }
}

impl fmt::Display for CompassPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::North => "North",
            Self::NorthEast => "North-east",
            Self::East => "East",
            Self::SouthEast => "South-east",
            Self::South => "South",
            Self::SouthWest => "South-west",
            Self::West => "West",
            Self::NorthWest => "North-west",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_stability_code_parsing() {
        assert_eq!(StabilityClass::from_code("a"), StabilityClass::A);
        assert_eq!(StabilityClass::from_code(" F "), StabilityClass::F);
        assert_eq!(StabilityClass::from_code("Z"), StabilityClass::D);
        assert_eq!(StabilityClass::from_code(""), StabilityClass::D);
    }

    #[test]
    fn test_stability_deserializes_with_fallback() {
        let parsed: StabilityClass = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(parsed, StabilityClass::B);
        let garbled: StabilityClass = serde_json::from_str("\"neutral\"").unwrap();
        assert_eq!(garbled, StabilityClass::D);
    }

    #[test]
    fn test_wind_speed_floor() {
        let calm = AtmosphericConditions::new(0.0, 90.0, StabilityClass::D);
        assert_relative_eq!(calm.effective_wind_speed(), MIN_WIND_SPEED);

        let windy = AtmosphericConditions::new(6.0, 90.0, StabilityClass::D);
        assert_relative_eq!(windy.effective_wind_speed(), 6.0);
    }

    #[test]
    fn test_downwind_bearing_is_opposite_wind_direction() {
        // Westerly wind (from 270°) carries the plume east (90°)
        let westerly = AtmosphericConditions::new(3.0, 270.0, StabilityClass::D);
        assert_relative_eq!(*westerly.downwind_bearing(), 90f64.to_radians(), epsilon = 1e-12);

        let northerly = AtmosphericConditions::new(3.0, 0.0, StabilityClass::D);
        assert_relative_eq!(*northerly.downwind_bearing(), 180f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn test_conditions_deserialize_with_defaults() {
        let json = r#"{"wind_speed": 3.0, "wind_direction": 270.0, "stability_class": "c"}"#;
        let cond: AtmosphericConditions = serde_json::from_str(json).unwrap();
        assert_eq!(cond.stability_class, StabilityClass::C);
        assert_eq!(cond.dispersion_mode, DispersionMode::Anisotropic);
        assert_relative_eq!(cond.wind_effect_strength, DEFAULT_WIND_EFFECT_STRENGTH);
    }

    #[test]
    fn test_compass_sectors() {
        assert_eq!(CompassPoint::from_degrees(Degrees::new(0.0)), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(Degrees::new(350.0)), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(Degrees::new(22.4)), CompassPoint::North);
        assert_eq!(CompassPoint::from_degrees(Degrees::new(22.6)), CompassPoint::NorthEast);
        assert_eq!(CompassPoint::from_degrees(Degrees::new(180.0)), CompassPoint::South);
        assert_eq!(CompassPoint::from_degrees(Degrees::new(270.0)), CompassPoint::West);
        assert_eq!(CompassPoint::from_code("sw"), CompassPoint::SouthWest);
        assert_eq!(CompassPoint::from_code("??"), CompassPoint::North);
        assert_relative_eq!(*CompassPoint::SouthWest.degrees(), 225.0);
    }
}
