//! Tunables for a dispersion pass
//!
//! [`DispersionConfig`] replaces the scattered module-level constants of a
//! map front-end with one value the caller owns. Every field has a default
//! matching the interactive viewer it was calibrated against.

use serde::{Deserialize, Serialize};

use crate::core_types::MilligramsPerCubicMeter;
use crate::error::{DispersionError, DispersionResult};
use crate::physics::sigma::SigmaParameterization;

/// Closed window of downwind distances a formula is evaluated on (m)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceLimits {
    pub min: f64,
    pub max: f64,
}

impl DistanceLimits {
    /// Create a window
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// `min <= distance <= max`
    #[inline]
    #[must_use]
    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.min && distance <= self.max
    }
}

/// Grid spacing presets
///
/// Finer grids resolve narrow stable-air plumes better at the cost of four
/// times the samples per halving of the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridResolution {
    /// 35 m cells
    Fine,
    /// 70 m cells
    #[default]
    Standard,
    /// 140 m cells
    Coarse,
}

impl GridResolution {
    /// Grid step in meters for this preset
    #[must_use]
    pub const fn grid_step(&self) -> f64 {
        match self {
            Self::Fine => 35.0,
            Self::Standard => 70.0,
            Self::Coarse => 140.0,
        }
    }
}

/// All tunables of a calculation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersionConfig {
    /// Lattice spacing of the concentration grid (m)
    pub grid_step_m: f64,
    /// Fraction of the reference limit below which a cell is not emitted
    pub visualization_threshold: f64,
    /// Hard cap on merged field points
    pub max_total_points: usize,
    /// Valid distance window for the grid formula
    pub grid_distance: DistanceLimits,
    /// Valid distance window for isopleth tracing and peak search
    pub contour_distance: DistanceLimits,
    /// How far each probe ray may walk when sizing a source's footprint (m)
    pub probe_radius_m: f64,
    /// Reference concentration that 100 % is measured against
    pub reference_limit: MilligramsPerCubicMeter,
    /// Number of downwind steps across the contour window
    pub polygon_detail: usize,
    /// Step of the peak concentration search (m)
    pub peak_search_step_m: f64,
    /// Sigma model of the grid pipeline
    pub field_sigma: SigmaParameterization,
    /// Sigma model of the contour pipeline
    pub contour_sigma: SigmaParameterization,
}

impl Default for DispersionConfig {
    fn default() -> Self {
        Self {
            grid_step_m: GridResolution::Standard.grid_step(),
            visualization_threshold: 0.0001,
            max_total_points: 50_000,
            grid_distance: DistanceLimits::new(1.0, 10_000.0),
            contour_distance: DistanceLimits::new(10.0, 10_000.0),
            probe_radius_m: 5_000.0,
            // H2S maximum one-off limit
            reference_limit: MilligramsPerCubicMeter::new(0.008),
            polygon_detail: 4_000,
            peak_search_step_m: 100.0,
            field_sigma: SigmaParameterization::PowerLaw,
            contour_sigma: SigmaParameterization::LogQuadratic,
        }
    }
}

impl DispersionConfig {
    /// Default configuration at a given grid resolution
    #[must_use]
    pub fn with_resolution(resolution: GridResolution) -> Self {
        Self {
            grid_step_m: resolution.grid_step(),
            ..Self::default()
        }
    }

    /// Radius within which two field points are merged (half a grid step)
    #[inline]
    #[must_use]
    pub fn merge_radius(&self) -> f64 {
        self.grid_step_m / 2.0
    }

    /// Visualization threshold expressed in percent of the limit
    #[inline]
    #[must_use]
    pub fn threshold_percent(&self) -> f64 {
        self.visualization_threshold * 100.0
    }

    /// Reject configurations that cannot produce meaningful output
    pub fn validate(&self) -> DispersionResult<()> {
        let invalid = |msg: String| Err(DispersionError::InvalidConfig(msg));

        if self.max_total_points == 0 {
            return invalid("max_total_points must be at least 1".into());
        }
        if self.grid_step_m <= 0.0 || !self.grid_step_m.is_finite() {
            return invalid(format!("grid_step_m must be positive, got {}", self.grid_step_m));
        }
        if *self.reference_limit <= 0.0 || self.reference_limit.is_nan() {
            return invalid(format!(
                "reference_limit must be positive, got {}",
                *self.reference_limit
            ));
        }
        let t = self.visualization_threshold;
        if t.is_nan() || t <= 0.0 || t > 1.0 {
            return invalid(format!(
                "visualization_threshold must lie in (0, 1], got {}",
                self.visualization_threshold
            ));
        }
        for (name, limits) in [
            ("grid_distance", self.grid_distance),
            ("contour_distance", self.contour_distance),
        ] {
            if limits.min.is_nan() || limits.max.is_nan() || limits.min >= limits.max {
                return invalid(format!(
                    "{name}: min ({}) must be below max ({})",
                    limits.min, limits.max
                ));
            }
        }
        if self.polygon_detail == 0 {
            return invalid("polygon_detail must be at least 1".into());
        }
        if self.peak_search_step_m.is_nan() || self.peak_search_step_m <= 0.0 {
            return invalid(format!(
                "peak_search_step_m must be positive, got {}",
                self.peak_search_step_m
            ));
        }
        if self.probe_radius_m.is_nan() || self.probe_radius_m <= 0.0 {
            return invalid(format!(
                "probe_radius_m must be positive, got {}",
                self.probe_radius_m
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DispersionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.merge_radius(), 35.0);
        assert!((config.threshold_percent() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_resolution_presets() {
        assert_eq!(GridResolution::Fine.grid_step(), 35.0);
        assert_eq!(GridResolution::Standard.grid_step(), 70.0);
        assert_eq!(GridResolution::Coarse.grid_step(), 140.0);
        let coarse = DispersionConfig::with_resolution(GridResolution::Coarse);
        assert_eq!(coarse.merge_radius(), 70.0);
    }

    #[test]
    fn test_validation_rejects_unusable_values() {
        let cases = [
            DispersionConfig { max_total_points: 0, ..Default::default() },
            DispersionConfig { grid_step_m: 0.0, ..Default::default() },
            DispersionConfig { grid_step_m: f64::NAN, ..Default::default() },
            DispersionConfig {
                reference_limit: MilligramsPerCubicMeter::ZERO,
                ..Default::default()
            },
            DispersionConfig { visualization_threshold: 0.0, ..Default::default() },
            DispersionConfig { visualization_threshold: 1.5, ..Default::default() },
            DispersionConfig {
                contour_distance: DistanceLimits::new(500.0, 500.0),
                ..Default::default()
            },
            DispersionConfig { polygon_detail: 0, ..Default::default() },
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(DispersionError::InvalidConfig(_))),
                "expected rejection: {config:?}"
            );
        }
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: DispersionConfig =
            serde_json::from_str(r#"{"grid_step_m": 35.0, "field_sigma": "log_quadratic"}"#)
                .unwrap();
        assert_eq!(config.grid_step_m, 35.0);
        assert_eq!(config.field_sigma, SigmaParameterization::LogQuadratic);
        assert_eq!(config.max_total_points, 50_000);
    }

    #[test]
    fn test_distance_window_is_closed() {
        let limits = DistanceLimits::new(10.0, 100.0);
        assert!(limits.contains(10.0));
        assert!(limits.contains(100.0));
        assert!(!limits.contains(9.99));
        assert!(!limits.contains(100.01));
    }
}
