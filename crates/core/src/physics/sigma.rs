//! Dispersion coefficient (σy, σz) models
//!
//! A [`SigmaModel`] maps downwind distance and stability class to the lateral
//! and vertical standard deviations of the plume. Two parameterizations are
//! provided; each pipeline picks one through [`SigmaParameterization`] in the
//! configuration and never mixes them inside a pass.

use serde::{Deserialize, Serialize};

use crate::core_types::StabilityClass;
use crate::physics::stability::{log_quadratic_coefficients, power_law_coefficients};

/// Distance below which the log-quadratic fit is undefined (m)
pub const LOG_QUADRATIC_MIN_DISTANCE: f64 = 10.0;

/// Lateral and vertical spread at one downwind distance (m)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Sigmas {
    pub y: f64,
    pub z: f64,
}

impl Sigmas {
    /// Zero spread, the signal that a distance contributes nothing
    pub const DEGENERATE: Sigmas = Sigmas { y: 0.0, z: 0.0 };

    /// Both sigmas strictly positive and finite
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.y > 0.0 && self.z > 0.0 && self.y.is_finite() && self.z.is_finite()
    }
}

/// Maps downwind distance to plume spread
pub trait SigmaModel: Send + Sync {
    /// σy and σz at downwind distance `x` (m). Invalid sigmas mean "no contribution".
    fn sigmas(&self, x: f64, class: StabilityClass) -> Sigmas;

    /// As [`SigmaModel::sigmas`], with any near-field cutoff moved to `min_distance`.
    /// Models without a cutoff ignore it.
    fn sigmas_beyond(&self, x: f64, class: StabilityClass, _min_distance: f64) -> Sigmas {
        self.sigmas(x, class)
    }
}

/// `σy = a·x·(1+b·x)^c`, `σz = d·x`
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerLawSigma;

impl SigmaModel for PowerLawSigma {
    fn sigmas(&self, x: f64, class: StabilityClass) -> Sigmas {
        let k = power_law_coefficients(class);
        Sigmas {
            y: k.a * x * (1.0 + k.b * x).powf(k.c),
            z: k.d * x,
        }
    }
}

/// `σ = exp(I + J·ln x + K·(ln x)²)` above a minimum distance, zero at or below it
#[derive(Debug, Clone, Copy)]
pub struct LogQuadraticSigma {
    pub min_distance: f64,
}

impl Default for LogQuadraticSigma {
    fn default() -> Self {
        Self {
            min_distance: LOG_QUADRATIC_MIN_DISTANCE,
        }
    }
}

impl SigmaModel for LogQuadraticSigma {
    fn sigmas(&self, x: f64, class: StabilityClass) -> Sigmas {
        if x <= self.min_distance {
            return Sigmas::DEGENERATE;
        }
        let k = log_quadratic_coefficients(class);
        let ln_x = x.ln();
        Sigmas {
            y: (k.iy + k.jy * ln_x + k.ky * ln_x * ln_x).exp(),
            z: (k.iz + k.jz * ln_x + k.kz * ln_x * ln_x).exp(),
        }
    }

    fn sigmas_beyond(&self, x: f64, class: StabilityClass, min_distance: f64) -> Sigmas {
        LogQuadraticSigma { min_distance }.sigmas(x, class)
    }
}

/// Configurable choice of sigma model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigmaParameterization {
    PowerLaw,
    LogQuadratic,
}

impl SigmaModel for SigmaParameterization {
    #[inline]
    fn sigmas(&self, x: f64, class: StabilityClass) -> Sigmas {
        match self {
            Self::PowerLaw => PowerLawSigma.sigmas(x, class),
            Self::LogQuadratic => LogQuadraticSigma::default().sigmas(x, class),
        }
    }

    #[inline]
    fn sigmas_beyond(&self, x: f64, class: StabilityClass, min_distance: f64) -> Sigmas {
        match self {
            Self::PowerLaw => PowerLawSigma.sigmas(x, class),
            Self::LogQuadratic => LogQuadraticSigma { min_distance }.sigmas(x, class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_power_law_neutral_at_one_km() {
        let s = PowerLawSigma.sigmas(1000.0, StabilityClass::D);
        // 0.08 * 1000 / sqrt(1.1)
        assert_relative_eq!(s.y, 80.0 / 1.1f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(s.z, 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_log_quadratic_skips_near_field() {
        let model = LogQuadraticSigma::default();
        assert!(!model.sigmas(10.0, StabilityClass::D).is_valid());
        assert!(!model.sigmas(3.0, StabilityClass::A).is_valid());
        assert!(model.sigmas(10.5, StabilityClass::D).is_valid());
    }

    #[test]
    fn test_cutoff_follows_requested_minimum() {
        let near = SigmaParameterization::LogQuadratic.sigmas_beyond(3.0, StabilityClass::D, 2.0);
        assert!(near.is_valid());
        assert!(!SigmaParameterization::LogQuadratic
            .sigmas_beyond(3.0, StabilityClass::D, 5.0)
            .is_valid());
        // Power law has no cutoff to move
        assert_eq!(
            SigmaParameterization::PowerLaw.sigmas_beyond(3.0, StabilityClass::D, 5.0),
            PowerLawSigma.sigmas(3.0, StabilityClass::D)
        );
    }

    #[test]
    fn test_log_quadratic_grows_downwind() {
        let model = LogQuadraticSigma::default();
        for class in StabilityClass::ALL {
            let near = model.sigmas(100.0, class);
            let far = model.sigmas(2000.0, class);
            assert!(far.y > near.y, "σy should grow for {class}");
            assert!(far.z > near.z, "σz should grow for {class}");
        }
    }

    #[test]
    fn test_unstable_air_spreads_wider() {
        for model in [SigmaParameterization::PowerLaw, SigmaParameterization::LogQuadratic] {
            let a = model.sigmas(500.0, StabilityClass::A);
            let f = model.sigmas(500.0, StabilityClass::F);
            assert!(a.y > f.y);
            assert!(a.z > f.z);
        }
    }

    #[test]
    fn test_parameterization_dispatches() {
        let direct = LogQuadraticSigma::default().sigmas(700.0, StabilityClass::C);
        let via_enum = SigmaParameterization::LogQuadratic.sigmas(700.0, StabilityClass::C);
        assert_eq!(direct, via_enum);
    }
}
