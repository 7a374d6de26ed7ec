//! Steady-state Gaussian plume concentration
//!
//! A [`PlumeModel`] binds one source to the conditions of a pass and answers
//! "how much pollutant is at this point". Distances are in meters on the
//! local east/north plane centred on the stack; bearings are compass bearings
//! (0 = north, clockwise) so they can be compared with the wind direction.
//!
//! Three variants share the same Gaussian core:
//!
//! - [`PlumeModel::isotropic_concentration`]: textbook form at a downwind
//!   distance and crosswind offset
//! - [`PlumeModel::concentration_at`]: the grid form at a polar offset, with
//!   the wind-shaped footprint when the mode is anisotropic
//! - [`PlumeModel::centerline_amplitude`]: the crosswind-independent factor the
//!   isopleth tracer inverts

use std::f64::consts::PI;

use crate::config::DistanceLimits;
use crate::core_types::{
    AtmosphericConditions, DispersionMode, EmissionSource, Meters, MilligramsPerCubicMeter,
    Radians,
};
use crate::physics::sigma::{SigmaModel, SigmaParameterization, Sigmas};

/// Along-wind stretch per m/s of wind
const STRETCH_PER_WIND: f64 = 0.3;
/// Crosswind compression per m/s of wind
const COMPRESSION_PER_WIND: f64 = 0.2;
/// Axis rotation per m/s of wind, and its cap (rad)
const ROTATION_PER_WIND: f64 = 0.05;
const MAX_ROTATION: f64 = 0.8;
/// Residual crosswind share of σy after compression
const CROSSWIND_SHARE: f64 = 0.3;
/// Vertical spread growth per m/s of wind
const VERTICAL_GROWTH_PER_WIND: f64 = 0.02;
/// Along-wind damping rate
const ALONG_WIND_DAMPING: f64 = 0.1;
/// e-folding lengths of the downwind boost and upwind suppression (m)
const DOWNWIND_BOOST_LENGTH: f64 = 500.0;
const UPWIND_DECAY_LENGTH: f64 = 200.0;

/// `Q/(2π·u·σy·σz)·exp(-½(y/σy)²)·exp(-½(h/σz)²)`
///
/// `q` in mg/s, `u` already floored. Degenerate sigmas give zero.
#[inline]
#[must_use]
pub fn gaussian_core(q: f64, u: f64, sigmas: Sigmas, y: f64, h: f64) -> f64 {
    if !sigmas.is_valid() {
        return 0.0;
    }
    let crosswind = (-0.5 * (y / sigmas.y).powi(2)).exp();
    let vertical = (-0.5 * (h / sigmas.z).powi(2)).exp();
    q / (2.0 * PI * u * sigmas.y * sigmas.z) * crosswind * vertical
}

/// Crosswind-independent part of the plume at one downwind distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterlineAmplitude {
    pub sigmas: Sigmas,
    /// `A(x)`: concentration on the plume axis (mg/m³)
    pub amplitude: f64,
}

impl CenterlineAmplitude {
    /// Crosswind offset at which concentration falls to `threshold`,
    /// or `None` while the axis itself is still below it
    #[must_use]
    pub fn half_width(&self, threshold: f64) -> Option<f64> {
        if threshold.is_nan() || threshold <= 0.0 || threshold >= self.amplitude {
            return None;
        }
        let y = self.sigmas.y * (-2.0 * (threshold / self.amplitude).ln()).sqrt();
        (y > 0.0 && y.is_finite()).then_some(y)
    }
}

/// Location and value of the highest ground-level concentration
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PeakConcentration {
    /// Downwind distance of the maximum
    pub distance: Meters,
    pub concentration: MilligramsPerCubicMeter,
}

/// A single source evaluated under fixed conditions
#[derive(Debug, Clone)]
pub struct PlumeModel<S: SigmaModel = SigmaParameterization> {
    emission_mg_s: f64,
    stack_height: f64,
    conditions: AtmosphericConditions,
    sigma: S,
    limits: DistanceLimits,
}

impl<S: SigmaModel> PlumeModel<S> {
    /// Bind `source` to `conditions`; the source's own meteorology is not consulted here
    pub fn new(
        source: &EmissionSource,
        conditions: AtmosphericConditions,
        sigma: S,
        limits: DistanceLimits,
    ) -> Self {
        Self {
            emission_mg_s: *source.emission_mg_per_s(),
            stack_height: *source.stack_height,
            conditions,
            sigma,
            limits,
        }
    }

    /// Conditions this model was built with
    #[must_use]
    pub fn conditions(&self) -> &AtmosphericConditions {
        &self.conditions
    }

    /// Spread at downwind distance `x`; the window minimum doubles as the sigma cutoff
    #[inline]
    #[must_use]
    pub fn sigmas(&self, x: f64) -> Sigmas {
        self.sigma
            .sigmas_beyond(x, self.conditions.stability_class, self.limits.min)
    }

    /// Symmetric plume at downwind distance `x` and crosswind offset `y`
    #[must_use]
    pub fn isotropic_concentration(&self, x: f64, y: f64) -> MilligramsPerCubicMeter {
        if !self.limits.contains(x) {
            return MilligramsPerCubicMeter::ZERO;
        }
        let u = self.conditions.effective_wind_speed();
        let c = gaussian_core(self.emission_mg_s, u, self.sigmas(x), y, self.stack_height);
        MilligramsPerCubicMeter::new(c.max(0.0))
    }

    /// Concentration `distance` meters from the stack along compass `bearing`
    ///
    /// Isotropic mode yields a ring: the value depends on distance only.
    /// Anisotropic mode stretches the footprint along the downwind axis,
    /// compresses it across, bends it toward the sample direction and
    /// boosts the downwind lobe while suppressing the upwind one.
    #[must_use]
    pub fn concentration_at(&self, distance: f64, bearing: Radians) -> MilligramsPerCubicMeter {
        if !self.limits.contains(distance) {
            return MilligramsPerCubicMeter::ZERO;
        }
        let base = self.sigmas(distance);
        if !base.is_valid() {
            return MilligramsPerCubicMeter::ZERO;
        }
        let u = self.conditions.effective_wind_speed();
        let q = self.emission_mg_s;
        let h = self.stack_height;

        let c = match self.conditions.dispersion_mode {
            DispersionMode::Isotropic => gaussian_core(q, u, base, 0.0, h),
            DispersionMode::Anisotropic => {
                let theta = (bearing - self.conditions.downwind_bearing()).wrapped();
                self.anisotropic(distance, *theta, base, q, u, h)
            }
        };
        MilligramsPerCubicMeter::new(c.max(0.0))
    }

    fn anisotropic(&self, distance: f64, theta: f64, base: Sigmas, q: f64, u: f64, h: f64) -> f64 {
        let strength = self.conditions.wind_effect_strength.max(0.0);
        let wind = u * strength;

        let stretch = 1.0 + STRETCH_PER_WIND * wind;
        let compress = 1.0 / (1.0 + COMPRESSION_PER_WIND * wind);
        let rotation = (ROTATION_PER_WIND * wind).min(MAX_ROTATION);
        let theta_r = theta - rotation * theta.sin();

        let sigmas = Sigmas {
            y: base.y
                * ((stretch * theta_r.cos()).powi(2)
                    + (CROSSWIND_SHARE * compress * theta_r.sin()).powi(2))
                .sqrt(),
            z: base.z * (1.0 + VERTICAL_GROWTH_PER_WIND * wind),
        };
        if !sigmas.is_valid() {
            return 0.0;
        }

        let along = distance * theta.cos();
        let across = distance * theta.sin();

        let damping = (-ALONG_WIND_DAMPING * along.abs() / (sigmas.y * u)).exp();
        let directional = if along > 0.0 {
            1.0 + (stretch - 1.0) * (1.0 - (-along.abs() / DOWNWIND_BOOST_LENGTH).exp())
        } else {
            0.1 + 0.2 * (-along.abs() / UPWIND_DECAY_LENGTH).exp()
        };

        gaussian_core(q, u, sigmas, across, h) * damping * directional
    }

    /// `A(x)`, or `None` outside the distance window or where sigmas degenerate
    #[must_use]
    pub fn centerline_amplitude(&self, x: f64) -> Option<CenterlineAmplitude> {
        if !self.limits.contains(x) {
            return None;
        }
        let sigmas = self.sigmas(x);
        if !sigmas.is_valid() {
            return None;
        }
        let u = self.conditions.effective_wind_speed();
        let amplitude = gaussian_core(self.emission_mg_s, u, sigmas, 0.0, self.stack_height);
        Some(CenterlineAmplitude { sigmas, amplitude })
    }

    /// Highest ground-reflected centreline concentration, searched every `step` meters
    ///
    /// Uses `Q/(π·u·σy·σz)·exp(-½(h/σz)²)`, twice the unreflected axis value.
    /// `None` when no distance in the window has valid sigmas or the source emits nothing.
    #[must_use]
    pub fn peak_ground_concentration(&self, step: f64) -> Option<PeakConcentration> {
        if step.is_nan() || step <= 0.0 {
            return None;
        }
        let mut best: Option<(f64, f64)> = None;
        let mut i = 0u32;
        loop {
            let x = self.limits.min + f64::from(i) * step;
            if x > self.limits.max {
                break;
            }
            i += 1;
            if let Some(axis) = self.centerline_amplitude(x) {
                let reflected = 2.0 * axis.amplitude;
                if reflected > best.map_or(0.0, |(_, c)| c) {
                    best = Some((x, reflected));
                }
            }
        }
        best.map(|(x, c)| PeakConcentration {
            distance: Meters::new(x),
            concentration: MilligramsPerCubicMeter::new(c),
        })
    }
}
