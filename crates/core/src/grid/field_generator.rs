//! Per-source concentration sampling
//!
//! Generation is two-pass. A handful of probe rays walk outward from the stack
//! to find how far the visible plume reaches, then a square lattice of that
//! radius is sampled. Probing first keeps the lattice small for weak sources
//! while guaranteeing the sampled area covers everything above threshold.

use std::f64::consts::TAU;

use nalgebra::Vector2;
use tracing::debug;

use crate::config::DispersionConfig;
use crate::core_types::{AtmosphericConditions, EmissionSource, Radians};
use crate::grid::aggregator::FieldPoint;
use crate::physics::{PlumeModel, SigmaModel, SigmaParameterization};

/// Distance at which the source's own cell is evaluated (m)
const ORIGIN_SAMPLE_DISTANCE: f64 = 1.0;

/// Points of one source before merging
#[derive(Debug, Clone, Default)]
pub struct SourceField {
    pub points: Vec<FieldPoint>,
    /// Radius of the sampled lattice (m)
    pub influence_radius: f64,
}

/// Samples single-source plumes onto the configured lattice
pub struct FieldGenerator<'a> {
    config: &'a DispersionConfig,
}

impl<'a> FieldGenerator<'a> {
    pub fn new(config: &'a DispersionConfig) -> Self {
        Self { config }
    }

    /// Plume model of `source` under `conditions` with the grid σ model
    pub fn model(
        &self,
        source: &EmissionSource,
        conditions: &AtmosphericConditions,
    ) -> PlumeModel<SigmaParameterization> {
        PlumeModel::new(
            source,
            *conditions,
            self.config.field_sigma,
            self.config.grid_distance,
        )
    }

    fn is_visible(&self, model: &PlumeModel<impl SigmaModel>, distance: f64, bearing: f64) -> bool {
        let c = model.concentration_at(distance, Radians::new(bearing));
        *c.percent_of(self.config.reference_limit) >= self.config.threshold_percent()
    }

    /// Farthest distance along any probe ray that is still above threshold,
    /// or two grid steps when no ray qualifies
    pub fn probe_extent(&self, model: &PlumeModel<impl SigmaModel>) -> f64 {
        let step = self.config.grid_step_m;
        let rays = model.conditions().dispersion_mode.probe_directions();
        let mut reach = 0.0f64;

        for k in 0..rays {
            let bearing = k as f64 * TAU / rays as f64;
            let mut i = 1u32;
            loop {
                let distance = f64::from(i) * step;
                if distance > self.config.probe_radius_m || !self.is_visible(model, distance, bearing) {
                    break;
                }
                reach = reach.max(distance);
                i += 1;
            }
        }

        if reach > 0.0 {
            reach
        } else {
            2.0 * step
        }
    }

    /// All lattice cells of `source` at or above the visualization threshold
    pub fn generate(&self, source: &EmissionSource, conditions: &AtmosphericConditions) -> SourceField {
        let model = self.model(source, conditions);
        let limit = self.config.reference_limit;
        let threshold = self.config.threshold_percent();
        let step = self.config.grid_step_m;

        let radius = self.probe_extent(&model);
        let half_cells = (radius / step).ceil() as i64;
        let mut points = Vec::new();

        for i in -half_cells..=half_cells {
            for j in -half_cells..=half_cells {
                let offset = Vector2::new(i as f64 * step, j as f64 * step);
                let distance = offset.norm();
                if distance == 0.0 || distance > radius {
                    continue;
                }
                // Compass bearing: 0 = north, clockwise
                let bearing = offset.x.atan2(offset.y);
                let c = model.concentration_at(distance, Radians::new(bearing));
                if *c.percent_of(limit) >= threshold {
                    points.push(FieldPoint::new(source.position.offset_by(offset), c, limit));
                }
            }
        }

        // The stack itself, sampled just off the axis
        let c = model.concentration_at(ORIGIN_SAMPLE_DISTANCE, conditions.downwind_bearing());
        if *c.percent_of(limit) >= threshold {
            points.push(FieldPoint::new(source.position, c, limit));
        }

        debug!(
            "Source {} '{}': influence radius {:.0} m, {} points",
            source.id,
            source.name,
            radius,
            points.len()
        );

        SourceField {
            points,
            influence_radius: radius,
        }
    }
}
