//! Closed-form isopleth tracing
//!
//! The symmetric plume factors as `C(x, y) = A(x)·exp(-½(y/σy)²)`, so the
//! crosswind half-width of a threshold contour has a closed form and no
//! root finding or marching over a raster is needed. The tracer sweeps
//! downwind, collects the half-widths, and folds them into a ring anchored
//! at the stack.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::DispersionConfig;
use crate::contour::ladder::{IsoplethLevel, ISOPLETH_LADDER};
use crate::core_types::{
    AtmosphericConditions, EmissionSource, GeoPoint, Meters, MilligramsPerCubicMeter, SourceId,
};
use crate::physics::{PlumeModel, SigmaModel, SigmaParameterization};

/// Crosswind half-widths of one contour in plume coordinates (m)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlumeOutline {
    /// `(downwind distance, half-width)` in sweep order
    pub half_widths: Vec<(f64, f64)>,
    /// Last downwind distance where the contour was open
    pub tip: f64,
}

impl PlumeOutline {
    /// Half-width at exactly `x`, if the sweep visited it
    #[must_use]
    pub fn half_width_at(&self, x: f64) -> Option<f64> {
        self.half_widths
            .iter()
            .find(|(sx, _)| (sx - x).abs() < 1e-9)
            .map(|&(_, y)| y)
    }

    /// Ring in local (east, north) meters: stack, positive side, tip,
    /// negative side reversed, stack again
    #[must_use]
    pub fn ring(&self, downwind: Vector2<f64>) -> Vec<Vector2<f64>> {
        // Rightward normal of the downwind axis
        let normal = Vector2::new(downwind.y, -downwind.x);
        let mut ring = Vec::with_capacity(self.half_widths.len() * 2 + 3);

        ring.push(Vector2::zeros());
        ring.extend(self.half_widths.iter().map(|&(x, y)| downwind * x + normal * y));
        ring.push(downwind * self.tip);
        ring.extend(self.half_widths.iter().rev().map(|&(x, y)| downwind * x - normal * y));
        ring.push(Vector2::zeros());
        ring
    }
}

/// A filled contour enclosing concentrations at or above one ladder rung
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsoplethPolygon {
    pub source_id: SourceId,
    /// Rung as a fraction of the reference limit
    pub level: f64,
    pub threshold: MilligramsPerCubicMeter,
    pub color: String,
    pub z_index: i32,
    /// Closed ring: first and last vertex are the stack position
    pub vertices: Vec<GeoPoint>,
    /// Downwind reach of the contour
    pub tip_distance: Meters,
}

impl IsoplethPolygon {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// First and last vertex coincide
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.vertices.len() > 2 && self.vertices.first() == self.vertices.last()
    }
}

/// Traces isopleths for single sources under the contour σ model
pub struct IsoplethTracer<'a> {
    config: &'a DispersionConfig,
}

impl<'a> IsoplethTracer<'a> {
    pub fn new(config: &'a DispersionConfig) -> Self {
        Self { config }
    }

    /// Plume model of `source` with the contour σ model and distance window
    pub fn model(
        &self,
        source: &EmissionSource,
        conditions: &AtmosphericConditions,
    ) -> PlumeModel<SigmaParameterization> {
        PlumeModel::new(
            source,
            *conditions,
            self.config.contour_sigma,
            self.config.contour_distance,
        )
    }

    /// Sweep the downwind axis and collect the half-widths where `threshold` is exceeded.
    ///
    /// `None` when fewer than two distances produce a valid half-width.
    pub fn outline(
        &self,
        model: &PlumeModel<impl SigmaModel>,
        threshold: MilligramsPerCubicMeter,
    ) -> Option<PlumeOutline> {
        let limits = self.config.contour_distance;
        let step = limits.max / self.config.polygon_detail as f64;
        let mut outline = PlumeOutline::default();

        let mut i = 0u32;
        loop {
            let x = limits.min + f64::from(i) * step;
            if x > limits.max {
                break;
            }
            i += 1;

            let Some(axis) = model.centerline_amplitude(x) else {
                continue;
            };
            if let Some(y) = axis.half_width(*threshold) {
                outline.half_widths.push((x, y));
                outline.tip = x;
            }
        }

        (outline.half_widths.len() >= 2).then_some(outline)
    }

    /// Contour of `source` at one ladder rung
    pub fn trace(
        &self,
        source: &EmissionSource,
        conditions: &AtmosphericConditions,
        level: &IsoplethLevel,
    ) -> Option<IsoplethPolygon> {
        let model = self.model(source, conditions);
        let threshold = level.threshold(self.config.reference_limit);
        let outline = self.outline(&model, threshold)?;

        let bearing = conditions.downwind_bearing();
        let downwind = Vector2::new(bearing.sin(), bearing.cos());
        let vertices: Vec<GeoPoint> = outline
            .ring(downwind)
            .into_iter()
            .map(|offset| source.position.offset_by(offset))
            .collect();

        trace!(
            "Source {} level {:.1}: {} vertices, tip at {:.0} m",
            source.id,
            level.fraction,
            vertices.len(),
            outline.tip
        );

        Some(IsoplethPolygon {
            source_id: source.id,
            level: level.fraction,
            threshold,
            color: level.color.to_string(),
            z_index: level.z_index(),
            vertices,
            tip_distance: Meters::new(outline.tip),
        })
    }

    /// Every ladder rung the source reaches, ascending
    pub fn trace_ladder(
        &self,
        source: &EmissionSource,
        conditions: &AtmosphericConditions,
    ) -> Vec<IsoplethPolygon> {
        ISOPLETH_LADDER
            .iter()
            .filter_map(|level| self.trace(source, conditions, level))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceLimits;
    use crate::core_types::StabilityClass;
    use approx::assert_relative_eq;

    fn strong_source() -> EmissionSource {
        EmissionSource::new(4, 55.7558, 37.6173, 40.0, 20.0)
    }

    #[test]
    fn test_ring_is_closed_and_ordered() {
        let outline = PlumeOutline {
            half_widths: vec![(100.0, 10.0), (200.0, 20.0), (300.0, 5.0)],
            tip: 300.0,
        };
        // Plume heading north
        let ring = outline.ring(Vector2::new(0.0, 1.0));
        assert_eq!(ring.len(), 3 * 2 + 3);
        assert_eq!(ring[0], Vector2::zeros());
        assert_eq!(ring[ring.len() - 1], Vector2::zeros());
        // Positive side lies to the east of a northbound axis
        assert_relative_eq!(ring[1].x, 10.0);
        assert_relative_eq!(ring[1].y, 100.0);
        assert_relative_eq!(ring[4].y, 300.0);
        assert_relative_eq!(ring[4].x, 0.0);
        assert_relative_eq!(ring[5].x, -5.0);
    }

    #[test]
    fn test_polygon_points_downwind() {
        let config = DispersionConfig::default();
        let tracer = IsoplethTracer::new(&config);
        // Wind from the north pushes the plume south
        let conditions = AtmosphericConditions::new(2.0, 0.0, StabilityClass::D);
        let source = strong_source();
        let polygon = tracer
            .trace(&source, &conditions, &ISOPLETH_LADDER[0])
            .expect("20 % contour should exist for a 20 g/s source");

        assert!(polygon.is_closed());
        assert_eq!(polygon.vertices[0], source.position);
        assert_eq!(polygon.color, "#00FF00");
        assert_eq!(polygon.z_index, 20);
        let tip_index = (polygon.vertex_count() - 1) / 2;
        assert!(polygon.vertices[tip_index].lat < source.position.lat);
    }

    #[test]
    fn test_unreachable_threshold_gives_none() {
        let config = DispersionConfig::default();
        let tracer = IsoplethTracer::new(&config);
        let faint = EmissionSource::new(5, 55.0, 37.0, 40.0, 0.000_001);
        let conditions = AtmosphericConditions::new(3.0, 270.0, StabilityClass::D);
        assert!(tracer.trace(&faint, &conditions, &ISOPLETH_LADDER[4]).is_none());
        assert!(tracer.trace_ladder(&faint, &conditions).is_empty());
    }

    #[test]
    fn test_contour_starts_at_configured_minimum() {
        let config = DispersionConfig {
            contour_distance: DistanceLimits::new(2.0, 10_000.0),
            polygon_detail: 10_000,
            ..DispersionConfig::default()
        };
        let tracer = IsoplethTracer::new(&config);
        let ground_level = EmissionSource::new(6, 55.7558, 37.6173, 0.0, 50.0);
        let conditions = AtmosphericConditions::new(2.0, 90.0, StabilityClass::D);
        let model = tracer.model(&ground_level, &conditions);
        let threshold = ISOPLETH_LADDER[0].threshold(config.reference_limit);
        let outline = tracer.outline(&model, threshold).unwrap();

        let (first_x, _) = outline.half_widths[0];
        assert!(first_x < 10.0, "contour opened at {first_x} m");
        assert!(first_x > 2.0);
    }

    #[test]
    fn test_sweep_positions_are_index_based() {
        let config = DispersionConfig {
            polygon_detail: 100,
            ..DispersionConfig::default()
        };
        let tracer = IsoplethTracer::new(&config);
        let conditions = AtmosphericConditions::new(2.0, 90.0, StabilityClass::F);
        let model = tracer.model(&strong_source(), &conditions);
        let threshold = ISOPLETH_LADDER[0].threshold(config.reference_limit);
        let outline = tracer.outline(&model, threshold).unwrap();
        for (x, _) in &outline.half_widths {
            let steps = (x - 10.0) / 100.0;
            assert_relative_eq!(steps, steps.round(), epsilon = 1e-9);
        }
    }
}
