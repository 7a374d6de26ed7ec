//! Multi-source superposition of field points
//!
//! Each source's points arrive in source order. A point landing within the
//! merge radius of an already merged point adds its concentration to it;
//! anything else becomes a new merged point until the point budget is spent.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DispersionConfig;
use crate::core_types::{GeoPoint, MilligramsPerCubicMeter, Percent};
use crate::grid::spatial::SpatialIndex;

/// Smallest display weight an emitted point carries
pub const MIN_DISPLAY_WEIGHT: f64 = 0.01;

/// Heat-map weight for a percent-of-limit value: `pct/100` clamped to [0.01, 1]
#[inline]
#[must_use]
pub fn display_weight(percent: Percent) -> f64 {
    percent.to_fraction().clamp(MIN_DISPLAY_WEIGHT, 1.0)
}

/// One heat-map sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPoint {
    pub position: GeoPoint,
    /// Summed concentration of every source contributing here
    pub concentration: MilligramsPerCubicMeter,
    pub percent_of_limit: Percent,
    /// Display intensity in [0.01, 1]
    pub weight: f64,
}

impl FieldPoint {
    /// Sample with percent and weight derived from `limit`
    pub fn new(
        position: GeoPoint,
        concentration: MilligramsPerCubicMeter,
        limit: MilligramsPerCubicMeter,
    ) -> Self {
        let percent_of_limit = concentration.percent_of(limit);
        Self {
            position,
            concentration,
            percent_of_limit,
            weight: display_weight(percent_of_limit),
        }
    }

    /// Add another source's contribution and refresh the derived values
    pub fn accumulate(&mut self, extra: MilligramsPerCubicMeter, limit: MilligramsPerCubicMeter) {
        self.concentration += extra;
        self.percent_of_limit = self.concentration.percent_of(limit);
        self.weight = display_weight(self.percent_of_limit);
    }

    /// `[lat, lng, weight]` as heat-map layers consume it
    #[must_use]
    pub fn heatmap_triple(&self) -> [f64; 3] {
        [self.position.lat, self.position.lng, self.weight]
    }
}

/// Result of the grid pipeline, rebuilt from scratch on every pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationField {
    /// Merged points at or above the visualization threshold, in insertion order
    pub points: Vec<FieldPoint>,
    /// Largest merged concentration, zero for an empty field
    pub max_concentration: MilligramsPerCubicMeter,
    pub points_above_threshold: usize,
    /// Points produced by the per-source generators before merging
    pub generated_points: usize,
    /// Generation stopped early because the point budget was reached
    pub truncated: bool,
}

impl ConcentrationField {
    /// Field of a pass with nothing to show
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Heat-map data, one `[lat, lng, weight]` per point
    #[must_use]
    pub fn heatmap_data(&self) -> Vec<[f64; 3]> {
        self.points.iter().map(FieldPoint::heatmap_triple).collect()
    }
}

/// Accumulates per-source point sets into one deduplicated field
pub struct FieldAggregator {
    /// Anchor of the local plane the index works in
    origin: Option<GeoPoint>,
    points: Vec<FieldPoint>,
    locals: Vec<Vector2<f64>>,
    index: SpatialIndex,
    merge_radius: f64,
    budget: usize,
    limit: MilligramsPerCubicMeter,
    threshold_percent: f64,
    generated: usize,
    truncated: bool,
}

impl FieldAggregator {
    pub fn new(config: &DispersionConfig) -> Self {
        let merge_radius = config.merge_radius();
        Self {
            origin: None,
            points: Vec::new(),
            locals: Vec::new(),
            index: SpatialIndex::with_capacity(merge_radius, config.max_total_points),
            merge_radius,
            budget: config.max_total_points,
            limit: config.reference_limit,
            threshold_percent: config.threshold_percent(),
            generated: 0,
            truncated: false,
        }
    }

    /// Merged points so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The budget has been hit; further sources must not be merged
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Merge one source's points. Returns `false` once the budget stops generation.
    pub fn merge_source(&mut self, points: Vec<FieldPoint>) -> bool {
        if self.truncated {
            return false;
        }
        self.generated += points.len();

        for point in points {
            let origin = *self.origin.get_or_insert(point.position);
            let local = point.position.local_offset_from(&origin);

            // Lowest index wins so the result does not depend on hash order
            let target = self
                .index
                .neighbours(local)
                .filter(|&id| (self.locals[id as usize] - local).norm() < self.merge_radius)
                .min();

            if let Some(id) = target {
                self.points[id as usize].accumulate(point.concentration, self.limit);
                continue;
            }

            if self.points.len() >= self.budget {
                warn!(
                    "Point budget of {} reached, stopping field generation",
                    self.budget
                );
                self.truncated = true;
                return false;
            }

            let id = self.points.len() as u32;
            self.index.insert(id, local);
            self.locals.push(local);
            self.points.push(point);
        }
        true
    }

    /// Apply the final threshold filter and compute the field summary
    pub fn finish(self) -> ConcentrationField {
        let threshold = self.threshold_percent;
        let merged = self.points.len();
        let points: Vec<FieldPoint> = self
            .points
            .into_iter()
            .filter(|p| *p.percent_of_limit >= threshold)
            .collect();

        let max_concentration = points
            .iter()
            .map(|p| p.concentration)
            .max()
            .unwrap_or(MilligramsPerCubicMeter::ZERO);

        debug!(
            "Generated {} points, merged into {} across {} cells, {} above threshold",
            self.generated,
            merged,
            self.index.cell_count(),
            points.len()
        );

        ConcentrationField {
            points_above_threshold: points.len(),
            points,
            max_concentration,
            generated_points: self.generated,
            truncated: self.truncated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ORIGIN: GeoPoint = GeoPoint::new(55.7558, 37.6173);

    fn config() -> DispersionConfig {
        DispersionConfig::default()
    }

    fn point_at(east: f64, north: f64, c: f64) -> FieldPoint {
        let cfg = config();
        FieldPoint::new(
            ORIGIN.offset_by(Vector2::new(east, north)),
            MilligramsPerCubicMeter::new(c),
            cfg.reference_limit,
        )
    }

    #[test]
    fn test_weight_is_clamped() {
        assert_relative_eq!(display_weight(Percent::new(250.0)), 1.0);
        assert_relative_eq!(display_weight(Percent::new(40.0)), 0.4);
        assert_relative_eq!(display_weight(Percent::new(0.02)), MIN_DISPLAY_WEIGHT);
    }

    #[test]
    fn test_close_points_merge_and_far_points_insert() {
        let mut agg = FieldAggregator::new(&config());
        assert!(agg.merge_source(vec![point_at(0.0, 0.0, 0.002), point_at(140.0, 0.0, 0.001)]));
        assert!(agg.merge_source(vec![point_at(10.0, 5.0, 0.002), point_at(500.0, 0.0, 0.003)]));

        let field = agg.finish();
        assert_eq!(field.len(), 3);
        assert_eq!(field.generated_points, 4);
        assert_relative_eq!(*field.points[0].concentration, 0.004, epsilon = 1e-15);
        assert_relative_eq!(*field.points[0].percent_of_limit, 50.0, epsilon = 1e-9);
        assert_relative_eq!(field.points[0].weight, 0.5, epsilon = 1e-12);
        assert_relative_eq!(*field.max_concentration, 0.004, epsilon = 1e-15);
        assert!(!field.truncated);
    }

    #[test]
    fn test_budget_is_a_hard_cap() {
        let cfg = DispersionConfig {
            max_total_points: 3,
            ..config()
        };
        let mut agg = FieldAggregator::new(&cfg);
        let row: Vec<FieldPoint> = (0..10).map(|i| point_at(f64::from(i) * 100.0, 0.0, 0.001)).collect();
        assert!(!agg.merge_source(row));
        assert!(agg.is_truncated());
        assert!(!agg.merge_source(vec![point_at(5000.0, 0.0, 0.001)]));

        let field = agg.finish();
        assert_eq!(field.len(), 3);
        assert!(field.truncated);
    }

    #[test]
    fn test_merge_into_existing_point_at_budget() {
        let cfg = DispersionConfig {
            max_total_points: 1,
            ..config()
        };
        let mut agg = FieldAggregator::new(&cfg);
        assert!(agg.merge_source(vec![point_at(0.0, 0.0, 0.001)]));
        // Merging does not consume budget
        assert!(agg.merge_source(vec![point_at(3.0, 3.0, 0.001)]));
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_heatmap_triples() {
        let mut agg = FieldAggregator::new(&config());
        agg.merge_source(vec![point_at(0.0, 0.0, 0.016)]);
        let data = agg.finish().heatmap_data();
        assert_eq!(data, vec![[ORIGIN.lat, ORIGIN.lng, 1.0]]);
    }

    #[test]
    fn test_empty_field() {
        let field = FieldAggregator::new(&config()).finish();
        assert!(field.is_empty());
        assert_eq!(field.max_concentration, MilligramsPerCubicMeter::ZERO);
    }
}
