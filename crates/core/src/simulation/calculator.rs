//! Calculation pass orchestration
//!
//! [`DispersionCalculator`] owns the configuration and the busy flag of one
//! field instance. Each public pass acquires the flag for its whole duration;
//! a second pass started meanwhile fails with [`DispersionError::Busy`]
//! instead of queueing.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DispersionConfig;
use crate::contour::{IsoplethPolygon, IsoplethTracer};
use crate::core_types::{AtmosphericConditions, EmissionSource, MilligramsPerCubicMeter};
use crate::error::{DispersionError, DispersionResult};
use crate::grid::{ConcentrationField, FieldAggregator, FieldGenerator, SourceField};
use crate::simulation::guard::{CalculationGuard, CancellationToken, PassTimer};
use crate::simulation::progress::{NoProgress, PassKind, Progress, ProgressSink};
use crate::simulation::summary::{EmissionSummary, SourcePeak};

/// Everything one combined pass produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispersionReport {
    pub field: ConcentrationField,
    pub isopleths: Vec<IsoplethPolygon>,
    pub summary: EmissionSummary,
}

/// Runs dispersion passes for one field instance
pub struct DispersionCalculator {
    config: DispersionConfig,
    calculating: AtomicBool,
}

impl Default for DispersionCalculator {
    fn default() -> Self {
        Self::new(DispersionConfig::default())
    }
}

impl DispersionCalculator {
    /// Create a calculator; the configuration is validated when a pass starts
    pub fn new(config: DispersionConfig) -> Self {
        Self {
            config,
            calculating: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn config(&self) -> &DispersionConfig {
        &self.config
    }

    /// Replace the configuration. Exclusive access means no pass is running.
    pub fn set_config(&mut self, config: DispersionConfig) {
        self.config = config;
    }

    /// A pass currently holds this calculator
    #[must_use]
    pub fn is_calculating(&self) -> bool {
        self.calculating.load(Ordering::Acquire)
    }

    fn begin(&self) -> DispersionResult<CalculationGuard<'_>> {
        let guard = CalculationGuard::acquire(&self.calculating)?;
        self.config.validate()?;
        Ok(guard)
    }

    /// Concentration field for `sources` under `conditions`
    pub fn calculate_field(
        &self,
        sources: &[EmissionSource],
        conditions: &AtmosphericConditions,
    ) -> DispersionResult<ConcentrationField> {
        self.calculate_field_with(sources, conditions, &NoProgress, &CancellationToken::new())
    }

    /// [`Self::calculate_field`] with progress reporting and cancellation
    pub fn calculate_field_with(
        &self,
        sources: &[EmissionSource],
        conditions: &AtmosphericConditions,
        progress: &impl ProgressSink,
        cancel: &CancellationToken,
    ) -> DispersionResult<ConcentrationField> {
        let _guard = self.begin()?;
        self.run_field(sources, conditions, progress, cancel)
    }

    /// Isopleth polygons for every source and ladder rung
    pub fn calculate_isopleths(
        &self,
        sources: &[EmissionSource],
        conditions: &AtmosphericConditions,
    ) -> DispersionResult<Vec<IsoplethPolygon>> {
        self.calculate_isopleths_with(sources, conditions, &NoProgress, &CancellationToken::new())
    }

    /// [`Self::calculate_isopleths`] with progress reporting and cancellation
    pub fn calculate_isopleths_with(
        &self,
        sources: &[EmissionSource],
        conditions: &AtmosphericConditions,
        progress: &impl ProgressSink,
        cancel: &CancellationToken,
    ) -> DispersionResult<Vec<IsoplethPolygon>> {
        let _guard = self.begin()?;
        self.run_isopleths(sources, conditions, progress, cancel)
    }

    /// Field, isopleths and summary under one busy guard
    pub fn calculate(
        &self,
        sources: &[EmissionSource],
        conditions: &AtmosphericConditions,
        progress: &impl ProgressSink,
        cancel: &CancellationToken,
    ) -> DispersionResult<DispersionReport> {
        let _guard = self.begin()?;
        let _timer = PassTimer::new("Combined pass");

        let field = self.run_field(sources, conditions, progress, cancel)?;
        let isopleths = self.run_isopleths(sources, conditions, progress, cancel)?;
        let summary = self.summarize(sources, conditions, &field);

        Ok(DispersionReport {
            field,
            isopleths,
            summary,
        })
    }

    fn run_field(
        &self,
        sources: &[EmissionSource],
        conditions: &AtmosphericConditions,
        progress: &impl ProgressSink,
        cancel: &CancellationToken,
    ) -> DispersionResult<ConcentrationField> {
        let _timer = PassTimer::new("Field pass");
        let total = sources.len();
        info!(
            "Field pass: {} sources, grid step {} m, budget {} points",
            total, self.config.grid_step_m, self.config.max_total_points
        );
        progress.report(Progress {
            kind: PassKind::Field,
            completed_sources: 0,
            total_sources: total,
        });

        if sources.is_empty() {
            info!("No sources, field cleared");
            return Ok(ConcentrationField::empty());
        }

        let generator = FieldGenerator::new(&self.config);
        let mut aggregator = FieldAggregator::new(&self.config);
        let chunk_size = rayon::current_num_threads().max(1);
        let mut completed = 0;

        'chunks: for chunk in sources.chunks(chunk_size) {
            if cancel.is_cancelled() {
                return Err(cancelled(completed, total));
            }

            // Workers only generate; merging stays in source order on this thread
            let fields: Vec<Option<SourceField>> = chunk
                .par_iter()
                .map(|source| {
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(generator.generate(source, source.conditions(conditions)))
                })
                .collect();

            for field in fields {
                let Some(field) = field else {
                    return Err(cancelled(completed, total));
                };
                let keep_going = aggregator.merge_source(field.points);
                completed += 1;
                progress.report(Progress {
                    kind: PassKind::Field,
                    completed_sources: completed,
                    total_sources: total,
                });
                if !keep_going {
                    break 'chunks;
                }
            }
        }

        let field = aggregator.finish();
        info!(
            "Field pass done: {} points, max {}",
            field.len(),
            field.max_concentration
        );
        Ok(field)
    }

    fn run_isopleths(
        &self,
        sources: &[EmissionSource],
        conditions: &AtmosphericConditions,
        progress: &impl ProgressSink,
        cancel: &CancellationToken,
    ) -> DispersionResult<Vec<IsoplethPolygon>> {
        let _timer = PassTimer::new("Isopleth pass");
        let total = sources.len();
        info!("Isopleth pass: {} sources", total);
        progress.report(Progress {
            kind: PassKind::Isopleths,
            completed_sources: 0,
            total_sources: total,
        });

        let tracer = IsoplethTracer::new(&self.config);
        let mut polygons = Vec::new();

        for (i, source) in sources.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(cancelled(i, total));
            }
            let traced = tracer.trace_ladder(source, source.conditions(conditions));
            debug!("Source {}: {} isopleths", source.id, traced.len());
            polygons.extend(traced);
            progress.report(Progress {
                kind: PassKind::Isopleths,
                completed_sources: i + 1,
                total_sources: total,
            });
        }

        info!("Isopleth pass done: {} polygons", polygons.len());
        Ok(polygons)
    }

    /// Summary scalars for `sources`, using `field` for the maximum.
    ///
    /// When the field holds nothing, the maximum falls back to each source's
    /// concentration one meter downwind of the stack.
    pub fn summarize(
        &self,
        sources: &[EmissionSource],
        conditions: &AtmosphericConditions,
        field: &ConcentrationField,
    ) -> EmissionSummary {
        let generator = FieldGenerator::new(&self.config);
        let tracer = IsoplethTracer::new(&self.config);

        let max_concentration = if *field.max_concentration > 0.0 {
            field.max_concentration
        } else {
            sources
                .iter()
                .map(|s| {
                    let local = s.conditions(conditions);
                    generator
                        .model(s, local)
                        .concentration_at(1.0, local.downwind_bearing())
                })
                .max()
                .unwrap_or(MilligramsPerCubicMeter::ZERO)
        };

        let peaks = sources
            .iter()
            .map(|s| SourcePeak {
                source_id: s.id,
                name: s.name.clone(),
                peak: tracer
                    .model(s, s.conditions(conditions))
                    .peak_ground_concentration(self.config.peak_search_step_m),
            })
            .collect();

        EmissionSummary::new(sources, max_concentration, self.config.reference_limit, peaks)
    }
}

fn cancelled(completed_sources: usize, total_sources: usize) -> DispersionError {
    info!(
        "Pass cancelled after {} of {} sources",
        completed_sources, total_sources
    );
    DispersionError::Cancelled {
        completed_sources,
        total_sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::StabilityClass;
    use std::cell::RefCell;

    fn demo_sources() -> Vec<EmissionSource> {
        vec![
            EmissionSource::new(1, 55.7558, 37.6173, 40.0, 3.7),
            EmissionSource::new(2, 55.7600, 37.6250, 35.0, 2.5),
        ]
    }

    #[test]
    fn test_invalid_config_rejected_and_flag_released() {
        let calc = DispersionCalculator::new(DispersionConfig {
            max_total_points: 0,
            ..DispersionConfig::default()
        });
        let result = calc.calculate_field(&demo_sources(), &AtmosphericConditions::default());
        assert!(matches!(result, Err(DispersionError::InvalidConfig(_))));
        assert!(!calc.is_calculating());
    }

    #[test]
    fn test_progress_reports_every_source() {
        let calc = DispersionCalculator::default();
        let seen = RefCell::new(Vec::new());
        let sink = |p: Progress| seen.borrow_mut().push((p.kind, p.completed_sources));
        calc.calculate_isopleths_with(
            &demo_sources(),
            &AtmosphericConditions::default(),
            &sink,
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![(PassKind::Isopleths, 0), (PassKind::Isopleths, 1), (PassKind::Isopleths, 2)]
        );
    }

    #[test]
    fn test_pre_cancelled_pass() {
        let calc = DispersionCalculator::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = calc.calculate_field_with(
            &demo_sources(),
            &AtmosphericConditions::default(),
            &NoProgress,
            &cancel,
        );
        assert_eq!(
            result,
            Err(DispersionError::Cancelled { completed_sources: 0, total_sources: 2 })
        );
        assert!(!calc.is_calculating());
    }

    #[test]
    fn test_summary_falls_back_to_near_stack_value() {
        let calc = DispersionCalculator::default();
        let conditions = AtmosphericConditions::new(3.0, 270.0, StabilityClass::D);
        let summary = calc.summarize(&demo_sources(), &conditions, &ConcentrationField::empty());
        assert_eq!(summary.source_count, 2);
        assert_eq!(summary.peaks.len(), 2);
        assert!(summary.peaks.iter().all(|p| p.peak.is_some()));
    }

    #[test]
    fn test_combined_pass() {
        let calc = DispersionCalculator::default();
        let conditions = AtmosphericConditions::new(2.4, 180.0, StabilityClass::D);
        let report = calc
            .calculate(&demo_sources(), &conditions, &NoProgress, &CancellationToken::new())
            .unwrap();
        assert!(!report.field.is_empty());
        assert_eq!(report.summary.max_concentration, report.field.max_concentration);
        assert!(report.isopleths.iter().all(IsoplethPolygon::is_closed));
    }
}
