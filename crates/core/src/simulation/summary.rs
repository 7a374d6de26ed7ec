//! Scalar summary of a pass

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core_types::{EmissionSource, GramsPerSecond, MilligramsPerCubicMeter, Percent, SourceId};
use crate::physics::PeakConcentration;

/// Exposure relative to the reference limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExposureStatus {
    /// Nothing measurable
    NoExposure,
    /// Above zero, at most 80 % of the limit
    Within,
    /// Above 80 %, at most 100 %
    Approaching,
    /// Above the limit
    Exceeding,
}

impl ExposureStatus {
    pub fn classify(max_percent: Percent) -> Self {
        let pct = *max_percent;
        if pct > 100.0 {
            Self::Exceeding
        } else if pct > 80.0 {
            Self::Approaching
        } else if pct > 0.0 {
            Self::Within
        } else {
            Self::NoExposure
        }
    }
}

impl fmt::Display for ExposureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoExposure => "no exposure",
            Self::Within => "within limit",
            Self::Approaching => "approaching limit",
            Self::Exceeding => "exceeding limit",
        })
    }
}

/// Ground-level maximum of one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePeak {
    pub source_id: SourceId,
    pub name: String,
    /// `None` when the source emits nothing
    pub peak: Option<PeakConcentration>,
}

/// Totals and status for a set of sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionSummary {
    pub source_count: usize,
    pub total_emission: GramsPerSecond,
    pub average_emission: GramsPerSecond,
    pub max_concentration: MilligramsPerCubicMeter,
    pub max_percent_of_limit: Percent,
    pub status: ExposureStatus,
    pub peaks: Vec<SourcePeak>,
}

impl EmissionSummary {
    /// Summarize `sources` given the largest concentration found
    pub fn new(
        sources: &[EmissionSource],
        max_concentration: MilligramsPerCubicMeter,
        limit: MilligramsPerCubicMeter,
        peaks: Vec<SourcePeak>,
    ) -> Self {
        let total_emission = sources
            .iter()
            .fold(GramsPerSecond::default(), |acc, s| acc + s.emission_rate);
        let average_emission = if sources.is_empty() {
            GramsPerSecond::default()
        } else {
            total_emission / sources.len() as f64
        };
        let max_percent_of_limit = max_concentration.percent_of(limit);

        Self {
            source_count: sources.len(),
            total_emission,
            average_emission,
            max_concentration,
            max_percent_of_limit,
            status: ExposureStatus::classify(max_percent_of_limit),
            peaks,
        }
    }

    /// How many times the limit is exceeded, if it is
    #[must_use]
    pub fn exceedance_factor(&self) -> Option<f64> {
        (self.status == ExposureStatus::Exceeding).then(|| self.max_percent_of_limit.to_fraction())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_status_boundaries() {
        assert_eq!(ExposureStatus::classify(Percent::new(0.0)), ExposureStatus::NoExposure);
        assert_eq!(ExposureStatus::classify(Percent::new(0.001)), ExposureStatus::Within);
        assert_eq!(ExposureStatus::classify(Percent::new(80.0)), ExposureStatus::Within);
        assert_eq!(ExposureStatus::classify(Percent::new(80.5)), ExposureStatus::Approaching);
        assert_eq!(ExposureStatus::classify(Percent::new(100.0)), ExposureStatus::Approaching);
        assert_eq!(ExposureStatus::classify(Percent::new(100.1)), ExposureStatus::Exceeding);
    }

    #[test]
    fn test_totals_and_average() {
        let sources = vec![
            EmissionSource::new(1, 55.0, 37.0, 40.0, 3.7),
            EmissionSource::new(2, 55.0, 37.0, 35.0, 2.5),
            EmissionSource::new(3, 55.0, 37.0, 45.0, 4.2),
        ];
        let limit = MilligramsPerCubicMeter::new(0.008);
        let summary = EmissionSummary::new(&sources, MilligramsPerCubicMeter::new(0.012), limit, Vec::new());

        assert_eq!(summary.source_count, 3);
        assert_relative_eq!(*summary.total_emission, 10.4, epsilon = 1e-12);
        assert_relative_eq!(*summary.average_emission, 10.4 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(*summary.max_percent_of_limit, 150.0, epsilon = 1e-9);
        assert_eq!(summary.status, ExposureStatus::Exceeding);
        assert_relative_eq!(summary.exceedance_factor().unwrap(), 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_summary() {
        let summary = EmissionSummary::new(
            &[],
            MilligramsPerCubicMeter::ZERO,
            MilligramsPerCubicMeter::new(0.008),
            Vec::new(),
        );
        assert_eq!(summary.status, ExposureStatus::NoExposure);
        assert_eq!(*summary.average_emission, 0.0);
        assert!(summary.exceedance_factor().is_none());
    }
}
