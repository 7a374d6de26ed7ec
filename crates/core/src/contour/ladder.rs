//! Fixed threshold ladder for isopleth rendering

use crate::core_types::MilligramsPerCubicMeter;

/// One rung of the ladder: a fraction of the reference limit and its fill colour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoplethLevel {
    /// Threshold as a fraction of the limit (1.0 = at the limit)
    pub fraction: f64,
    /// `#RRGGBB`
    pub color: &'static str,
}

impl IsoplethLevel {
    /// Absolute concentration of this rung
    #[must_use]
    pub fn threshold(&self, limit: MilligramsPerCubicMeter) -> MilligramsPerCubicMeter {
        limit * self.fraction
    }

    /// Stacking order: higher thresholds draw on top
    #[must_use]
    pub fn z_index(&self) -> i32 {
        (self.fraction * 100.0).round() as i32
    }
}

/// 20 % to 100 % of the limit, green to red, ascending
pub const ISOPLETH_LADDER: [IsoplethLevel; 5] = [
    IsoplethLevel { fraction: 0.2, color: "#00FF00" },
    IsoplethLevel { fraction: 0.4, color: "#7FFF00" },
    IsoplethLevel { fraction: 0.6, color: "#FFFF00" },
    IsoplethLevel { fraction: 0.8, color: "#FFA500" },
    IsoplethLevel { fraction: 1.0, color: "#FF0000" },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ladder_ascends() {
        assert!(ISOPLETH_LADDER.windows(2).all(|w| w[0].fraction < w[1].fraction));
        let z: Vec<i32> = ISOPLETH_LADDER.iter().map(IsoplethLevel::z_index).collect();
        assert_eq!(z, vec![20, 40, 60, 80, 100]);
    }

    #[test]
    fn test_threshold_scales_limit() {
        let limit = MilligramsPerCubicMeter::new(0.008);
        let top = ISOPLETH_LADDER[4].threshold(limit);
        assert!((*top - 0.008).abs() < 1e-15);
        let bottom = ISOPLETH_LADDER[0].threshold(limit);
        assert!((*bottom - 0.0016).abs() < 1e-15);
    }
}
