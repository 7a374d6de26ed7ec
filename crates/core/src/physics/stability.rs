//! Pasquill-Gifford dispersion coefficients per stability class
//!
//! Two independent fits of the same curves are tabulated here. They are not
//! interchangeable term by term, so each σ strategy reads exactly one table.

use serde::{Deserialize, Serialize};

use crate::core_types::StabilityClass;

/// Coefficients of the power-law fit `σy = a·x·(1+b·x)^c`, `σz = d·x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLawCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

/// Coefficients of the log-quadratic regression `σ = exp(I + J·ln x + K·(ln x)²)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogQuadraticCoefficients {
    pub iy: f64,
    pub jy: f64,
    pub ky: f64,
    pub iz: f64,
    pub jz: f64,
    pub kz: f64,
}

const POWER_LAW: [PowerLawCoefficients; 6] = [
    PowerLawCoefficients { a: 0.22, b: 0.0001, c: -0.5, d: 0.2 },
    PowerLawCoefficients { a: 0.16, b: 0.0001, c: -0.5, d: 0.12 },
    PowerLawCoefficients { a: 0.11, b: 0.0001, c: -0.5, d: 0.08 },
    PowerLawCoefficients { a: 0.08, b: 0.0001, c: -0.5, d: 0.06 },
    PowerLawCoefficients { a: 0.06, b: 0.0001, c: -0.5, d: 0.03 },
    PowerLawCoefficients { a: 0.04, b: 0.0001, c: -0.5, d: 0.016 },
];

const LOG_QUADRATIC: [LogQuadraticCoefficients; 6] = [
    LogQuadraticCoefficients { iy: -1.104, jy: 0.9878, ky: -0.0076, iz: 4.679, jz: -1.7172, kz: 0.2770 },
    LogQuadraticCoefficients { iy: -1.634, jy: 1.0350, ky: -0.0096, iz: -1.999, jz: 0.8752, kz: 0.0136 },
    LogQuadraticCoefficients { iy: -2.054, jy: 1.0231, ky: -0.0076, iz: -2.341, jz: 0.9477, kz: -0.0020 },
    LogQuadraticCoefficients { iy: -2.555, jy: 1.0423, ky: -0.0087, iz: -3.186, jz: 1.1737, kz: -0.0316 },
    LogQuadraticCoefficients { iy: -2.754, jy: 1.0106, ky: -0.0064, iz: -3.783, jz: 1.3010, kz: -0.0450 },
    LogQuadraticCoefficients { iy: -3.143, jy: 1.0148, ky: -0.0070, iz: -4.490, jz: 1.4024, kz: -0.0540 },
];

#[inline]
const fn table_index(class: StabilityClass) -> usize {
    match class {
        StabilityClass::A => 0,
        StabilityClass::B => 1,
        StabilityClass::C => 2,
        StabilityClass::D => 3,
        StabilityClass::E => 4,
        StabilityClass::F => 5,
    }
}

/// Power-law coefficients for a class
#[must_use]
pub const fn power_law_coefficients(class: StabilityClass) -> PowerLawCoefficients {
    POWER_LAW[table_index(class)]
}

/// Log-quadratic coefficients for a class
#[must_use]
pub const fn log_quadratic_coefficients(class: StabilityClass) -> LogQuadraticCoefficients {
    LOG_QUADRATIC[table_index(class)]
}

/// Power-law coefficients for a raw class code.
///
/// Codes outside A-F resolve to neutral (D) via [`StabilityClass::from_code`].
pub fn power_law_coefficients_for_code(code: &str) -> PowerLawCoefficients {
    power_law_coefficients(StabilityClass::from_code(code))
}

/// Log-quadratic coefficients for a raw class code, with the same D fallback
pub fn log_quadratic_coefficients_for_code(code: &str) -> LogQuadraticCoefficients {
    log_quadratic_coefficients(StabilityClass::from_code(code))
}
