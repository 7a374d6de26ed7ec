//! Gaussian plume physics
//!
//! Stability tables, σ models and the concentration function. Everything
//! here is pure: no state, no logging beyond the stability-code fallback.

pub mod plume;
pub mod sigma;
pub mod stability;

pub use plume::{gaussian_core, CenterlineAmplitude, PeakConcentration, PlumeModel};
pub use sigma::{
    LogQuadraticSigma, PowerLawSigma, SigmaModel, SigmaParameterization, Sigmas,
    LOG_QUADRATIC_MIN_DISTANCE,
};
pub use stability::{
    log_quadratic_coefficients, power_law_coefficients, LogQuadraticCoefficients,
    PowerLawCoefficients,
};
