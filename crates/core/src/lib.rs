//! Plume Dispersion Core Library
//!
//! Steady-state Gaussian plume model for interactive air-quality maps. Given
//! point emission sources and the current meteorology it produces:
//!
//! - a concentration field of weighted heat-map points, superposed over all
//!   sources and capped by a point budget
//! - isopleth polygons enclosing 20/40/60/80/100 % of a reference limit
//! - summary scalars and an exposure status
//!
//! ## Example
//!
//! ```
//! use plume_core::{AtmosphericConditions, DispersionCalculator, EmissionSource, StabilityClass};
//!
//! let calculator = DispersionCalculator::default();
//! let sources = vec![EmissionSource::new(1, 55.7558, 37.6173, 40.0, 3.7)];
//! let conditions = AtmosphericConditions::new(2.4, 180.0, StabilityClass::D);
//!
//! let field = calculator.calculate_field(&sources, &conditions).unwrap();
//! let isopleths = calculator.calculate_isopleths(&sources, &conditions).unwrap();
//! assert!(!field.is_empty());
//! assert!(isopleths.iter().all(|p| p.is_closed()));
//! ```

pub mod config;
pub mod contour;
pub mod core_types;
pub mod error;
pub mod grid;
pub mod physics;
pub mod simulation;

pub use config::{DispersionConfig, DistanceLimits, GridResolution};
pub use contour::{IsoplethLevel, IsoplethPolygon, IsoplethTracer, ISOPLETH_LADDER};
pub use core_types::{
    AtmosphericConditions, CompassPoint, DispersionMode, EmissionSource, GeoPoint, SourceId,
    StabilityClass,
};
pub use error::{DispersionError, DispersionResult};
pub use grid::{ConcentrationField, FieldPoint};
pub use physics::{PeakConcentration, PlumeModel, SigmaModel, SigmaParameterization};
pub use simulation::{
    CancellationToken, DispersionCalculator, DispersionReport, EmissionSummary, ExposureStatus,
    NoProgress, PassKind, Progress, ProgressSink, SourcePeak,
};
