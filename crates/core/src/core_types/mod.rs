//! Core types and utilities

pub mod geo;
pub mod source;
pub mod units;
pub mod weather;

pub use geo::{GeoPoint, METERS_PER_DEGREE_LAT};
pub use source::{EmissionSource, SourceId};
pub use units::*;
pub use weather::{
    AtmosphericConditions, CompassPoint, DispersionMode, StabilityClass, MIN_WIND_SPEED,
};
