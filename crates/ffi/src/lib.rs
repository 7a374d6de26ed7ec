//! C API for the plume dispersion calculator.
//!
//! Every function returns a [`PlumeErrorCode`]; details of the last failure on
//! the calling thread are available through `plume_get_last_error`. Results
//! are exposed as borrowed snapshot arrays owned by the instance.
//!
//! The header is generated into `PlumeFFI.h` at the workspace root by the
//! build script.

mod error;
mod helpers;
mod instance;
mod queries;
mod simulation;
mod sources;

pub use error::{plume_get_last_error, plume_get_last_error_code, PlumeErrorCode};
pub use instance::{plume_destroy, plume_new, PlumeGridResolution, PlumeInstance};
pub use queries::{
    plume_clear_snapshots, plume_get_field_points, plume_get_isopleth_vertices,
    plume_get_isopleths, plume_get_summary, PlumeExposureStatus, PlumeFieldPoint, PlumeGeoPoint,
    PlumeIsopleth, PlumeSummary,
};
pub use simulation::{
    plume_calculate_field, plume_calculate_isopleths, plume_cancel, plume_is_calculating,
    PlumeProgressCallback,
};
pub use sources::{
    plume_add_source, plume_clear_sources, plume_set_conditions, plume_set_source_conditions,
    plume_source_count, PlumeConditions, PlumeSource,
};
