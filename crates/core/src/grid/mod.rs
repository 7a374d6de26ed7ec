//! Concentration grid pipeline
//!
//! [`FieldGenerator`] samples each source onto a lattice, [`FieldAggregator`]
//! superposes the per-source samples into one [`ConcentrationField`].

pub mod aggregator;
pub mod field_generator;
pub mod spatial;

pub use aggregator::{display_weight, ConcentrationField, FieldAggregator, FieldPoint};
pub use field_generator::{FieldGenerator, SourceField};
pub use spatial::SpatialIndex;
