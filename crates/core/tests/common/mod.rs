//! Shared fixtures for the integration tests
#![allow(dead_code)]

use plume_core::{AtmosphericConditions, EmissionSource, StabilityClass};
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Three stacks around central Moscow, as in the demo layout
pub fn demo_sources() -> Vec<EmissionSource> {
    vec![
        EmissionSource::new(1, 55.7558, 37.6173, 40.0, 3.7).named("Boiler house"),
        EmissionSource::new(2, 55.7600, 37.6250, 35.0, 2.5).named("Refinery flare"),
        EmissionSource::new(3, 55.7500, 37.6100, 45.0, 4.2).named("Waste incinerator"),
    ]
}

pub fn westerly(speed: f64) -> AtmosphericConditions {
    AtmosphericConditions::new(speed, 270.0, StabilityClass::D)
}

/// Shoelace area of a ring given in local meters
pub fn ring_area(ring: &[nalgebra::Vector2<f64>]) -> f64 {
    ring.windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>()
        .abs()
        / 2.0
}
