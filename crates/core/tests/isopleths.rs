//! Isopleth tracing over the threshold ladder
mod common;

use nalgebra::Vector2;
use plume_core::contour::IsoplethTracer;
use plume_core::{
    AtmosphericConditions, DispersionCalculator, DispersionConfig, EmissionSource,
    StabilityClass, ISOPLETH_LADDER,
};

#[test]
fn test_higher_levels_nest_inside_lower_ones() {
    let config = DispersionConfig::default();
    let tracer = IsoplethTracer::new(&config);
    let source = EmissionSource::new(1, 55.7558, 37.6173, 40.0, 20.0);
    let conditions = AtmosphericConditions::new(2.4, 200.0, StabilityClass::D);
    let model = tracer.model(&source, &conditions);

    let low = tracer
        .outline(&model, ISOPLETH_LADDER[0].threshold(config.reference_limit))
        .expect("20 % contour");
    let high = tracer
        .outline(&model, ISOPLETH_LADDER[3].threshold(config.reference_limit))
        .expect("80 % contour");

    assert!(high.tip <= low.tip);
    for &(x, y_high) in &high.half_widths {
        let y_low = low
            .half_width_at(x)
            .unwrap_or_else(|| panic!("20 % contour missing at x = {x}"));
        assert!(y_low > y_high, "x = {x}: {y_low} <= {y_high}");
    }

    let downwind = Vector2::new(0.0, 1.0);
    assert!(common::ring_area(&high.ring(downwind)) < common::ring_area(&low.ring(downwind)));
}

#[test]
fn test_limit_level_unreachable_for_faint_source() {
    let config = DispersionConfig::default();
    let tracer = IsoplethTracer::new(&config);
    let faint = EmissionSource::new(9, 55.7558, 37.6173, 40.0, 0.001);
    let conditions = AtmosphericConditions::new(3.0, 270.0, StabilityClass::D);
    let top = ISOPLETH_LADDER.last().unwrap();
    assert!(tracer.trace(&faint, &conditions, top).is_none());
}

#[test]
fn test_pass_orders_polygons_by_source_then_level() {
    let calc = DispersionCalculator::default();
    let sources: Vec<EmissionSource> = common::demo_sources()
        .into_iter()
        .map(|s| EmissionSource {
            emission_rate: plume_core::core_types::GramsPerSecond::new(*s.emission_rate * 10.0),
            ..s
        })
        .collect();
    let polygons = calc
        .calculate_isopleths(&sources, &common::westerly(2.0))
        .unwrap();
    assert!(!polygons.is_empty());

    for pair in polygons.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.source_id < b.source_id || (a.source_id == b.source_id && a.level < b.level));
    }
    for polygon in &polygons {
        assert!(polygon.is_closed());
        assert_eq!(polygon.z_index, (polygon.level * 100.0).round() as i32);
    }
}

#[test]
fn test_empty_source_list_gives_no_polygons() {
    let calc = DispersionCalculator::default();
    let polygons = calc
        .calculate_isopleths(&[], &AtmosphericConditions::default())
        .unwrap();
    assert!(polygons.is_empty());
}
