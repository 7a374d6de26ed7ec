use plume_core::{
    AtmosphericConditions, DispersionError, DispersionResult, EmissionSource, PassKind, Progress,
};
use std::os::raw::c_void;

use crate::error::{DefaultPlumeError, PlumeErrorCode};
use crate::helpers::{handle_ffi_result, instance_from_ptr, lock};
use crate::instance::PlumeInstance;

/// Progress callback, invoked on the thread running the pass.
///
/// `pass` is 0 for the field pass and 1 for the isopleth pass.
pub type PlumeProgressCallback = Option<
    unsafe extern "C" fn(pass: u8, completed_sources: usize, total_sources: usize, user_data: *mut c_void),
>;

/// Copy the inputs so no lock is held while the pass runs
fn pass_inputs(
    instance: &PlumeInstance,
) -> Result<(Vec<EmissionSource>, AtmosphericConditions), DefaultPlumeError> {
    let sources = lock(&instance.sources, "sources")?.clone();
    let conditions = *lock(&instance.conditions, "conditions")?;
    Ok((sources, conditions))
}

/// Run one pass and settle the cancellation flag.
///
/// A pass rejected as busy leaves the flag alone, since it belongs to the pass
/// that is running. Every other outcome consumes it.
fn run_pass<T>(
    instance: &PlumeInstance,
    callback: PlumeProgressCallback,
    user_data: *mut c_void,
    pass: impl FnOnce(&dyn Fn(Progress)) -> DispersionResult<T>,
) -> Result<T, DefaultPlumeError> {
    let report = |p: Progress| {
        if let Some(callback) = callback {
            let kind = match p.kind {
                PassKind::Field => 0,
                PassKind::Isopleths => 1,
            };
            // SAFETY: the caller supplied the callback and its user data together.
            unsafe { callback(kind, p.completed_sources, p.total_sources, user_data) };
        }
    };

    let result = pass(&report);
    if !matches!(result, Err(DispersionError::Busy)) {
        instance.cancel.reset();
    }
    result.map_err(|e| DefaultPlumeError::from(&e))
}

/// Compute the concentration field for the current sources and conditions.
///
/// Blocks until the pass finishes. On success the field snapshot is replaced;
/// read it with `plume_get_field_points`. On failure the previous snapshot is kept.
///
/// Returns
/// - `PlumeErrorCode::Ok` on success
/// - `PlumeErrorCode::Busy` if another pass is running on this instance
/// - `PlumeErrorCode::Cancelled` if `plume_cancel` was called
/// - `PlumeErrorCode::InvalidConfig` if the instance configuration is invalid
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `callback` may be null; if set it is called with `user_data` as its last argument.
#[no_mangle]
pub unsafe extern "C" fn plume_calculate_field(
    ptr: *const PlumeInstance,
    callback: PlumeProgressCallback,
    user_data: *mut c_void,
) -> PlumeErrorCode {
    handle_ffi_result(|| {
        let instance = instance_from_ptr(ptr)?;
        let (sources, conditions) = pass_inputs(instance)?;
        let field = run_pass(instance, callback, user_data, |report| {
            instance
                .calculator
                .calculate_field_with(&sources, &conditions, &report, &instance.cancel)
        })?;
        instance.store_field(field)
    })
}

/// Trace the isopleth polygons for the current sources and conditions.
///
/// Same blocking, snapshot and error behavior as `plume_calculate_field`;
/// read the result with `plume_get_isopleths` and `plume_get_isopleth_vertices`.
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `callback` may be null; if set it is called with `user_data` as its last argument.
#[no_mangle]
pub unsafe extern "C" fn plume_calculate_isopleths(
    ptr: *const PlumeInstance,
    callback: PlumeProgressCallback,
    user_data: *mut c_void,
) -> PlumeErrorCode {
    handle_ffi_result(|| {
        let instance = instance_from_ptr(ptr)?;
        let (sources, conditions) = pass_inputs(instance)?;
        let polygons = run_pass(instance, callback, user_data, |report| {
            instance
                .calculator
                .calculate_isopleths_with(&sources, &conditions, &report, &instance.cancel)
        })?;
        instance.store_isopleths(&polygons)
    })
}

/// Ask the running pass to stop at its next checkpoint.
///
/// Callable from any thread. If no pass is running, the next pass on this
/// instance stops before doing any work.
///
/// # Safety
/// `ptr` must be null or a live pointer from `plume_new`.
#[no_mangle]
pub unsafe extern "C" fn plume_cancel(ptr: *const PlumeInstance) -> PlumeErrorCode {
    handle_ffi_result(|| {
        let instance = instance_from_ptr(ptr)?;
        instance.cancel.cancel();
        Ok(())
    })
}

/// Whether a pass currently holds the instance. Null reads as `false`.
///
/// # Safety
/// `ptr` must be null or a live pointer from `plume_new`.
#[no_mangle]
pub unsafe extern "C" fn plume_is_calculating(ptr: *const PlumeInstance) -> bool {
    instance_from_ptr(ptr).is_ok_and(|instance| instance.calculator.is_calculating())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{plume_destroy, plume_new, PlumeGridResolution};
    use crate::queries::{
        plume_get_field_points, plume_get_isopleth_vertices, plume_get_isopleths,
        plume_get_summary, PlumeExposureStatus, PlumeFieldPoint, PlumeGeoPoint, PlumeIsopleth,
        PlumeSummary,
    };
    use crate::sources::{plume_add_source, plume_set_conditions, PlumeConditions, PlumeSource};
    use std::ptr;

    unsafe extern "C" fn count_calls(
        _pass: u8,
        _completed: usize,
        _total: usize,
        user_data: *mut c_void,
    ) {
        unsafe { *user_data.cast::<usize>() += 1 };
    }

    fn new_instance() -> *mut PlumeInstance {
        let mut plume = ptr::null_mut();
        assert_eq!(
            unsafe { plume_new(PlumeGridResolution::Coarse, &mut plume) },
            PlumeErrorCode::Ok
        );
        let source = PlumeSource {
            id: 1,
            lat: 55.7558,
            lng: 37.6173,
            stack_height: 40.0,
            emission_rate: 37.0,
        };
        let conditions = PlumeConditions {
            wind_speed: 2.4,
            wind_direction: 270.0,
            stability_class: b'D',
            dispersion_mode: 1,
            wind_effect_strength: 0.5,
        };
        unsafe {
            assert_eq!(plume_add_source(plume, &source, ptr::null()), PlumeErrorCode::Ok);
            assert_eq!(plume_set_conditions(plume, &conditions), PlumeErrorCode::Ok);
        }
        plume
    }

    #[test]
    fn test_field_round_trip_through_c_api() {
        let plume = new_instance();
        let mut calls = 0usize;
        let code = unsafe {
            plume_calculate_field(plume, Some(count_calls), ptr::addr_of_mut!(calls).cast())
        };
        assert_eq!(code, PlumeErrorCode::Ok);
        assert_eq!(calls, 2);

        let mut len = 0;
        let mut points: *const PlumeFieldPoint = ptr::null();
        unsafe {
            assert_eq!(plume_get_field_points(plume, &mut len, &mut points), PlumeErrorCode::Ok);
        }
        assert!(len > 0);
        let points = unsafe { std::slice::from_raw_parts(points, len) };
        assert!(points.iter().all(|p| (0.01..=1.0).contains(&p.weight)));

        let mut summary = PlumeSummary {
            source_count: 0,
            total_emission: 0.0,
            average_emission: 0.0,
            max_concentration: 0.0,
            max_percent_of_limit: 0.0,
            status: PlumeExposureStatus::NoExposure,
        };
        unsafe {
            assert_eq!(plume_get_summary(plume, &mut summary), PlumeErrorCode::Ok);
        }
        assert_eq!(summary.source_count, 1);
        assert!(summary.max_concentration > 0.0);

        unsafe { plume_destroy(plume) };
    }

    #[test]
    fn test_isopleth_vertices_are_partitioned() {
        let plume = new_instance();
        unsafe {
            assert_eq!(
                plume_calculate_isopleths(plume, None, ptr::null_mut()),
                PlumeErrorCode::Ok
            );
        }
        let (mut n_polys, mut n_verts) = (0, 0);
        let mut polys: *const PlumeIsopleth = ptr::null();
        let mut verts: *const PlumeGeoPoint = ptr::null();
        unsafe {
            assert_eq!(plume_get_isopleths(plume, &mut n_polys, &mut polys), PlumeErrorCode::Ok);
            assert_eq!(
                plume_get_isopleth_vertices(plume, &mut n_verts, &mut verts),
                PlumeErrorCode::Ok
            );
        }
        let polys = unsafe { std::slice::from_raw_parts(polys, n_polys) };
        assert!(!polys.is_empty());
        let covered: usize = polys.iter().map(|p| p.vertex_count).sum();
        assert_eq!(covered, n_verts);
        for pair in polys.windows(2) {
            assert_eq!(pair[1].vertex_offset, pair[0].vertex_offset + pair[0].vertex_count);
        }
        unsafe { plume_destroy(plume) };
    }

    #[test]
    fn test_cancel_before_pass() {
        let plume = new_instance();
        unsafe {
            assert_eq!(plume_cancel(plume), PlumeErrorCode::Ok);
            assert_eq!(
                plume_calculate_field(plume, None, ptr::null_mut()),
                PlumeErrorCode::Cancelled
            );
            // Flag consumed by the cancelled pass
            assert_eq!(
                plume_calculate_field(plume, None, ptr::null_mut()),
                PlumeErrorCode::Ok
            );
            assert!(!plume_is_calculating(plume));
            plume_destroy(plume);
        }
    }

    #[test]
    fn test_null_instance() {
        unsafe {
            assert_eq!(
                plume_calculate_field(ptr::null(), None, ptr::null_mut()),
                PlumeErrorCode::NullPointer
            );
            assert!(!plume_is_calculating(ptr::null()));
        }
        assert_eq!(
            crate::error::plume_get_last_error_code(),
            PlumeErrorCode::NullPointer
        );
    }
}
