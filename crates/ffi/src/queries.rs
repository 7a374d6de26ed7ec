use plume_core::{
    ConcentrationField, EmissionSummary, ExposureStatus, FieldPoint, GeoPoint, IsoplethPolygon,
};
use std::ptr;
use std::sync::MutexGuard;

use crate::error::{DefaultPlumeError, PlumeErrorCode};
use crate::helpers::{handle_ffi_result, instance_from_ptr, lock};
use crate::instance::PlumeInstance;

/// Latitude/longitude pair in degrees.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeGeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl From<&GeoPoint> for PlumeGeoPoint {
    fn from(point: &GeoPoint) -> Self {
        Self {
            lat: point.lat,
            lng: point.lng,
        }
    }
}

/// One heatmap sample. Keep this layout stable for C/C++/C# consumers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeFieldPoint {
    pub position: PlumeGeoPoint,
    /// mg/m³ summed over all sources
    pub concentration: f64,
    /// Concentration as a percentage of the reference limit
    pub percent_of_limit: f64,
    /// Display intensity in [0.01, 1]
    pub weight: f64,
}

impl From<&FieldPoint> for PlumeFieldPoint {
    fn from(point: &FieldPoint) -> Self {
        Self {
            position: PlumeGeoPoint::from(&point.position),
            concentration: *point.concentration,
            percent_of_limit: *point.percent_of_limit,
            weight: point.weight,
        }
    }
}

/// One isopleth polygon. Its vertices live in the shared vertex snapshot at
/// `[vertex_offset, vertex_offset + vertex_count)`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeIsopleth {
    pub source_id: u32,
    /// Fraction of the reference limit (0.2 .. 1.0)
    pub level: f64,
    /// mg/m³ this contour encloses
    pub threshold: f64,
    /// Display color as `0xRRGGBB`
    pub color_rgb: u32,
    pub z_index: i32,
    /// Farthest downwind reach in meters
    pub tip_distance: f64,
    pub vertex_offset: usize,
    pub vertex_count: usize,
}

fn color_rgb(color: &str) -> u32 {
    u32::from_str_radix(color.trim_start_matches('#'), 16).unwrap_or(0)
}

/// Exposure category of the summary maximum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlumeExposureStatus {
    NoExposure = 0,
    Within = 1,
    Approaching = 2,
    Exceeding = 3,
}

impl From<ExposureStatus> for PlumeExposureStatus {
    fn from(status: ExposureStatus) -> Self {
        match status {
            ExposureStatus::NoExposure => Self::NoExposure,
            ExposureStatus::Within => Self::Within,
            ExposureStatus::Approaching => Self::Approaching,
            ExposureStatus::Exceeding => Self::Exceeding,
        }
    }
}

/// Summary scalars for the current sources and the last field pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumeSummary {
    pub source_count: usize,
    /// g/s
    pub total_emission: f64,
    /// g/s
    pub average_emission: f64,
    /// mg/m³
    pub max_concentration: f64,
    pub max_percent_of_limit: f64,
    pub status: PlumeExposureStatus,
}

impl From<&EmissionSummary> for PlumeSummary {
    fn from(summary: &EmissionSummary) -> Self {
        Self {
            source_count: summary.source_count,
            total_emission: *summary.total_emission,
            average_emission: *summary.average_emission,
            max_concentration: *summary.max_concentration,
            max_percent_of_limit: *summary.max_percent_of_limit,
            status: summary.status.into(),
        }
    }
}

impl PlumeInstance {
    /// Rebuild the field snapshot from `field` and keep `field` for the summary.
    pub(crate) fn store_field(&self, field: ConcentrationField) -> Result<(), DefaultPlumeError> {
        let mut snapshot = lock(&self.field_snapshot, "field_snapshot")?;
        snapshot.clear();
        snapshot.extend(field.points.iter().map(PlumeFieldPoint::from));
        *lock(&self.last_field, "last_field")? = field;
        Ok(())
    }

    /// Rebuild the polygon and vertex snapshots from `polygons`.
    pub(crate) fn store_isopleths(&self, polygons: &[IsoplethPolygon]) -> Result<(), DefaultPlumeError> {
        let mut headers = lock(&self.isopleth_snapshot, "isopleth_snapshot")?;
        let mut vertices = lock(&self.vertex_snapshot, "vertex_snapshot")?;
        headers.clear();
        vertices.clear();

        for polygon in polygons {
            headers.push(PlumeIsopleth {
                source_id: polygon.source_id,
                level: polygon.level,
                threshold: *polygon.threshold,
                color_rgb: color_rgb(&polygon.color),
                z_index: polygon.z_index,
                tip_distance: *polygon.tip_distance,
                vertex_offset: vertices.len(),
                vertex_count: polygon.vertex_count(),
            });
            vertices.extend(polygon.vertices.iter().map(PlumeGeoPoint::from));
        }
        Ok(())
    }
}

/// Write a borrowed view of `snapshot` to the out pointers.
///
/// # Safety
/// Both pointers must be valid for writes.
unsafe fn publish<T>(snapshot: &[T], out_len: *mut usize, out_array: *mut *const T) {
    unsafe {
        *out_len = snapshot.len();
        *out_array = snapshot.as_ptr();
    }
}

/// Shared body of the borrowed-array getters: null checks, publish, null out on error.
unsafe fn borrow_snapshot<T>(
    ptr: *const PlumeInstance,
    out_len: *mut usize,
    out_array: *mut *const T,
    select: impl FnOnce(&PlumeInstance) -> Result<MutexGuard<'_, Vec<T>>, DefaultPlumeError>,
) -> PlumeErrorCode {
    let result = handle_ffi_result(|| {
        if out_len.is_null() {
            return Err(DefaultPlumeError::null_pointer("out_len"));
        }
        if out_array.is_null() {
            return Err(DefaultPlumeError::null_pointer("out_array"));
        }
        let instance = instance_from_ptr(ptr)?;
        let snapshot = select(instance)?;
        unsafe { publish(&snapshot, out_len, out_array) };
        Ok(())
    });

    // Set to null on error (per documentation contract)
    if result != PlumeErrorCode::Ok {
        unsafe {
            if !out_len.is_null() {
                *out_len = 0;
            }
            if !out_array.is_null() {
                *out_array = ptr::null();
            }
        }
    }
    result
}

/// Borrowed pointer to the field points of the last successful field pass.
///
/// The pointer is valid until the next `plume_calculate_field`,
/// `plume_clear_snapshots` or `plume_destroy` on this instance.
/// **DO NOT FREE THIS POINTER**.
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `out_len` and `out_array` must be null or valid for writes.
///
/// Example:
/// ```c
/// uintptr_t len = 0;
/// const PlumeFieldPoint* points = NULL;
/// if (plume_get_field_points(plume, &len, &points) == Ok) {
///     for (uintptr_t i = 0; i < len; i++) {
///         draw_heat(points[i].position.lat, points[i].position.lng, points[i].weight);
///     }
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn plume_get_field_points(
    ptr: *const PlumeInstance,
    out_len: *mut usize,
    out_array: *mut *const PlumeFieldPoint,
) -> PlumeErrorCode {
    unsafe {
        borrow_snapshot(ptr, out_len, out_array, |instance| {
            lock(&instance.field_snapshot, "field_snapshot")
        })
    }
}

/// Borrowed pointer to the polygons of the last successful isopleth pass,
/// ordered by source then level. Same lifetime rules as `plume_get_field_points`.
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `out_len` and `out_array` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn plume_get_isopleths(
    ptr: *const PlumeInstance,
    out_len: *mut usize,
    out_array: *mut *const PlumeIsopleth,
) -> PlumeErrorCode {
    unsafe {
        borrow_snapshot(ptr, out_len, out_array, |instance| {
            lock(&instance.isopleth_snapshot, "isopleth_snapshot")
        })
    }
}

/// Borrowed pointer to every isopleth vertex, indexed by each polygon's
/// `vertex_offset` and `vertex_count`.
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `out_len` and `out_array` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn plume_get_isopleth_vertices(
    ptr: *const PlumeInstance,
    out_len: *mut usize,
    out_array: *mut *const PlumeGeoPoint,
) -> PlumeErrorCode {
    unsafe {
        borrow_snapshot(ptr, out_len, out_array, |instance| {
            lock(&instance.vertex_snapshot, "vertex_snapshot")
        })
    }
}

/// Summary of the current sources, using the last field pass for the maximum.
///
/// # Safety
/// - `ptr` must be null or a live pointer from `plume_new`.
/// - `out_summary` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn plume_get_summary(
    ptr: *const PlumeInstance,
    out_summary: *mut PlumeSummary,
) -> PlumeErrorCode {
    handle_ffi_result(|| {
        if out_summary.is_null() {
            return Err(DefaultPlumeError::null_pointer("out_summary"));
        }
        let instance = instance_from_ptr(ptr)?;
        let sources = lock(&instance.sources, "sources")?.clone();
        let conditions = *lock(&instance.conditions, "conditions")?;
        let field = lock(&instance.last_field, "last_field")?;

        let summary = instance
            .calculator
            .summarize(&sources, &conditions, &field);
        unsafe {
            *out_summary = PlumeSummary::from(&summary);
        }
        Ok(())
    })
}

/// Drop all cached snapshots and release their memory.
///
/// # Safety
/// `ptr` must be null or a live pointer from `plume_new`.
#[no_mangle]
pub unsafe extern "C" fn plume_clear_snapshots(ptr: *const PlumeInstance) -> PlumeErrorCode {
    handle_ffi_result(|| {
        let instance = instance_from_ptr(ptr)?;
        let mut field = lock(&instance.field_snapshot, "field_snapshot")?;
        field.clear();
        field.shrink_to_fit();
        let mut headers = lock(&instance.isopleth_snapshot, "isopleth_snapshot")?;
        headers.clear();
        headers.shrink_to_fit();
        let mut vertices = lock(&instance.vertex_snapshot, "vertex_snapshot")?;
        vertices.clear();
        vertices.shrink_to_fit();
        *lock(&instance.last_field, "last_field")? = ConcentrationField::empty();
        Ok(())
    })
}
