use plume_core::{
    AtmosphericConditions, CancellationToken, DispersionCalculator, DispersionConfig,
    ConcentrationField, EmissionSource, GridResolution,
};
use std::sync::Mutex;

use crate::error::{DefaultPlumeError, PlumeErrorCode};
use crate::helpers::{clear_last_error, track_error};
use crate::queries::{PlumeFieldPoint, PlumeGeoPoint, PlumeIsopleth};

/// One dispersion field with its own sources, conditions and busy flag.
///
/// # Thread Safety
/// Every piece of mutable state sits behind a `Mutex`, so the handle can be
/// shared between a UI thread and worker threads. Calculation passes hold only
/// the busy flag while they run: a second pass started meanwhile returns
/// `PlumeErrorCode::Busy`, and `plume_cancel` may be called from any thread.
///
/// Source and condition locks are released before the pass starts, so
/// editing the source list during a pass affects the next pass only.
pub struct PlumeInstance {
    pub(crate) calculator: DispersionCalculator,
    pub(crate) sources: Mutex<Vec<EmissionSource>>,
    pub(crate) conditions: Mutex<AtmosphericConditions>,
    pub(crate) cancel: CancellationToken,
    /// Last successful field pass, kept for the summary maximum
    pub(crate) last_field: Mutex<ConcentrationField>,
    /// Reused across `plume_calculate_field` calls
    pub(crate) field_snapshot: Mutex<Vec<PlumeFieldPoint>>,
    /// Reused across `plume_calculate_isopleths` calls
    pub(crate) isopleth_snapshot: Mutex<Vec<PlumeIsopleth>>,
    /// Vertices of every polygon in `isopleth_snapshot`, back to back
    pub(crate) vertex_snapshot: Mutex<Vec<PlumeGeoPoint>>,
}

impl PlumeInstance {
    pub(crate) fn new(config: DispersionConfig) -> Box<Self> {
        Box::new(Self {
            calculator: DispersionCalculator::new(config),
            sources: Mutex::new(Vec::new()),
            conditions: Mutex::new(AtmosphericConditions::default()),
            cancel: CancellationToken::new(),
            last_field: Mutex::new(ConcentrationField::empty()),
            field_snapshot: Mutex::new(Vec::new()),
            isopleth_snapshot: Mutex::new(Vec::new()),
            vertex_snapshot: Mutex::new(Vec::new()),
        })
    }
}

/// Grid resolution preset accepted by `plume_new`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlumeGridResolution {
    /// 35 m grid step
    Fine = 0,
    /// 70 m grid step
    Standard = 1,
    /// 140 m grid step
    Coarse = 2,
}

impl From<PlumeGridResolution> for GridResolution {
    fn from(value: PlumeGridResolution) -> Self {
        match value {
            PlumeGridResolution::Fine => GridResolution::Fine,
            PlumeGridResolution::Standard => GridResolution::Standard,
            PlumeGridResolution::Coarse => GridResolution::Coarse,
        }
    }
}

/// Creates a new plume instance with default settings at the given resolution.
///
/// Returns
/// - `PlumeErrorCode::Ok` with the new instance in `out_instance`
/// - `PlumeErrorCode::NullPointer` if `out_instance` is null
///
/// # Safety
/// - `out_instance` must be null or a valid pointer to write a `*mut PlumeInstance` to.
/// - The returned instance must be released with `plume_destroy`.
///
/// Example:
/// ```c
/// PlumeInstance* plume = NULL;
/// if (plume_new(Standard, &plume) != Ok) {
///     fprintf(stderr, "%s\n", plume_get_last_error());
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn plume_new(
    resolution: PlumeGridResolution,
    out_instance: *mut *mut PlumeInstance,
) -> PlumeErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultPlumeError::null_pointer("out_instance"));
    }

    let config = DispersionConfig::with_resolution(resolution.into());
    let instance = PlumeInstance::new(config);
    unsafe {
        *out_instance = Box::into_raw(instance);
    }
    clear_last_error();
    PlumeErrorCode::Ok
}

/// Destroys an instance created by `plume_new`. Null is a no-op.
///
/// Snapshot pointers handed out by the query functions dangle afterwards.
///
/// # Safety
/// - The pointer MUST have been created by `plume_new` and not destroyed already.
/// - No other thread may be using the instance.
#[no_mangle]
pub unsafe extern "C" fn plume_destroy(ptr: *mut PlumeInstance) {
    if ptr.is_null() {
        return;
    }

    // SAFETY: created by `Box::into_raw` in `plume_new`, not yet freed.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}
