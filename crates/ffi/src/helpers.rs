use crate::error::{with_last_error_mut, DefaultPlumeError, PlumeError, PlumeErrorCode};
use crate::instance::PlumeInstance;
use std::ffi::CString;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl PlumeError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Record `error` and return its code.
#[inline]
pub(crate) fn track_error(error: &impl PlumeError) -> PlumeErrorCode {
    debug!("FFI call failed with {:?}: {}", error.code(), error.msg());
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Called on successful operations.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = PlumeErrorCode::Ok;
    });
}

/// Run `f`, recording its error or clearing the last error on success.
pub(crate) fn handle_ffi_result<F>(f: F) -> PlumeErrorCode
where
    F: FnOnce() -> Result<(), DefaultPlumeError>,
{
    match f() {
        Ok(()) => {
            clear_last_error();
            PlumeErrorCode::Ok
        }
        Err(error) => track_error(&error),
    }
}

/// Borrow the instance behind `ptr`, failing on null.
pub(crate) fn instance_from_ptr<'a>(
    ptr: *const PlumeInstance,
) -> Result<&'a PlumeInstance, DefaultPlumeError> {
    // SAFETY: callers pass a pointer from `plume_new` that has not been destroyed;
    // null is rejected here.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultPlumeError::null_pointer("ptr"))
}

/// Lock `mutex`, turning poisoning into an FFI error.
pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    name: &str,
) -> Result<MutexGuard<'a, T>, DefaultPlumeError> {
    mutex
        .lock()
        .map_err(|_| DefaultPlumeError::lock_poisoned(name))
}
