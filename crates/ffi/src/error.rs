use plume_core::DispersionError;
use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for errors that cross the FFI boundary.
///
/// - `code()` is what the C caller receives as the return value
/// - `msg()` is stored per thread for `plume_get_last_error`
pub(crate) trait PlumeError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> PlumeErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Error code plus message for the common FFI failure cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultPlumeError {
    code: PlumeErrorCode,
    msg: String,
}

impl DefaultPlumeError {
    /// Null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: PlumeErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// A lock was poisoned by a panic on another thread.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: PlumeErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Out-of-range or non-finite argument.
    ///
    /// # Arguments
    /// * `param_name` - The offending parameter (e.g., `"wind_speed"`, `"mode"`)
    /// * `message` - What was wrong with it
    pub fn invalid_parameter(param_name: &str, message: &str) -> Self {
        Self {
            code: PlumeErrorCode::InvalidParameter,
            msg: format!("Parameter {param_name}: {message}"),
        }
    }
}

impl From<&DispersionError> for DefaultPlumeError {
    fn from(error: &DispersionError) -> Self {
        let code = match error {
            DispersionError::Busy => PlumeErrorCode::Busy,
            DispersionError::Cancelled { .. } => PlumeErrorCode::Cancelled,
            DispersionError::InvalidConfig(_) => PlumeErrorCode::InvalidConfig,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl PlumeError for DefaultPlumeError {
    fn code(&self) -> PlumeErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by plume functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlumeErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter passed to function.
    InvalidParameter = 3,

    /// Another calculation pass is running on this instance.
    Busy = 4,

    /// The pass was cancelled through `plume_cancel`.
    Cancelled = 5,

    /// The instance configuration failed validation.
    InvalidConfig = 6,
}

impl From<DefaultPlumeError> for PlumeErrorCode {
    fn from(error: DefaultPlumeError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error on this thread (message, code).
    /// The CString lives here so the pointer handed to C stays valid.
    static LAST_ERROR: RefCell<(Option<CString>, PlumeErrorCode)> = const { RefCell::new((None, PlumeErrorCode::Ok)) };
}

pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, PlumeErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, PlumeErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns:
/// - A borrowed pointer to the error message if an error occurred.
/// - `null` if the last call on this thread succeeded.
///
/// The pointer is valid until the next FFI call on this thread.
/// **DO NOT FREE THIS POINTER** - it is managed internally.
///
/// Example:
/// ```c
/// PlumeErrorCode err = plume_calculate_field(plume, &len, &points);
/// if (err != Ok) {
///     const char* msg = plume_get_last_error();
///     if (msg) {
///         fprintf(stderr, "field pass failed: %s\n", msg);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn plume_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code on this thread (`Ok` after a success).
#[no_mangle]
pub extern "C" fn plume_get_last_error_code() -> PlumeErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
