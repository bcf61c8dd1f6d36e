//! Fetch-and-raise of pending Java exceptions.
//!
//! Every native call follows the same machine: invoke, check the failure
//! sentinel, and on failure fetch and clear the thread's pending exception
//! record before raising it. A failure sentinel without a pending exception
//! is still an error.

use std::os::raw::c_int;

use dxfeed_graal_sys::{DxfgApi, dxfg_exception_t, graal_isolatethread_t};
use scopeguard::guard;

use crate::error::{GraalError, GraalResult, JavaException};
use crate::marshal::string;

const MAX_CAUSE_DEPTH: usize = 16;

/// Fetch and clear the pending exception of `thread`, if any.
///
/// # Safety
/// `thread` must be attached to the isolate `api` belongs to.
pub(crate) unsafe fn take_pending(
    api: &DxfgApi,
    thread: *mut graal_isolatethread_t,
) -> Option<JavaException> {
    // SAFETY: thread is attached per caller contract
    let raw = unsafe { (api.dxfg_get_and_clear_thread_exception_t)(thread) };
    if raw.is_null() {
        return None;
    }

    // The record is native-owned and released on every path
    let raw = guard(raw, |raw| {
        // SAFETY: raw came from dxfg_get_and_clear_thread_exception_t on this thread
        unsafe { (api.dxfg_Exception_release)(thread, raw) }
    });

    // SAFETY: non-null record produced by the native side
    Some(unsafe { JavaException::from_native(*raw, 0) })
}

/// Build the error for a failed call on `thread`.
///
/// # Safety
/// `thread` must be attached to the isolate `api` belongs to.
pub(crate) unsafe fn failure(
    api: &DxfgApi,
    thread: *mut graal_isolatethread_t,
    operation: &'static str,
) -> GraalError {
    // SAFETY: per caller contract
    match unsafe { take_pending(api, thread) } {
        Some(exception) => {
            tracing::debug!(operation, class = %exception.class_name, "native call raised");
            GraalError::Java(exception)
        }
        None => GraalError::NativeCallFailed { operation },
    }
}

/// Check an integer status; negative values are failures.
///
/// # Safety
/// `thread` must be attached to the isolate `api` belongs to.
pub(crate) unsafe fn check_code(
    api: &DxfgApi,
    thread: *mut graal_isolatethread_t,
    code: c_int,
    operation: &'static str,
) -> GraalResult<c_int> {
    if code < 0 {
        // SAFETY: per caller contract
        Err(unsafe { failure(api, thread, operation) })
    } else {
        Ok(code)
    }
}

/// Check a pointer result; null is a failure.
///
/// # Safety
/// `thread` must be attached to the isolate `api` belongs to.
pub(crate) unsafe fn check_ptr<T>(
    api: &DxfgApi,
    thread: *mut graal_isolatethread_t,
    ptr: *mut T,
    operation: &'static str,
) -> GraalResult<*mut T> {
    if ptr.is_null() {
        // SAFETY: per caller contract
        Err(unsafe { failure(api, thread, operation) })
    } else {
        Ok(ptr)
    }
}

impl JavaException {
    /// Copy a native exception record, including its cause chain.
    ///
    /// Absent fields become empty strings; the strings are copied verbatim.
    ///
    /// # Safety
    /// `raw` must point to a valid exception record.
    unsafe fn from_native(raw: *const dxfg_exception_t, depth: usize) -> Self {
        // SAFETY: per caller contract
        let record = unsafe { &*raw };
        let cause = if record.cause.is_null() || depth >= MAX_CAUSE_DEPTH {
            None
        } else {
            // SAFETY: cause records are owned by the outer record
            Some(Box::new(unsafe { Self::from_native(record.cause, depth + 1) }))
        };

        // SAFETY: string fields are null or NUL-terminated
        unsafe {
            Self {
                class_name: string::from_native_lossy(record.class_name),
                message: string::from_native_lossy(record.message),
                stack_trace: string::from_native_lossy(record.print_stack_trace),
                cause,
            }
        }
    }
}
