//! Null-terminated UTF-8 strings.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::error::{GraalError, GraalResult, MarshalError};
use crate::marshal::NativeMarshal;

/// Allocate a NUL-terminated copy of `value`.
///
/// The buffer holds exactly the UTF-8 bytes plus the terminator and must be
/// freed with [`release_native`].
pub fn to_native(value: &str) -> GraalResult<*mut c_char> {
    CString::new(value).map(CString::into_raw).map_err(|e| {
        GraalError::invalid_argument(format!(
            "string contains a NUL byte at offset {}",
            e.nul_position()
        ))
    })
}

/// Like [`to_native`], with `None` mapped to null
pub fn to_native_opt(value: Option<&str>) -> GraalResult<*mut c_char> {
    value.map_or(Ok(std::ptr::null_mut()), to_native)
}

/// Copy a native string. Null and invalid UTF-8 are errors.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer.
pub unsafe fn from_native(ptr: *const c_char) -> GraalResult<String> {
    if ptr.is_null() {
        return Err(MarshalError::malformed("string", "null pointer").into());
    }
    // SAFETY: non-null and NUL-terminated per caller contract
    let bytes = unsafe { CStr::from_ptr(ptr) };
    bytes
        .to_str()
        .map(str::to_owned)
        .map_err(|e| MarshalError::malformed("string", e.to_string()).into())
}

/// Copy a native string; null maps to `None`.
///
/// # Safety
/// Same contract as [`from_native`].
pub unsafe fn from_native_opt(ptr: *const c_char) -> GraalResult<Option<String>> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: per caller contract
    unsafe { from_native(ptr) }.map(Some)
}

/// Copy a native string for diagnostics: null becomes "", invalid UTF-8 is
/// replaced.
///
/// # Safety
/// Same contract as [`from_native`].
pub(crate) unsafe fn from_native_lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    // SAFETY: per caller contract
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

/// Free a buffer produced by [`to_native`]. Null is a no-op.
///
/// # Safety
/// `ptr` must be null or come from [`to_native`], and is invalid afterwards.
pub unsafe fn release_native(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: ptr came from CString::into_raw
        drop(unsafe { CString::from_raw(ptr) });
    }
}

impl NativeMarshal for String {
    type Native = c_char;

    fn to_native(&self) -> GraalResult<*mut c_char> {
        to_native(self)
    }

    unsafe fn from_native(native: *const c_char) -> GraalResult<Self> {
        // SAFETY: per trait contract
        unsafe { from_native(native) }
    }

    unsafe fn release_native(native: *mut c_char) {
        // SAFETY: per trait contract
        unsafe { release_native(native) }
    }
}
