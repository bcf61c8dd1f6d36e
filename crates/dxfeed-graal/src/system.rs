//! Access to the runtime's system property store.
//!
//! Properties read at endpoint creation (`dxfeed.address`,
//! `dxscheme.nanoTime`, ...) are usually set through [`RuntimeConfig`]
//! before the isolate exists; these functions change them afterwards.
//!
//! [`RuntimeConfig`]: crate::config::RuntimeConfig

use std::ffi::CString;

use scopeguard::guard;
use tracing::warn;

use crate::error::{GraalError, GraalResult};
use crate::isolate::{self, IsolateThread};
use crate::marshal::string;

/// Set a system property
pub fn set_property(key: &str, value: &str) -> GraalResult<()> {
    let thread = IsolateThread::current()?;
    // SAFETY: thread is attached on this thread
    unsafe { isolate::push_property(thread.api(), thread.raw(), key, value) }
}

/// Get a system property; `None` if it is not set
pub fn get_property(key: &str) -> GraalResult<Option<String>> {
    let thread = IsolateThread::current()?;
    let key = CString::new(key).map_err(|_| GraalError::invalid_argument("property key contains NUL"))?;

    // SAFETY: key outlives the call
    let raw = unsafe { (thread.api().dxfg_system_get_property)(thread.raw(), key.as_ptr()) };
    if raw.is_null() {
        return match thread.take_pending_exception() {
            Some(exception) => Err(exception.into()),
            None => Ok(None),
        };
    }

    let raw = guard(raw, |raw| {
        // SAFETY: the value was returned by dxfg_system_get_property
        let code = unsafe { (thread.api().dxfg_system_release_property)(thread.raw(), raw) };
        if let Err(e) = thread.check_code(code, "dxfg_system_release_property") {
            warn!(error = %e, "Failed to release property value");
        }
    });

    // SAFETY: non-null NUL-terminated string
    unsafe { string::from_native(*raw) }.map(Some)
}
