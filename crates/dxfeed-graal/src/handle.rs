//! Owned references to objects in the isolate's Java heap.
//!
//! A [`JavaHandle`] owns exactly one handle returned by a native factory
//! call. The reference is dropped with `dxfg_JavaObjectHandler_release`
//! exactly once: release swaps the stored pointer to null, so a second
//! release (explicit or from `Drop`) observes "already released" and does
//! nothing.

use std::sync::atomic::{AtomicPtr, Ordering};

use dxfeed_graal_sys::{
    dxfg_endpoint_builder_t, dxfg_endpoint_t, dxfg_feed_event_listener_t, dxfg_feed_t,
    dxfg_java_object_handler, dxfg_publisher_t, dxfg_subscription_t,
};
use tracing::warn;

use crate::error::{GraalError, GraalResult};
use crate::isolate::IsolateThread;

/// Native record types that begin with a `dxfg_java_object_handler`.
///
/// # Safety
/// Implementors must be `#[repr(C)]` with the handler as their first field,
/// so a pointer to the record is also a pointer to its handler.
pub unsafe trait JavaObjectHandle {
    /// Name used in diagnostics
    const KIND: &'static str;
}

macro_rules! java_object_handles {
    ($($ty:ty => $kind:literal),* $(,)?) => {
        $(
            // SAFETY: generated by java_object_types! with `handler` as the only field
            unsafe impl JavaObjectHandle for $ty {
                const KIND: &'static str = $kind;
            }
        )*
    };
}

java_object_handles! {
    dxfg_endpoint_builder_t => "DXEndpoint.Builder",
    dxfg_endpoint_t => "DXEndpoint",
    dxfg_feed_t => "DXFeed",
    dxfg_publisher_t => "DXPublisher",
    dxfg_subscription_t => "DXFeedSubscription",
    dxfg_feed_event_listener_t => "DXFeedEventListener",
}

/// Exclusive owner of one Java object handle.
pub struct JavaHandle<T: JavaObjectHandle> {
    ptr: AtomicPtr<T>,
}

// SAFETY: Java object handles are global references usable from any thread
// attached to the isolate; the pointer itself is only swapped atomically.
unsafe impl<T: JavaObjectHandle> Send for JavaHandle<T> {}
unsafe impl<T: JavaObjectHandle> Sync for JavaHandle<T> {}

impl<T: JavaObjectHandle> JavaHandle<T> {
    /// Take ownership of the result of a native factory call.
    ///
    /// A null result is a failure and raises the thread's pending exception.
    pub fn from_raw(thread: IsolateThread, ptr: *mut T, operation: &'static str) -> GraalResult<Self> {
        let ptr = thread.check_ptr(ptr, operation)?;
        Ok(Self {
            ptr: AtomicPtr::new(ptr),
        })
    }

    /// Get the live pointer, failing if the handle was released
    pub fn get(&self) -> GraalResult<*mut T> {
        let ptr = self.as_ptr();
        if ptr.is_null() {
            return Err(GraalError::invalid_argument(format!(
                "{} handle is already released",
                T::KIND
            )));
        }
        Ok(ptr)
    }

    /// Get the raw pointer; null once released
    pub fn as_ptr(&self) -> *mut T {
        self.ptr.load(Ordering::Acquire)
    }

    /// Check whether the handle has been released
    pub fn is_released(&self) -> bool {
        self.as_ptr().is_null()
    }

    /// Drop the reference held by this handle.
    ///
    /// Idempotent: only the first call reaches the native side.
    pub fn release(&self) -> GraalResult<()> {
        if self.is_released() {
            return Ok(());
        }
        // Attach before taking the pointer so a failed attach leaves the handle intact
        let thread = IsolateThread::current()?;
        let ptr = self.ptr.swap(std::ptr::null_mut(), Ordering::AcqRel);
        if ptr.is_null() {
            return Ok(());
        }
        // SAFETY: ptr is a live handle owned by us; the handler is its first field
        let code = unsafe {
            (thread.api().dxfg_JavaObjectHandler_release)(
                thread.raw(),
                ptr.cast::<dxfg_java_object_handler>(),
            )
        };
        thread.check_code(code, "dxfg_JavaObjectHandler_release")?;
        Ok(())
    }
}

impl<T: JavaObjectHandle> Drop for JavaHandle<T> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(kind = T::KIND, error = %e, "Failed to release Java object handle");
        }
    }
}

impl<T: JavaObjectHandle> std::fmt::Debug for JavaHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JavaHandle")
            .field("kind", &T::KIND)
            .field("ptr", &self.as_ptr())
            .finish()
    }
}
