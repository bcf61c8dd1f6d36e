//! Routing of native listener callbacks to Rust closures.
//!
//! Native code never sees a Rust pointer. It stores an opaque token and
//! passes it back with every invocation; the token is resolved through a
//! process-wide registry. Removing a listener invalidates its token, so a
//! callback that is already in flight when the listener is torn down
//! resolves to nothing and returns without touching freed state.

use std::collections::HashMap;
use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use dxfeed_graal_sys::{dxfg_event_type_list, dxfg_feed_event_listener_t, graal_isolatethread_t};
use parking_lot::Mutex;
use tracing::{error, trace, warn};

use crate::error::GraalResult;
use crate::events::{self, MarketEvent};
use crate::handle::JavaHandle;
use crate::isolate::IsolateThread;

/// Closure invoked with each batch of events
pub type EventCallback = dyn Fn(&[MarketEvent]) + Send + Sync + 'static;

/// Opaque token identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(NonZeroUsize);

impl ListenerToken {
    /// Value handed to native code as `user_data`
    pub fn as_user_data(self) -> *mut c_void {
        self.0.get() as *mut c_void
    }

    /// Recover a token from `user_data`; null is not a token
    pub fn from_user_data(user_data: *mut c_void) -> Option<Self> {
        NonZeroUsize::new(user_data as usize).map(Self)
    }
}

/// Registry of live listener closures.
pub struct ListenerRegistry {
    next: AtomicUsize,
    listeners: Mutex<HashMap<ListenerToken, Arc<EventCallback>>>,
}

static REGISTRY: LazyLock<ListenerRegistry> = LazyLock::new(ListenerRegistry::new);

impl ListenerRegistry {
    fn new() -> Self {
        Self {
            next: AtomicUsize::new(1),
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static ListenerRegistry {
        &REGISTRY
    }

    /// Register a closure under a fresh token. Tokens are never reused.
    pub fn register(&self, callback: Arc<EventCallback>) -> ListenerToken {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let token = ListenerToken(NonZeroUsize::new(id).unwrap_or(NonZeroUsize::MIN));
        self.listeners.lock().insert(token, callback);
        token
    }

    /// Resolve a token; `None` once it has been invalidated
    pub fn resolve(&self, token: ListenerToken) -> Option<Arc<EventCallback>> {
        self.listeners.lock().get(&token).cloned()
    }

    /// Invalidate a token. Invalidating an unknown token is a no-op.
    pub fn invalidate(&self, token: ListenerToken) -> bool {
        let removed = self.listeners.lock().remove(&token).is_some();
        if !removed {
            trace!(?token, "Listener token was not registered");
        }
        removed
    }

    /// Check whether a token still resolves
    pub fn is_registered(&self, token: ListenerToken) -> bool {
        self.listeners.lock().contains_key(&token)
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Entry point registered with `dxfg_DXFeedEventListener_new`.
///
/// Runs on a native dispatch thread. The event list is owned by the native
/// side for the duration of the call and is not released here. Panics from
/// the closure are caught and logged.
///
/// # Safety
/// Called by the native runtime with an attached thread, a valid event list
/// and the `user_data` supplied at listener creation.
pub unsafe extern "C" fn event_listener_trampoline(
    thread: *mut graal_isolatethread_t,
    event_list: *mut dxfg_event_type_list,
    user_data: *mut c_void,
) {
    let result = catch_unwind(AssertUnwindSafe(|| {
        let Some(token) = ListenerToken::from_user_data(user_data) else {
            return;
        };
        let Some(callback) = ListenerRegistry::global().resolve(token) else {
            trace!(?token, "Dropping events for a removed listener");
            return;
        };

        IsolateThread::adopt(thread);

        // SAFETY: the list is valid for the duration of the callback
        let batch = unsafe { events::from_native_list_partial(event_list) };
        if let Some(e) = &batch.error {
            warn!(
                ?token,
                converted = batch.converted.len(),
                error = %e,
                "Failed to convert event batch"
            );
        }
        if batch.converted.is_empty() {
            return;
        }

        trace!(?token, count = batch.converted.len(), "Dispatching events");
        callback(&batch.converted);
    }));

    if result.is_err() {
        error!("Event listener panicked; panic was contained at the native boundary");
    }
}

/// A native listener object plus the token it was created with.
///
/// Dropping the binding releases the native listener handle and then
/// invalidates the token.
pub(crate) struct ListenerBinding {
    handle: JavaHandle<dxfg_feed_event_listener_t>,
    token: ListenerToken,
}

impl ListenerBinding {
    /// Register `callback` and create the native listener that routes to it.
    pub(crate) fn create(thread: IsolateThread, callback: Arc<EventCallback>) -> GraalResult<Self> {
        let registry = ListenerRegistry::global();
        let token = registry.register(callback);

        // SAFETY: the trampoline matches dxfg_feed_event_listener_function
        let raw = unsafe {
            (thread.api().dxfg_DXFeedEventListener_new)(
                thread.raw(),
                Some(event_listener_trampoline),
                token.as_user_data(),
            )
        };

        match JavaHandle::from_raw(thread, raw, "dxfg_DXFeedEventListener_new") {
            Ok(handle) => Ok(Self { handle, token }),
            Err(e) => {
                registry.invalidate(token);
                Err(e)
            }
        }
    }

    pub(crate) fn token(&self) -> ListenerToken {
        self.token
    }

    pub(crate) fn as_ptr(&self) -> *mut dxfg_feed_event_listener_t {
        self.handle.as_ptr()
    }
}

impl Drop for ListenerBinding {
    fn drop(&mut self) {
        if let Err(e) = self.handle.release() {
            warn!(token = ?self.token, error = %e, "Failed to release listener handle");
        }
        ListenerRegistry::global().invalidate(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Quote;
    use crate::marshal::NativeBox;
    use std::ptr;

    fn counting(counter: Arc<AtomicUsize>) -> Arc<EventCallback> {
        Arc::new(move |events: &[MarketEvent]| {
            counter.fetch_add(events.len(), Ordering::SeqCst);
        })
    }

    fn quotes(n: usize) -> Vec<MarketEvent> {
        (0..n)
            .map(|i| {
                MarketEvent::from(Quote {
                    event_symbol: format!("SYM{}", i),
                    ..Default::default()
                })
            })
            .collect()
    }

    #[test]
    fn test_token_user_data_round_trip() {
        let token = ListenerToken(NonZeroUsize::new(77).unwrap());
        assert_eq!(ListenerToken::from_user_data(token.as_user_data()), Some(token));
        assert_eq!(ListenerToken::from_user_data(ptr::null_mut()), None);
    }

    #[test]
    fn test_registry_invalidation() {
        let registry = ListenerRegistry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let first = registry.register(counting(counter.clone()));
        let second = registry.register(counting(counter));
        assert_ne!(first, second);

        assert!(registry.resolve(first).is_some());
        assert!(registry.invalidate(first));
        assert!(registry.resolve(first).is_none());
        assert!(!registry.invalidate(first));
        assert!(registry.is_registered(second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_trampoline_dispatches_to_live_token() {
        let counter = Arc::new(AtomicUsize::new(0));
        let token = ListenerRegistry::global().register(counting(counter.clone()));
        let list = NativeBox::new(&quotes(2)).unwrap();

        unsafe { event_listener_trampoline(ptr::null_mut(), list.as_ptr(), token.as_user_data()) };
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        ListenerRegistry::global().invalidate(token);
        unsafe { event_listener_trampoline(ptr::null_mut(), list.as_ptr(), token.as_user_data()) };
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_trampoline_ignores_null_user_data() {
        let list = NativeBox::new(&quotes(1)).unwrap();
        unsafe { event_listener_trampoline(ptr::null_mut(), list.as_ptr(), ptr::null_mut()) };
    }

    fn explode(_: &[MarketEvent]) {
        panic!("listener failure")
    }

    #[test]
    fn test_trampoline_contains_panics() {
        let token = ListenerRegistry::global().register(Arc::new(explode));
        let list = NativeBox::new(&quotes(1)).unwrap();

        unsafe { event_listener_trampoline(ptr::null_mut(), list.as_ptr(), token.as_user_data()) };
        ListenerRegistry::global().invalidate(token);
    }
}
