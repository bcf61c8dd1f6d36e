//! Feed subscriptions.

use std::sync::Arc;

use dxfeed_graal_sys::{dxfg_subscription_t, dxfg_symbol_list};
use parking_lot::Mutex;
use scopeguard::guard;
use tracing::{debug, warn};

use crate::error::GraalResult;
use crate::events::{EventKind, MarketEvent};
use crate::handle::JavaHandle;
use crate::isolate::IsolateThread;
use crate::listener::{ListenerBinding, ListenerToken};
use crate::marshal::{NativeBox, Symbol, list};

/// A set of symbols subscribed for a fixed set of event kinds.
///
/// At most one event listener is attached at a time. Setting a listener
/// replaces the previous one; once replaced, the previous closure is never
/// invoked again.
pub struct Subscription {
    handle: JavaHandle<dxfg_subscription_t>,
    kinds: Vec<EventKind>,
    listener: Mutex<Option<ListenerBinding>>,
}

impl Subscription {
    pub(crate) fn new(handle: JavaHandle<dxfg_subscription_t>, kinds: Vec<EventKind>) -> Self {
        Self {
            handle,
            kinds,
            listener: Mutex::new(None),
        }
    }

    /// Event kinds this subscription was created for
    pub fn event_kinds(&self) -> &[EventKind] {
        &self.kinds
    }

    pub fn add_symbol(&self, symbol: &Symbol) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        let native = NativeBox::new(symbol)?;
        // SAFETY: handle is live; the symbol outlives the call
        let code = unsafe {
            (thread.api().dxfg_DXFeedSubscription_addSymbol)(thread.raw(), self.handle.get()?, native.as_ptr())
        };
        thread.check_code(code, "dxfg_DXFeedSubscription_addSymbol")?;
        Ok(())
    }

    pub fn add_symbols(&self, symbols: &[Symbol]) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        // SAFETY: list::to_native produced the list for Symbol
        let native = unsafe { NativeBox::<Vec<Symbol>>::from_raw(list::to_native(symbols)?) };
        // SAFETY: handle is live; the list outlives the call
        let code = unsafe {
            (thread.api().dxfg_DXFeedSubscription_addSymbols)(
                thread.raw(),
                self.handle.get()?,
                native.as_ptr(),
            )
        };
        thread.check_code(code, "dxfg_DXFeedSubscription_addSymbols")?;
        Ok(())
    }

    pub fn remove_symbol(&self, symbol: &Symbol) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        let native = NativeBox::new(symbol)?;
        // SAFETY: handle is live; the symbol outlives the call
        let code = unsafe {
            (thread.api().dxfg_DXFeedSubscription_removeSymbol)(
                thread.raw(),
                self.handle.get()?,
                native.as_ptr(),
            )
        };
        thread.check_code(code, "dxfg_DXFeedSubscription_removeSymbol")?;
        Ok(())
    }

    /// Remove every symbol
    pub fn clear(&self) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        // SAFETY: handle is live
        let code =
            unsafe { (thread.api().dxfg_DXFeedSubscription_clear)(thread.raw(), self.handle.get()?) };
        thread.check_code(code, "dxfg_DXFeedSubscription_clear")?;
        Ok(())
    }

    /// Currently subscribed symbols
    pub fn symbols(&self) -> GraalResult<Vec<Symbol>> {
        let thread = IsolateThread::current()?;
        // SAFETY: handle is live
        let raw = unsafe {
            (thread.api().dxfg_DXFeedSubscription_getSymbols)(thread.raw(), self.handle.get()?)
        };
        let raw = thread.check_ptr(raw, "dxfg_DXFeedSubscription_getSymbols")?;

        // The list is native-allocated and goes back through the native releaser
        let raw = guard(raw, |raw: *mut dxfg_symbol_list| {
            // SAFETY: raw came from getSymbols and is released once
            let code = unsafe { (thread.api().dxfg_CList_symbol_release)(thread.raw(), raw) };
            if let Err(e) = thread.check_code(code, "dxfg_CList_symbol_release") {
                warn!(error = %e, "Failed to release symbol list");
            }
        });

        // SAFETY: valid native list of symbols
        unsafe { list::from_native::<Symbol>(*raw) }
    }

    /// Attach `listener`, replacing any previous one.
    ///
    /// The previous listener is removed from the native subscription, its
    /// handle released and its token invalidated before the new one is
    /// registered.
    pub fn set_event_listener<F>(&self, listener: F) -> GraalResult<ListenerToken>
    where
        F: Fn(&[MarketEvent]) + Send + Sync + 'static,
    {
        let thread = IsolateThread::current()?;
        let subscription = self.handle.get()?;
        let mut slot = self.listener.lock();

        if let Some(previous) = slot.take() {
            debug!(token = ?previous.token(), "Replacing event listener");
            self.detach(thread, previous)?;
        }

        let binding = ListenerBinding::create(thread, Arc::new(listener))?;
        // SAFETY: both handles are live
        let code = unsafe {
            (thread.api().dxfg_DXFeedSubscription_addEventListener)(
                thread.raw(),
                subscription,
                binding.as_ptr(),
            )
        };
        thread.check_code(code, "dxfg_DXFeedSubscription_addEventListener")?;

        let token = binding.token();
        *slot = Some(binding);
        Ok(token)
    }

    /// Remove the current listener, if any
    pub fn clear_event_listener(&self) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        let mut slot = self.listener.lock();
        match slot.take() {
            Some(previous) => self.detach(thread, previous),
            None => Ok(()),
        }
    }

    /// Token of the current listener
    pub fn listener_token(&self) -> Option<ListenerToken> {
        self.listener.lock().as_ref().map(ListenerBinding::token)
    }

    /// Close the subscription and release it.
    ///
    /// The listener is detached first; a failure there is logged and the
    /// subscription itself is still closed.
    pub fn close(&self) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        if self.handle.is_released() {
            return Ok(());
        }
        if let Some(previous) = self.listener.lock().take() {
            if let Err(e) = self.detach(thread, previous) {
                warn!(error = %e, "Failed to detach listener while closing subscription");
            }
        }

        // SAFETY: handle is live
        let code =
            unsafe { (thread.api().dxfg_DXFeedSubscription_close)(thread.raw(), self.handle.get()?) };
        let closed = thread.check_code(code, "dxfg_DXFeedSubscription_close").map(|_| ());
        let released = self.handle.release();
        closed.and(released)
    }

    /// Raw handle; null once closed
    pub fn raw(&self) -> *mut dxfg_subscription_t {
        self.handle.as_ptr()
    }

    /// Stop native delivery to `binding`, then drop it, which releases its
    /// handle and invalidates its token.
    fn detach(&self, thread: IsolateThread, binding: ListenerBinding) -> GraalResult<()> {
        let subscription = self.handle.as_ptr();
        if subscription.is_null() {
            return Ok(());
        }
        // SAFETY: both handles are live
        let code = unsafe {
            (thread.api().dxfg_DXFeedSubscription_removeEventListener)(
                thread.raw(),
                subscription,
                binding.as_ptr(),
            )
        };
        let removed = thread.check_code(code, "dxfg_DXFeedSubscription_removeEventListener");
        drop(binding);
        removed.map(|_| ())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // The listener is a child of the subscription and goes first
        if let Some(binding) = self.listener.get_mut().take() {
            match IsolateThread::current() {
                Ok(thread) => {
                    if let Err(e) = self.detach(thread, binding) {
                        warn!(error = %e, "Failed to detach listener");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Dropping listener without an attached thread");
                    drop(binding);
                }
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("handle", &self.handle)
            .field("kinds", &self.kinds)
            .field("listener", &self.listener_token())
            .finish()
    }
}
