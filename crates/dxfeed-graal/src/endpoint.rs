//! Endpoints and the feed and publisher they expose.

use std::collections::BTreeMap;
use std::ffi::CString;

use dxfeed_graal_sys::*;
use scopeguard::guard;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GraalError, GraalResult, MarshalError};
use crate::events::{EventKind, MarketEvent};
use crate::handle::JavaHandle;
use crate::isolate::IsolateThread;
use crate::marshal::{NativeBox, NativeMarshal, Symbol, list};
use crate::subscription::Subscription;

/// Role of an endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Feed,
    OnDemandFeed,
    StreamFeed,
    Publisher,
    StreamPublisher,
    LocalHub,
}

impl Role {
    pub fn code(self) -> dxfg_endpoint_role_t {
        match self {
            Self::Feed => DXFG_ENDPOINT_ROLE_FEED,
            Self::OnDemandFeed => DXFG_ENDPOINT_ROLE_ON_DEMAND_FEED,
            Self::StreamFeed => DXFG_ENDPOINT_ROLE_STREAM_FEED,
            Self::Publisher => DXFG_ENDPOINT_ROLE_PUBLISHER,
            Self::StreamPublisher => DXFG_ENDPOINT_ROLE_STREAM_PUBLISHER,
            Self::LocalHub => DXFG_ENDPOINT_ROLE_LOCAL_HUB,
        }
    }
}

/// Connection state of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointState {
    NotConnected,
    Connecting,
    Connected,
    Closed,
}

impl EndpointState {
    pub fn from_code(code: dxfg_endpoint_state_t) -> GraalResult<Self> {
        match code {
            DXFG_ENDPOINT_STATE_NOT_CONNECTED => Ok(Self::NotConnected),
            DXFG_ENDPOINT_STATE_CONNECTING => Ok(Self::Connecting),
            DXFG_ENDPOINT_STATE_CONNECTED => Ok(Self::Connected),
            DXFG_ENDPOINT_STATE_CLOSED => Ok(Self::Closed),
            value => Err(MarshalError::UnknownVariant {
                kind: "endpoint state",
                value,
            }
            .into()),
        }
    }
}

/// Builder for [`Endpoint`]
#[derive(Debug, Clone, Default)]
pub struct EndpointBuilder {
    role: Role,
    properties: BTreeMap<String, String>,
}

impl EndpointBuilder {
    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Set an endpoint property such as `dxfeed.address`
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Create the endpoint. The native builder is released on every path.
    pub fn build(self) -> GraalResult<Endpoint> {
        let thread = IsolateThread::current()?;
        let api = thread.api();

        // SAFETY: thread is attached
        let raw = unsafe { (api.dxfg_DXEndpoint_newBuilder)(thread.raw()) };
        let builder = JavaHandle::from_raw(thread, raw, "dxfg_DXEndpoint_newBuilder")?;

        // SAFETY: builder is live
        let code =
            unsafe { (api.dxfg_DXEndpoint_Builder_withRole)(thread.raw(), builder.get()?, self.role.code()) };
        thread.check_code(code, "dxfg_DXEndpoint_Builder_withRole")?;

        for (key, value) in &self.properties {
            let key = c_string(key)?;
            let value = c_string(value)?;
            // SAFETY: builder is live; strings outlive the call
            let code = unsafe {
                (api.dxfg_DXEndpoint_Builder_withProperty)(
                    thread.raw(),
                    builder.get()?,
                    key.as_ptr(),
                    value.as_ptr(),
                )
            };
            thread.check_code(code, "dxfg_DXEndpoint_Builder_withProperty")?;
        }

        // SAFETY: builder is live
        let raw = unsafe { (api.dxfg_DXEndpoint_Builder_build)(thread.raw(), builder.get()?) };
        let handle = JavaHandle::from_raw(thread, raw, "dxfg_DXEndpoint_Builder_build")?;
        debug!(role = ?self.role, "Endpoint created");

        Ok(Endpoint {
            handle,
            role: self.role,
        })
    }
}

/// Connection to a data source or sink.
#[derive(Debug)]
pub struct Endpoint {
    handle: JavaHandle<dxfg_endpoint_t>,
    role: Role,
}

impl Endpoint {
    pub fn builder() -> EndpointBuilder {
        EndpointBuilder::default()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Connect to `address`, e.g. `demo.dxfeed.com:7300`
    pub fn connect(&self, address: &str) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        let address = c_string(address)?;
        // SAFETY: handle is live; address outlives the call
        let code = unsafe {
            (thread.api().dxfg_DXEndpoint_connect)(thread.raw(), self.handle.get()?, address.as_ptr())
        };
        thread.check_code(code, "dxfg_DXEndpoint_connect")?;
        Ok(())
    }

    pub fn disconnect(&self) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        // SAFETY: handle is live
        let code = unsafe { (thread.api().dxfg_DXEndpoint_disconnect)(thread.raw(), self.handle.get()?) };
        thread.check_code(code, "dxfg_DXEndpoint_disconnect")?;
        Ok(())
    }

    /// Close the endpoint and release it. Closing twice is a no-op.
    pub fn close(&self) -> GraalResult<()> {
        if self.handle.is_released() {
            return Ok(());
        }
        let thread = IsolateThread::current()?;
        // SAFETY: handle is live
        let code = unsafe { (thread.api().dxfg_DXEndpoint_close)(thread.raw(), self.handle.get()?) };
        let closed = thread.check_code(code, "dxfg_DXEndpoint_close").map(|_| ());
        closed.and(self.handle.release())
    }

    pub fn state(&self) -> GraalResult<EndpointState> {
        let thread = IsolateThread::current()?;
        // SAFETY: handle is live
        let code = unsafe { (thread.api().dxfg_DXEndpoint_getState)(thread.raw(), self.handle.get()?) };
        EndpointState::from_code(thread.check_code(code, "dxfg_DXEndpoint_getState")?)
    }

    pub fn feed(&self) -> GraalResult<Feed> {
        let thread = IsolateThread::current()?;
        // SAFETY: handle is live
        let raw = unsafe { (thread.api().dxfg_DXEndpoint_getFeed)(thread.raw(), self.handle.get()?) };
        Ok(Feed {
            handle: JavaHandle::from_raw(thread, raw, "dxfg_DXEndpoint_getFeed")?,
        })
    }

    pub fn publisher(&self) -> GraalResult<Publisher> {
        let thread = IsolateThread::current()?;
        // SAFETY: handle is live
        let raw = unsafe { (thread.api().dxfg_DXEndpoint_getPublisher)(thread.raw(), self.handle.get()?) };
        Ok(Publisher {
            handle: JavaHandle::from_raw(thread, raw, "dxfg_DXEndpoint_getPublisher")?,
        })
    }
}

/// Subscription factory of an endpoint.
#[derive(Debug)]
pub struct Feed {
    handle: JavaHandle<dxfg_feed_t>,
}

impl Feed {
    /// Create a subscription for `kinds`.
    ///
    /// Every kind must have a native record mapping; others are rejected
    /// before any native call.
    pub fn create_subscription(&self, kinds: &[EventKind]) -> GraalResult<Subscription> {
        if kinds.is_empty() {
            return Err(GraalError::invalid_argument("at least one event type is required"));
        }
        let thread = IsolateThread::current()?;
        // SAFETY: list::to_native produced the list for EventKind
        let native = unsafe { NativeBox::<Vec<EventKind>>::from_raw(list::to_native(kinds)?) };
        // SAFETY: handle is live; the list outlives the call
        let raw = unsafe {
            (thread.api().dxfg_DXFeed_createSubscription2)(thread.raw(), self.handle.get()?, native.as_ptr())
        };
        let handle = JavaHandle::from_raw(thread, raw, "dxfg_DXFeed_createSubscription2")?;
        debug!(?kinds, "Subscription created");
        Ok(Subscription::new(handle, kinds.to_vec()))
    }

    /// Last event of `kind` for `symbol`, if the symbol is subscribed and an
    /// event has arrived. A null result without a pending exception is
    /// `Ok(None)`.
    pub fn last_event_if_subscribed(
        &self,
        kind: EventKind,
        symbol: &Symbol,
    ) -> GraalResult<Option<MarketEvent>> {
        if !kind.is_supported() {
            return Err(GraalError::invalid_argument(format!(
                "event type {} has no native record mapping",
                kind
            )));
        }
        let thread = IsolateThread::current()?;
        let native_symbol = NativeBox::new(symbol)?;
        // SAFETY: handle is live; the symbol outlives the call
        let raw = unsafe {
            (thread.api().dxfg_DXFeed_getLastEventIfSubscribed)(
                thread.raw(),
                self.handle.get()?,
                kind.code(),
                native_symbol.as_ptr(),
            )
        };

        if raw.is_null() {
            return match thread.take_pending_exception() {
                Some(exception) => Err(exception.into()),
                None => Ok(None),
            };
        }

        let raw = guard(raw, |raw| {
            // SAFETY: native-allocated event released once
            let code = unsafe { (thread.api().dxfg_EventType_release)(thread.raw(), raw) };
            if let Err(e) = thread.check_code(code, "dxfg_EventType_release") {
                warn!(error = %e, "Failed to release event");
            }
        });
        // SAFETY: valid native event record
        unsafe { MarketEvent::from_native(*raw) }.map(Some)
    }
}

/// Event sink of an endpoint.
#[derive(Debug)]
pub struct Publisher {
    handle: JavaHandle<dxfg_publisher_t>,
}

impl Publisher {
    /// Publish `events` in order
    pub fn publish_events(&self, events: &[MarketEvent]) -> GraalResult<()> {
        let thread = IsolateThread::current()?;
        // SAFETY: list::to_native produced the list for MarketEvent
        let native = unsafe { NativeBox::<Vec<MarketEvent>>::from_raw(list::to_native(events)?) };
        // SAFETY: handle is live; the list outlives the call
        let code = unsafe {
            (thread.api().dxfg_DXPublisher_publishEvents)(thread.raw(), self.handle.get()?, native.as_ptr())
        };
        thread.check_code(code, "dxfg_DXPublisher_publishEvents")?;
        Ok(())
    }
}

fn c_string(value: &str) -> GraalResult<CString> {
    CString::new(value).map_err(|_| GraalError::invalid_argument(format!("'{}' contains a NUL byte", value)))
}
