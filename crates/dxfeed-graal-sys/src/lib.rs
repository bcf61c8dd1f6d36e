//! Raw FFI bindings to the dxFeed Graal native image
//!
//! This crate provides low-level unsafe bindings to the C ABI exported by the
//! ahead-of-time compiled dxFeed runtime. Use the safe wrappers in
//! `dxfeed-graal` for higher-level access.
//!
//! Every record here is a byte-for-byte mirror of the native structure.
//! Discriminators are plain `c_int` values rather than Rust enums so that a
//! value outside the known set can be read without undefined behavior.

#![allow(non_camel_case_types)]
#![allow(non_upper_case_globals)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};

pub mod api;
pub mod events;

pub use api::{DxfgApi, NativeLibrary, default_library_name};
pub use events::*;

// Graal isolate opaque types
#[repr(C)]
pub struct graal_isolate_t {
    _private: [u8; 0],
}

#[repr(C)]
pub struct graal_isolatethread_t {
    _private: [u8; 0],
}

/// Isolate creation parameters. The binding always passes null and lets the
/// image use its defaults.
#[repr(C)]
pub struct graal_create_isolate_params_t {
    _private: [u8; 0],
}

// Return codes
pub const DXFG_EXECUTE_SUCCESSFULLY: c_int = 0;
pub const DXFG_EXECUTE_FAIL: c_int = -1;

/// Handle to an object living in the isolate's Java heap.
#[repr(C)]
#[derive(Debug)]
pub struct dxfg_java_object_handler {
    pub java_object_handle: *mut c_void,
}

macro_rules! java_object_types {
    ($($name:ident),* $(,)?) => {
        $(
            #[repr(C)]
            #[derive(Debug)]
            pub struct $name {
                pub handler: dxfg_java_object_handler,
            }
        )*
    };
}

java_object_types!(
    dxfg_endpoint_builder_t,
    dxfg_endpoint_t,
    dxfg_feed_t,
    dxfg_publisher_t,
    dxfg_subscription_t,
    dxfg_feed_event_listener_t,
);

/// Exception record returned by `dxfg_get_and_clear_thread_exception_t`.
#[repr(C)]
#[derive(Debug)]
pub struct dxfg_exception_t {
    pub class_name: *const c_char,
    pub message: *const c_char,
    pub print_stack_trace: *const c_char,
    pub stack_trace: *mut c_void,
    pub cause: *mut dxfg_exception_t,
}

/// `{size, elements}` list header shared by every list crossing the boundary.
#[repr(C)]
#[derive(Debug)]
pub struct dxfg_list<T> {
    pub size: i32,
    pub elements: *mut *mut T,
}

// Symbols
pub type dxfg_symbol_type_t = c_int;
pub const DXFG_SYMBOL_STRING: dxfg_symbol_type_t = 0;
pub const DXFG_SYMBOL_CANDLE: dxfg_symbol_type_t = 1;
pub const DXFG_SYMBOL_WILDCARD: dxfg_symbol_type_t = 2;
pub const DXFG_SYMBOL_INDEXED_EVENT_SUBSCRIPTION: dxfg_symbol_type_t = 3;
pub const DXFG_SYMBOL_TIME_SERIES_SUBSCRIPTION: dxfg_symbol_type_t = 4;

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_symbol_t {
    pub type_: dxfg_symbol_type_t,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_string_symbol_t {
    pub supper: dxfg_symbol_t,
    pub symbol: *const c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_wildcard_symbol_t {
    pub supper: dxfg_symbol_t,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_candle_symbol_t {
    pub supper: dxfg_symbol_t,
    pub symbol: *const c_char,
}

pub type dxfg_indexed_event_source_type_t = c_int;
pub const DXFG_INDEXED_EVENT_SOURCE: dxfg_indexed_event_source_type_t = 0;
pub const DXFG_ORDER_SOURCE: dxfg_indexed_event_source_type_t = 1;

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_indexed_event_source_t {
    pub type_: dxfg_indexed_event_source_type_t,
    pub id: i32,
    pub name: *const c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_indexed_event_subscription_symbol_t {
    pub supper: dxfg_symbol_t,
    pub symbol: *mut dxfg_symbol_t,
    pub source: *mut dxfg_indexed_event_source_t,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_time_series_subscription_symbol_t {
    pub supper: dxfg_symbol_t,
    pub symbol: *mut dxfg_symbol_t,
    pub from_time: i64,
}

pub type dxfg_symbol_list = dxfg_list<dxfg_symbol_t>;

// Endpoint
pub type dxfg_endpoint_role_t = c_int;
pub const DXFG_ENDPOINT_ROLE_FEED: dxfg_endpoint_role_t = 0;
pub const DXFG_ENDPOINT_ROLE_ON_DEMAND_FEED: dxfg_endpoint_role_t = 1;
pub const DXFG_ENDPOINT_ROLE_STREAM_FEED: dxfg_endpoint_role_t = 2;
pub const DXFG_ENDPOINT_ROLE_PUBLISHER: dxfg_endpoint_role_t = 3;
pub const DXFG_ENDPOINT_ROLE_STREAM_PUBLISHER: dxfg_endpoint_role_t = 4;
pub const DXFG_ENDPOINT_ROLE_LOCAL_HUB: dxfg_endpoint_role_t = 5;

pub type dxfg_endpoint_state_t = c_int;
pub const DXFG_ENDPOINT_STATE_NOT_CONNECTED: dxfg_endpoint_state_t = 0;
pub const DXFG_ENDPOINT_STATE_CONNECTING: dxfg_endpoint_state_t = 1;
pub const DXFG_ENDPOINT_STATE_CONNECTED: dxfg_endpoint_state_t = 2;
pub const DXFG_ENDPOINT_STATE_CLOSED: dxfg_endpoint_state_t = 3;

// Callback types
pub type dxfg_feed_event_listener_function = Option<
    unsafe extern "C" fn(
        thread: *mut graal_isolatethread_t,
        events: *mut dxfg_event_type_list,
        user_data: *mut c_void,
    ),
>;
