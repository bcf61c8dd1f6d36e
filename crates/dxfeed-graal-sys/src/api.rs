//! Entry point table of the native image.
//!
//! The image is opened at runtime with `libloading` and every entry point is
//! resolved once into a [`DxfgApi`] table of plain function pointers. A table
//! can also be assembled by hand, which is how embedders plug in an image
//! that is already loaded.

use std::ffi::{OsStr, OsString, c_void};
use std::os::raw::{c_char, c_int};

use libloading::Library;

use crate::*;

macro_rules! native_api {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// Function pointers for every entry point used by the binding.
        #[derive(Clone, Copy, Debug)]
        pub struct DxfgApi {
            $(
                $(#[$meta])*
                pub $name: unsafe extern "C" fn($($arg: $ty),*) $(-> $ret)?,
            )*
        }

        impl DxfgApi {
            /// Resolve every entry point from an opened image.
            ///
            /// # Safety
            /// The library must export each symbol with exactly the declared
            /// signature.
            pub unsafe fn load(library: &Library) -> Result<Self, libloading::Error> {
                // SAFETY: signatures match the native headers per caller contract
                unsafe {
                    Ok(Self {
                        $(
                            $name: *library.get::<unsafe extern "C" fn($($ty),*) $(-> $ret)?>(
                                concat!(stringify!($name), "\0").as_bytes(),
                            )?,
                        )*
                    })
                }
            }
        }
    };
}

native_api! {
    // Isolate lifecycle
    fn graal_create_isolate(
        params: *mut graal_create_isolate_params_t,
        isolate: *mut *mut graal_isolate_t,
        thread: *mut *mut graal_isolatethread_t,
    ) -> c_int;
    fn graal_attach_thread(
        isolate: *mut graal_isolate_t,
        thread: *mut *mut graal_isolatethread_t,
    ) -> c_int;
    fn graal_detach_thread(thread: *mut graal_isolatethread_t) -> c_int;

    // Exceptions
    fn dxfg_get_and_clear_thread_exception_t(
        thread: *mut graal_isolatethread_t,
    ) -> *mut dxfg_exception_t;
    fn dxfg_Exception_release(thread: *mut graal_isolatethread_t, exception: *mut dxfg_exception_t);

    // Java object handles
    fn dxfg_JavaObjectHandler_release(
        thread: *mut graal_isolatethread_t,
        handler: *mut dxfg_java_object_handler,
    ) -> i32;

    // System properties
    fn dxfg_system_set_property(
        thread: *mut graal_isolatethread_t,
        key: *const c_char,
        value: *const c_char,
    ) -> i32;
    fn dxfg_system_get_property(
        thread: *mut graal_isolatethread_t,
        key: *const c_char,
    ) -> *const c_char;
    fn dxfg_system_release_property(
        thread: *mut graal_isolatethread_t,
        value: *const c_char,
    ) -> i32;

    // Endpoint
    fn dxfg_DXEndpoint_newBuilder(thread: *mut graal_isolatethread_t) -> *mut dxfg_endpoint_builder_t;
    fn dxfg_DXEndpoint_Builder_withRole(
        thread: *mut graal_isolatethread_t,
        builder: *mut dxfg_endpoint_builder_t,
        role: dxfg_endpoint_role_t,
    ) -> i32;
    fn dxfg_DXEndpoint_Builder_withProperty(
        thread: *mut graal_isolatethread_t,
        builder: *mut dxfg_endpoint_builder_t,
        key: *const c_char,
        value: *const c_char,
    ) -> i32;
    fn dxfg_DXEndpoint_Builder_build(
        thread: *mut graal_isolatethread_t,
        builder: *mut dxfg_endpoint_builder_t,
    ) -> *mut dxfg_endpoint_t;
    fn dxfg_DXEndpoint_connect(
        thread: *mut graal_isolatethread_t,
        endpoint: *mut dxfg_endpoint_t,
        address: *const c_char,
    ) -> i32;
    fn dxfg_DXEndpoint_disconnect(thread: *mut graal_isolatethread_t, endpoint: *mut dxfg_endpoint_t) -> i32;
    fn dxfg_DXEndpoint_close(thread: *mut graal_isolatethread_t, endpoint: *mut dxfg_endpoint_t) -> i32;
    fn dxfg_DXEndpoint_getState(
        thread: *mut graal_isolatethread_t,
        endpoint: *mut dxfg_endpoint_t,
    ) -> dxfg_endpoint_state_t;
    fn dxfg_DXEndpoint_getFeed(
        thread: *mut graal_isolatethread_t,
        endpoint: *mut dxfg_endpoint_t,
    ) -> *mut dxfg_feed_t;
    fn dxfg_DXEndpoint_getPublisher(
        thread: *mut graal_isolatethread_t,
        endpoint: *mut dxfg_endpoint_t,
    ) -> *mut dxfg_publisher_t;

    // Feed
    fn dxfg_DXFeed_createSubscription2(
        thread: *mut graal_isolatethread_t,
        feed: *mut dxfg_feed_t,
        event_clazzes: *mut dxfg_event_clazz_list_t,
    ) -> *mut dxfg_subscription_t;
    fn dxfg_DXFeed_getLastEventIfSubscribed(
        thread: *mut graal_isolatethread_t,
        feed: *mut dxfg_feed_t,
        event_clazz: dxfg_event_clazz_t,
        symbol: *mut dxfg_symbol_t,
    ) -> *mut dxfg_event_type_t;

    // Subscription
    fn dxfg_DXFeedSubscription_close(
        thread: *mut graal_isolatethread_t,
        subscription: *mut dxfg_subscription_t,
    ) -> i32;
    fn dxfg_DXFeedSubscription_addSymbol(
        thread: *mut graal_isolatethread_t,
        subscription: *mut dxfg_subscription_t,
        symbol: *mut dxfg_symbol_t,
    ) -> i32;
    fn dxfg_DXFeedSubscription_addSymbols(
        thread: *mut graal_isolatethread_t,
        subscription: *mut dxfg_subscription_t,
        symbols: *mut dxfg_symbol_list,
    ) -> i32;
    fn dxfg_DXFeedSubscription_removeSymbol(
        thread: *mut graal_isolatethread_t,
        subscription: *mut dxfg_subscription_t,
        symbol: *mut dxfg_symbol_t,
    ) -> i32;
    fn dxfg_DXFeedSubscription_clear(
        thread: *mut graal_isolatethread_t,
        subscription: *mut dxfg_subscription_t,
    ) -> i32;
    fn dxfg_DXFeedSubscription_getSymbols(
        thread: *mut graal_isolatethread_t,
        subscription: *mut dxfg_subscription_t,
    ) -> *mut dxfg_symbol_list;
    fn dxfg_DXFeedSubscription_addEventListener(
        thread: *mut graal_isolatethread_t,
        subscription: *mut dxfg_subscription_t,
        listener: *mut dxfg_feed_event_listener_t,
    ) -> i32;
    fn dxfg_DXFeedSubscription_removeEventListener(
        thread: *mut graal_isolatethread_t,
        subscription: *mut dxfg_subscription_t,
        listener: *mut dxfg_feed_event_listener_t,
    ) -> i32;

    // Listener
    fn dxfg_DXFeedEventListener_new(
        thread: *mut graal_isolatethread_t,
        user_func: dxfg_feed_event_listener_function,
        user_data: *mut c_void,
    ) -> *mut dxfg_feed_event_listener_t;

    // Publisher
    fn dxfg_DXPublisher_publishEvents(
        thread: *mut graal_isolatethread_t,
        publisher: *mut dxfg_publisher_t,
        events: *mut dxfg_event_type_list,
    ) -> i32;

    // Native-owned memory
    fn dxfg_CList_symbol_release(thread: *mut graal_isolatethread_t, symbols: *mut dxfg_symbol_list) -> i32;
    fn dxfg_EventType_release(thread: *mut graal_isolatethread_t, event: *mut dxfg_event_type_t) -> i32;
}

/// Platform file name of the native image (`libDxFeedGraalNativeSdk.so` etc.).
pub fn default_library_name() -> OsString {
    libloading::library_filename("DxFeedGraalNativeSdk")
}

/// An opened native image together with its resolved entry points.
///
/// The library stays loaded for as long as this value lives; the table must
/// not be used after it is dropped.
pub struct NativeLibrary {
    api: DxfgApi,
    _library: Library,
}

impl NativeLibrary {
    /// Open the image at `path` and resolve the entry point table.
    ///
    /// # Safety
    /// Loading a library runs its initializers; the file must be a dxFeed
    /// Graal native image.
    pub unsafe fn open(path: impl AsRef<OsStr>) -> Result<Self, libloading::Error> {
        // SAFETY: per caller contract
        unsafe {
            let library = Library::new(path.as_ref())?;
            let api = DxfgApi::load(&library)?;
            Ok(Self {
                api,
                _library: library,
            })
        }
    }

    /// Get the resolved entry point table
    pub fn api(&self) -> &DxfgApi {
        &self.api
    }
}

impl std::fmt::Debug for NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary").finish_non_exhaustive()
    }
}
