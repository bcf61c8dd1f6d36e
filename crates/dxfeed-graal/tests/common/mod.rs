//! In-process stand-in for the native image.
//!
//! Every entry point of [`DxfgApi`] is implemented here against a small Java
//! heap model: handles are leaked boxes tracked by address, pending
//! exceptions are thread-local, and published events are delivered to
//! listeners from a separate dispatch thread. Records crossing the boundary
//! are built with the crate's own converters.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_void};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use dxfeed_graal::dxfeed_graal_sys::*;
use dxfeed_graal::events;
use dxfeed_graal::marshal::list;
use dxfeed_graal::{EventKind, Isolate, MarketEvent, NativeMarshal, RuntimeConfig, Symbol};
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the fake image as the process isolate.
pub fn install() -> &'static Isolate {
    install_with(RuntimeConfig::new())
}

pub fn install_with(config: RuntimeConfig) -> &'static Isolate {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    Isolate::install(api(), config).expect("fake isolate")
}

/// Entry point table backed by this module
pub fn api() -> DxfgApi {
    DxfgApi {
        graal_create_isolate: create_isolate,
        graal_attach_thread: attach_thread,
        graal_detach_thread: detach_thread,
        dxfg_get_and_clear_thread_exception_t: get_and_clear_exception,
        dxfg_Exception_release: release_exception,
        dxfg_JavaObjectHandler_release: release_handle,
        dxfg_system_set_property: set_property,
        dxfg_system_get_property: get_property,
        dxfg_system_release_property: release_property,
        dxfg_DXEndpoint_newBuilder: new_builder,
        dxfg_DXEndpoint_Builder_withRole: builder_with_role,
        dxfg_DXEndpoint_Builder_withProperty: builder_with_property,
        dxfg_DXEndpoint_Builder_build: builder_build,
        dxfg_DXEndpoint_connect: endpoint_connect,
        dxfg_DXEndpoint_disconnect: endpoint_disconnect,
        dxfg_DXEndpoint_close: endpoint_close,
        dxfg_DXEndpoint_getState: endpoint_state,
        dxfg_DXEndpoint_getFeed: endpoint_feed,
        dxfg_DXEndpoint_getPublisher: endpoint_publisher,
        dxfg_DXFeed_createSubscription2: create_subscription,
        dxfg_DXFeed_getLastEventIfSubscribed: last_event_if_subscribed,
        dxfg_DXFeedSubscription_close: subscription_close,
        dxfg_DXFeedSubscription_addSymbol: subscription_add_symbol,
        dxfg_DXFeedSubscription_addSymbols: subscription_add_symbols,
        dxfg_DXFeedSubscription_removeSymbol: subscription_remove_symbol,
        dxfg_DXFeedSubscription_clear: subscription_clear,
        dxfg_DXFeedSubscription_getSymbols: subscription_symbols,
        dxfg_DXFeedSubscription_addEventListener: subscription_add_listener,
        dxfg_DXFeedSubscription_removeEventListener: subscription_remove_listener,
        dxfg_DXFeedEventListener_new: new_listener,
        dxfg_DXPublisher_publishEvents: publish_events,
        dxfg_CList_symbol_release: release_symbol_list,
        dxfg_EventType_release: release_event,
    }
}

// ---------------------------------------------------------------------------
// Observable state
// ---------------------------------------------------------------------------

/// A call recorded in the global log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Release(usize),
    AddListener { subscription: usize, listener: usize },
    RemoveListener { subscription: usize, listener: usize },
    CloseSubscription(usize),
    CloseEndpoint(usize),
}

/// Java exception to raise from an injected failure
#[derive(Debug, Clone)]
pub struct FakeException {
    pub class_name: String,
    pub message: String,
    pub stack_trace: String,
    pub cause: Option<Box<FakeException>>,
}

impl FakeException {
    pub fn new(class_name: &str, message: &str, stack_trace: &str) -> Self {
        Self {
            class_name: class_name.into(),
            message: message.into(),
            stack_trace: stack_trace.into(),
            cause: None,
        }
    }

    pub fn caused_by(mut self, cause: FakeException) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

enum Failure {
    Raise(FakeException),
    Silent,
}

#[derive(Debug, Clone, Copy)]
struct FakeListener {
    func: dxfg_feed_event_listener_function,
    user_data: usize,
}

#[derive(Debug, Default)]
struct FakeSubscription {
    kinds: Vec<EventKind>,
    symbols: Vec<Symbol>,
    listeners: Vec<usize>,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BuiltEndpoint {
    pub role: dxfg_endpoint_role_t,
    pub properties: Vec<(String, String)>,
}

#[derive(Debug)]
struct FakeEndpoint {
    state: dxfg_endpoint_state_t,
}

#[derive(Default)]
struct Heap {
    live: HashMap<usize, &'static str>,
    releases: HashMap<usize, usize>,
    log: Vec<Call>,
    builders: HashMap<usize, BuiltEndpoint>,
    endpoints: HashMap<usize, FakeEndpoint>,
    feeds: HashMap<usize, usize>,
    publishers: HashMap<usize, usize>,
    subscriptions: HashMap<usize, FakeSubscription>,
    listeners: HashMap<usize, FakeListener>,
    last_events: HashMap<(EventKind, String), MarketEvent>,
    properties: HashMap<String, String>,
}

static HEAP: LazyLock<Mutex<Heap>> = LazyLock::new(|| Mutex::new(Heap::default()));
static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
static NEXT_THREAD: AtomicUsize = AtomicUsize::new(1);
static ATTACHES: AtomicUsize = AtomicUsize::new(0);
static DETACHES: AtomicUsize = AtomicUsize::new(0);
static CREATE_ISOLATE_CODE: AtomicI32 = AtomicI32::new(0);

thread_local! {
    static THREAD: Cell<usize> = const { Cell::new(0) };
    static PENDING: RefCell<Option<FakeException>> = const { RefCell::new(None) };
    static FAILURES: RefCell<HashMap<&'static str, Failure>> = RefCell::new(HashMap::new());
    static LAST_BUILT: RefCell<Option<BuiltEndpoint>> = const { RefCell::new(None) };
    static EXCEPTIONS_ALLOCATED: Cell<usize> = const { Cell::new(0) };
    static EXCEPTIONS_RELEASED: Cell<usize> = const { Cell::new(0) };
    static EVENTS_RELEASED: Cell<usize> = const { Cell::new(0) };
    static SYMBOL_LISTS_RELEASED: Cell<usize> = const { Cell::new(0) };
    static PROPERTIES_RELEASED: Cell<usize> = const { Cell::new(0) };
    static ATTACH_FAILURE: Cell<c_int> = const { Cell::new(0) };
}

/// Make the next call of `operation` on this thread raise `exception`
pub fn fail_next(operation: &'static str, exception: FakeException) {
    FAILURES.with(|f| f.borrow_mut().insert(operation, Failure::Raise(exception)));
}

/// Make the next call of `operation` on this thread fail without an exception
pub fn fail_next_silently(operation: &'static str) {
    FAILURES.with(|f| f.borrow_mut().insert(operation, Failure::Silent));
}

/// Make the next `graal_attach_thread` on this thread return `code`
pub fn fail_next_attach(code: c_int) {
    ATTACH_FAILURE.with(|c| c.set(code));
}

/// Make `graal_create_isolate` return `code`
pub fn set_create_isolate_code(code: c_int) {
    CREATE_ISOLATE_CODE.store(code, Ordering::SeqCst);
}

/// Number of native releases of the handle at `addr`
pub fn release_count(addr: usize) -> usize {
    HEAP.lock().releases.get(&addr).copied().unwrap_or(0)
}

pub fn is_live(addr: usize) -> bool {
    HEAP.lock().live.contains_key(&addr)
}

/// Recorded calls that mention any of `addrs`, in order
pub fn calls_for(addrs: &[usize]) -> Vec<Call> {
    HEAP.lock()
        .log
        .iter()
        .filter(|call| match call {
            Call::Release(a) | Call::CloseSubscription(a) | Call::CloseEndpoint(a) => addrs.contains(a),
            Call::AddListener { subscription, listener }
            | Call::RemoveListener { subscription, listener } => {
                addrs.contains(subscription) || addrs.contains(listener)
            }
        })
        .cloned()
        .collect()
}

/// Listener handles currently attached to a subscription
pub fn attached_listeners(subscription: usize) -> Vec<usize> {
    HEAP.lock()
        .subscriptions
        .get(&subscription)
        .map(|s| s.listeners.clone())
        .unwrap_or_default()
}

/// Native `user_data` of a listener handle
pub fn listener_user_data(listener: usize) -> Option<*mut c_void> {
    HEAP.lock()
        .listeners
        .get(&listener)
        .map(|l| l.user_data as *mut c_void)
}

pub fn last_built_endpoint() -> Option<BuiltEndpoint> {
    LAST_BUILT.with(|b| b.borrow().clone())
}

pub fn system_property(key: &str) -> Option<String> {
    HEAP.lock().properties.get(key).cloned()
}

pub fn attaches() -> usize {
    ATTACHES.load(Ordering::SeqCst)
}

pub fn detaches() -> usize {
    DETACHES.load(Ordering::SeqCst)
}

pub fn exceptions_allocated() -> usize {
    EXCEPTIONS_ALLOCATED.with(Cell::get)
}

pub fn exceptions_released() -> usize {
    EXCEPTIONS_RELEASED.with(Cell::get)
}

pub fn events_released() -> usize {
    EVENTS_RELEASED.with(Cell::get)
}

pub fn symbol_lists_released() -> usize {
    SYMBOL_LISTS_RELEASED.with(Cell::get)
}

pub fn properties_released() -> usize {
    PROPERTIES_RELEASED.with(Cell::get)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn current_thread() -> *mut graal_isolatethread_t {
    let id = THREAD.with(|t| {
        if t.get() == 0 {
            t.set(NEXT_THREAD.fetch_add(1, Ordering::SeqCst) * 16);
        }
        t.get()
    });
    ptr::without_provenance_mut(id)
}

fn new_handle<T>(heap: &mut Heap, kind: &'static str) -> *mut T {
    let id = NEXT_ID.fetch_add(1, Ordering::SeqCst);
    let raw = Box::into_raw(Box::new(dxfg_java_object_handler {
        java_object_handle: ptr::without_provenance_mut(id),
    }));
    heap.live.insert(raw as usize, kind);
    raw.cast()
}

fn raise(exception: FakeException) {
    PENDING.with(|p| *p.borrow_mut() = Some(exception));
}

fn raise_new(class_name: &str, message: impl Into<String>) {
    raise(FakeException {
        class_name: class_name.into(),
        message: message.into(),
        stack_trace: String::new(),
        cause: None,
    });
}

/// Consume an injected failure for `operation`
fn injected(operation: &'static str) -> bool {
    match FAILURES.with(|f| f.borrow_mut().remove(operation)) {
        Some(Failure::Raise(exception)) => {
            raise(exception);
            true
        }
        Some(Failure::Silent) => true,
        None => false,
    }
}

fn alloc_exception(exception: FakeException) -> *mut dxfg_exception_t {
    EXCEPTIONS_ALLOCATED.with(|c| c.set(c.get() + 1));
    let text = |s: String| CString::new(s).expect("exception text").into_raw().cast_const();
    let cause = match exception.cause {
        Some(cause) => alloc_exception(*cause),
        None => ptr::null_mut(),
    };
    Box::into_raw(Box::new(dxfg_exception_t {
        class_name: text(exception.class_name),
        message: text(exception.message),
        print_stack_trace: text(exception.stack_trace),
        stack_trace: ptr::null_mut(),
        cause,
    }))
}

unsafe fn free_exception(raw: *mut dxfg_exception_t) {
    if raw.is_null() {
        return;
    }
    unsafe {
        let record = Box::from_raw(raw);
        for text in [record.class_name, record.message, record.print_stack_trace] {
            if !text.is_null() {
                drop(CString::from_raw(text.cast_mut()));
            }
        }
        free_exception(record.cause);
    }
}

unsafe fn read_str(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// Isolate and exceptions
// ---------------------------------------------------------------------------

unsafe extern "C" fn create_isolate(
    _params: *mut graal_create_isolate_params_t,
    isolate: *mut *mut graal_isolate_t,
    thread: *mut *mut graal_isolatethread_t,
) -> c_int {
    let code = CREATE_ISOLATE_CODE.load(Ordering::SeqCst);
    if code != 0 {
        return code;
    }
    unsafe {
        *isolate = ptr::without_provenance_mut(0x1000);
        *thread = current_thread();
    }
    0
}

unsafe extern "C" fn attach_thread(
    _isolate: *mut graal_isolate_t,
    thread: *mut *mut graal_isolatethread_t,
) -> c_int {
    let failure = ATTACH_FAILURE.with(|c| c.replace(0));
    if failure != 0 {
        return failure;
    }
    ATTACHES.fetch_add(1, Ordering::SeqCst);
    unsafe { *thread = current_thread() };
    0
}

unsafe extern "C" fn detach_thread(_thread: *mut graal_isolatethread_t) -> c_int {
    DETACHES.fetch_add(1, Ordering::SeqCst);
    0
}

unsafe extern "C" fn get_and_clear_exception(_thread: *mut graal_isolatethread_t) -> *mut dxfg_exception_t {
    match PENDING.with(|p| p.borrow_mut().take()) {
        Some(exception) => alloc_exception(exception),
        None => ptr::null_mut(),
    }
}

unsafe extern "C" fn release_exception(_thread: *mut graal_isolatethread_t, exception: *mut dxfg_exception_t) {
    if exception.is_null() {
        return;
    }
    EXCEPTIONS_RELEASED.with(|c| c.set(c.get() + 1));
    unsafe { free_exception(exception) };
}

unsafe extern "C" fn release_handle(
    _thread: *mut graal_isolatethread_t,
    handler: *mut dxfg_java_object_handler,
) -> i32 {
    if injected("dxfg_JavaObjectHandler_release") {
        return -1;
    }
    let addr = handler as usize;
    let mut heap = HEAP.lock();
    *heap.releases.entry(addr).or_default() += 1;
    heap.log.push(Call::Release(addr));
    if heap.live.remove(&addr).is_none() {
        raise_new("java.lang.IllegalStateException", "handle released twice");
        return -1;
    }
    0
}

// ---------------------------------------------------------------------------
// System properties
// ---------------------------------------------------------------------------

unsafe extern "C" fn set_property(
    _thread: *mut graal_isolatethread_t,
    key: *const c_char,
    value: *const c_char,
) -> i32 {
    if injected("dxfg_system_set_property") {
        return -1;
    }
    let (key, value) = unsafe { (read_str(key), read_str(value)) };
    HEAP.lock().properties.insert(key, value);
    0
}

unsafe extern "C" fn get_property(_thread: *mut graal_isolatethread_t, key: *const c_char) -> *const c_char {
    if injected("dxfg_system_get_property") {
        return ptr::null();
    }
    let key = unsafe { read_str(key) };
    match HEAP.lock().properties.get(&key) {
        Some(value) => CString::new(value.as_str()).expect("property").into_raw().cast_const(),
        None => ptr::null(),
    }
}

unsafe extern "C" fn release_property(_thread: *mut graal_isolatethread_t, value: *const c_char) -> i32 {
    if !value.is_null() {
        PROPERTIES_RELEASED.with(|c| c.set(c.get() + 1));
        drop(unsafe { CString::from_raw(value.cast_mut()) });
    }
    0
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

unsafe extern "C" fn new_builder(_thread: *mut graal_isolatethread_t) -> *mut dxfg_endpoint_builder_t {
    if injected("dxfg_DXEndpoint_newBuilder") {
        return ptr::null_mut();
    }
    let mut heap = HEAP.lock();
    let builder = new_handle(&mut heap, "DXEndpoint.Builder");
    heap.builders.insert(builder as usize, BuiltEndpoint::default());
    builder
}

unsafe extern "C" fn builder_with_role(
    _thread: *mut graal_isolatethread_t,
    builder: *mut dxfg_endpoint_builder_t,
    role: dxfg_endpoint_role_t,
) -> i32 {
    if injected("dxfg_DXEndpoint_Builder_withRole") {
        return -1;
    }
    match HEAP.lock().builders.get_mut(&(builder as usize)) {
        Some(state) => {
            state.role = role;
            0
        }
        None => {
            raise_new("java.lang.NullPointerException", "builder");
            -1
        }
    }
}

unsafe extern "C" fn builder_with_property(
    _thread: *mut graal_isolatethread_t,
    builder: *mut dxfg_endpoint_builder_t,
    key: *const c_char,
    value: *const c_char,
) -> i32 {
    if injected("dxfg_DXEndpoint_Builder_withProperty") {
        return -1;
    }
    let (key, value) = unsafe { (read_str(key), read_str(value)) };
    match HEAP.lock().builders.get_mut(&(builder as usize)) {
        Some(state) => {
            state.properties.push((key, value));
            0
        }
        None => {
            raise_new("java.lang.NullPointerException", "builder");
            -1
        }
    }
}

unsafe extern "C" fn builder_build(
    _thread: *mut graal_isolatethread_t,
    builder: *mut dxfg_endpoint_builder_t,
) -> *mut dxfg_endpoint_t {
    if injected("dxfg_DXEndpoint_Builder_build") {
        return ptr::null_mut();
    }
    let mut heap = HEAP.lock();
    let Some(built) = heap.builders.get(&(builder as usize)).cloned() else {
        raise_new("java.lang.NullPointerException", "builder");
        return ptr::null_mut();
    };
    let endpoint = new_handle(&mut heap, "DXEndpoint");
    heap.endpoints.insert(
        endpoint as usize,
        FakeEndpoint {
            state: DXFG_ENDPOINT_STATE_NOT_CONNECTED,
        },
    );
    LAST_BUILT.with(|b| *b.borrow_mut() = Some(built));
    endpoint
}

fn with_endpoint(endpoint: *mut dxfg_endpoint_t, f: impl FnOnce(&mut FakeEndpoint) -> i32) -> i32 {
    match HEAP.lock().endpoints.get_mut(&(endpoint as usize)) {
        Some(state) => f(state),
        None => {
            raise_new("java.lang.NullPointerException", "endpoint");
            -1
        }
    }
}

unsafe extern "C" fn endpoint_connect(
    _thread: *mut graal_isolatethread_t,
    endpoint: *mut dxfg_endpoint_t,
    address: *const c_char,
) -> i32 {
    if injected("dxfg_DXEndpoint_connect") {
        return -1;
    }
    let address = unsafe { read_str(address) };
    with_endpoint(endpoint, |state| {
        if state.state == DXFG_ENDPOINT_STATE_CLOSED {
            raise_new("java.lang.IllegalStateException", "endpoint is closed");
            return -1;
        }
        if address.is_empty() {
            raise_new("java.lang.IllegalArgumentException", "address is empty");
            return -1;
        }
        state.state = DXFG_ENDPOINT_STATE_CONNECTED;
        0
    })
}

unsafe extern "C" fn endpoint_disconnect(_thread: *mut graal_isolatethread_t, endpoint: *mut dxfg_endpoint_t) -> i32 {
    if injected("dxfg_DXEndpoint_disconnect") {
        return -1;
    }
    with_endpoint(endpoint, |state| {
        if state.state != DXFG_ENDPOINT_STATE_CLOSED {
            state.state = DXFG_ENDPOINT_STATE_NOT_CONNECTED;
        }
        0
    })
}

unsafe extern "C" fn endpoint_close(_thread: *mut graal_isolatethread_t, endpoint: *mut dxfg_endpoint_t) -> i32 {
    if injected("dxfg_DXEndpoint_close") {
        return -1;
    }
    let code = with_endpoint(endpoint, |state| {
        state.state = DXFG_ENDPOINT_STATE_CLOSED;
        0
    });
    HEAP.lock().log.push(Call::CloseEndpoint(endpoint as usize));
    code
}

unsafe extern "C" fn endpoint_state(
    _thread: *mut graal_isolatethread_t,
    endpoint: *mut dxfg_endpoint_t,
) -> dxfg_endpoint_state_t {
    if injected("dxfg_DXEndpoint_getState") {
        return -1;
    }
    with_endpoint(endpoint, |state| state.state)
}

unsafe extern "C" fn endpoint_feed(_thread: *mut graal_isolatethread_t, endpoint: *mut dxfg_endpoint_t) -> *mut dxfg_feed_t {
    if injected("dxfg_DXEndpoint_getFeed") {
        return ptr::null_mut();
    }
    let mut heap = HEAP.lock();
    let feed = new_handle(&mut heap, "DXFeed");
    heap.feeds.insert(feed as usize, endpoint as usize);
    feed
}

unsafe extern "C" fn endpoint_publisher(
    _thread: *mut graal_isolatethread_t,
    endpoint: *mut dxfg_endpoint_t,
) -> *mut dxfg_publisher_t {
    if injected("dxfg_DXEndpoint_getPublisher") {
        return ptr::null_mut();
    }
    let mut heap = HEAP.lock();
    let publisher = new_handle(&mut heap, "DXPublisher");
    heap.publishers.insert(publisher as usize, endpoint as usize);
    publisher
}

// ---------------------------------------------------------------------------
// Feed and subscriptions
// ---------------------------------------------------------------------------

unsafe extern "C" fn create_subscription(
    _thread: *mut graal_isolatethread_t,
    _feed: *mut dxfg_feed_t,
    event_clazzes: *mut dxfg_event_clazz_list_t,
) -> *mut dxfg_subscription_t {
    if injected("dxfg_DXFeed_createSubscription2") {
        return ptr::null_mut();
    }
    let kinds = match unsafe { list::from_native::<EventKind>(event_clazzes) } {
        Ok(kinds) => kinds,
        Err(e) => {
            raise_new("java.lang.IllegalArgumentException", e.to_string());
            return ptr::null_mut();
        }
    };
    let mut heap = HEAP.lock();
    let subscription = new_handle(&mut heap, "DXFeedSubscription");
    heap.subscriptions.insert(
        subscription as usize,
        FakeSubscription {
            kinds,
            ..Default::default()
        },
    );
    subscription
}

fn symbol_key(symbol: &Symbol) -> String {
    match symbol {
        Symbol::String { symbol } => symbol.clone(),
        other => other.to_string(),
    }
}

fn is_subscribed(subscription: &FakeSubscription, kind: EventKind, event_symbol: &str) -> bool {
    !subscription.closed
        && subscription.kinds.contains(&kind)
        && subscription
            .symbols
            .iter()
            .any(|s| matches!(s, Symbol::Wildcard) || symbol_key(s) == event_symbol)
}

unsafe extern "C" fn last_event_if_subscribed(
    _thread: *mut graal_isolatethread_t,
    _feed: *mut dxfg_feed_t,
    event_clazz: dxfg_event_clazz_t,
    symbol: *mut dxfg_symbol_t,
) -> *mut dxfg_event_type_t {
    if injected("dxfg_DXFeed_getLastEventIfSubscribed") {
        return ptr::null_mut();
    }
    let decoded = EventKind::from_code(event_clazz)
        .and_then(|kind| unsafe { Symbol::from_native(symbol) }.map(|symbol| (kind, symbol)));
    let (kind, symbol) = match decoded {
        Ok(decoded) => decoded,
        Err(e) => {
            raise_new("java.lang.IllegalArgumentException", e.to_string());
            return ptr::null_mut();
        }
    };

    let key = symbol_key(&symbol);
    let heap = HEAP.lock();
    let subscribed = heap.subscriptions.values().any(|s| is_subscribed(s, kind, &key));
    match heap.last_events.get(&(kind, key)) {
        Some(event) if subscribed => event.to_native().expect("encode last event"),
        _ => ptr::null_mut(),
    }
}

fn with_subscription(subscription: *mut dxfg_subscription_t, f: impl FnOnce(&mut FakeSubscription) -> i32) -> i32 {
    match HEAP.lock().subscriptions.get_mut(&(subscription as usize)) {
        Some(state) => f(state),
        None => {
            raise_new("java.lang.NullPointerException", "subscription");
            -1
        }
    }
}

unsafe extern "C" fn subscription_close(
    _thread: *mut graal_isolatethread_t,
    subscription: *mut dxfg_subscription_t,
) -> i32 {
    if injected("dxfg_DXFeedSubscription_close") {
        return -1;
    }
    let code = with_subscription(subscription, |state| {
        state.closed = true;
        state.listeners.clear();
        0
    });
    HEAP.lock().log.push(Call::CloseSubscription(subscription as usize));
    code
}

unsafe extern "C" fn subscription_add_symbol(
    _thread: *mut graal_isolatethread_t,
    subscription: *mut dxfg_subscription_t,
    symbol: *mut dxfg_symbol_t,
) -> i32 {
    if injected("dxfg_DXFeedSubscription_addSymbol") {
        return -1;
    }
    let symbol = match unsafe { Symbol::from_native(symbol) } {
        Ok(symbol) => symbol,
        Err(e) => {
            raise_new("java.lang.IllegalArgumentException", e.to_string());
            return -1;
        }
    };
    with_subscription(subscription, |state| {
        if !state.symbols.contains(&symbol) {
            state.symbols.push(symbol);
        }
        0
    })
}

unsafe extern "C" fn subscription_add_symbols(
    _thread: *mut graal_isolatethread_t,
    subscription: *mut dxfg_subscription_t,
    symbols: *mut dxfg_symbol_list,
) -> i32 {
    if injected("dxfg_DXFeedSubscription_addSymbols") {
        return -1;
    }
    let symbols = match unsafe { list::from_native::<Symbol>(symbols) } {
        Ok(symbols) => symbols,
        Err(e) => {
            raise_new("java.lang.IllegalArgumentException", e.to_string());
            return -1;
        }
    };
    with_subscription(subscription, |state| {
        for symbol in symbols {
            if !state.symbols.contains(&symbol) {
                state.symbols.push(symbol);
            }
        }
        0
    })
}

unsafe extern "C" fn subscription_remove_symbol(
    _thread: *mut graal_isolatethread_t,
    subscription: *mut dxfg_subscription_t,
    symbol: *mut dxfg_symbol_t,
) -> i32 {
    if injected("dxfg_DXFeedSubscription_removeSymbol") {
        return -1;
    }
    let symbol = match unsafe { Symbol::from_native(symbol) } {
        Ok(symbol) => symbol,
        Err(e) => {
            raise_new("java.lang.IllegalArgumentException", e.to_string());
            return -1;
        }
    };
    with_subscription(subscription, |state| {
        state.symbols.retain(|s| s != &symbol);
        0
    })
}

unsafe extern "C" fn subscription_clear(
    _thread: *mut graal_isolatethread_t,
    subscription: *mut dxfg_subscription_t,
) -> i32 {
    if injected("dxfg_DXFeedSubscription_clear") {
        return -1;
    }
    with_subscription(subscription, |state| {
        state.symbols.clear();
        0
    })
}

unsafe extern "C" fn subscription_symbols(
    _thread: *mut graal_isolatethread_t,
    subscription: *mut dxfg_subscription_t,
) -> *mut dxfg_symbol_list {
    if injected("dxfg_DXFeedSubscription_getSymbols") {
        return ptr::null_mut();
    }
    let symbols = match HEAP.lock().subscriptions.get(&(subscription as usize)) {
        Some(state) => state.symbols.clone(),
        None => {
            raise_new("java.lang.NullPointerException", "subscription");
            return ptr::null_mut();
        }
    };
    list::to_native(symbols.as_slice()).expect("encode symbols")
}

unsafe extern "C" fn new_listener(
    _thread: *mut graal_isolatethread_t,
    user_func: dxfg_feed_event_listener_function,
    user_data: *mut c_void,
) -> *mut dxfg_feed_event_listener_t {
    if injected("dxfg_DXFeedEventListener_new") {
        return ptr::null_mut();
    }
    let mut heap = HEAP.lock();
    let listener = new_handle(&mut heap, "DXFeedEventListener");
    heap.listeners.insert(
        listener as usize,
        FakeListener {
            func: user_func,
            user_data: user_data as usize,
        },
    );
    listener
}

unsafe extern "C" fn subscription_add_listener(
    _thread: *mut graal_isolatethread_t,
    subscription: *mut dxfg_subscription_t,
    listener: *mut dxfg_feed_event_listener_t,
) -> i32 {
    if injected("dxfg_DXFeedSubscription_addEventListener") {
        return -1;
    }
    let code = with_subscription(subscription, |state| {
        state.listeners.push(listener as usize);
        0
    });
    HEAP.lock().log.push(Call::AddListener {
        subscription: subscription as usize,
        listener: listener as usize,
    });
    code
}

unsafe extern "C" fn subscription_remove_listener(
    _thread: *mut graal_isolatethread_t,
    subscription: *mut dxfg_subscription_t,
    listener: *mut dxfg_feed_event_listener_t,
) -> i32 {
    if injected("dxfg_DXFeedSubscription_removeEventListener") {
        return -1;
    }
    let code = with_subscription(subscription, |state| {
        state.listeners.retain(|l| *l != listener as usize);
        0
    });
    HEAP.lock().log.push(Call::RemoveListener {
        subscription: subscription as usize,
        listener: listener as usize,
    });
    code
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

unsafe extern "C" fn publish_events(
    _thread: *mut graal_isolatethread_t,
    publisher: *mut dxfg_publisher_t,
    event_list: *mut dxfg_event_type_list,
) -> i32 {
    if injected("dxfg_DXPublisher_publishEvents") {
        return -1;
    }
    let batch = match unsafe { events::from_native_list(event_list) } {
        Ok(batch) => batch,
        Err(e) => {
            raise_new("java.lang.IllegalArgumentException", e.to_string());
            return -1;
        }
    };

    let mut heap = HEAP.lock();
    if !heap.publishers.contains_key(&(publisher as usize)) {
        raise_new("java.lang.NullPointerException", "publisher");
        return -1;
    }
    for event in &batch {
        heap.last_events
            .insert((event.kind(), event.event_symbol().to_string()), event.clone());
    }

    let mut deliveries = Vec::new();
    for subscription in heap.subscriptions.values() {
        let matching: Vec<MarketEvent> = batch
            .iter()
            .filter(|e| is_subscribed(subscription, e.kind(), e.event_symbol()))
            .cloned()
            .collect();
        if matching.is_empty() {
            continue;
        }
        for listener in &subscription.listeners {
            if let Some(listener) = heap.listeners.get(listener) {
                deliveries.push((*listener, matching.clone()));
            }
        }
    }
    drop(heap);

    for (listener, batch) in deliveries {
        dispatch(listener, batch);
    }
    0
}

/// Deliver a batch the way the runtime does: on a runtime-owned thread, with
/// a native list that is released after the callback returns.
fn dispatch(listener: FakeListener, batch: Vec<MarketEvent>) {
    std::thread::spawn(move || {
        let native = events::to_native_list(&batch).expect("encode batch");
        if let Some(func) = listener.func {
            unsafe { func(current_thread(), native, listener.user_data as *mut c_void) };
        }
        unsafe { events::release_native_list(native) };
    })
    .join()
    .expect("dispatch thread");
}

// ---------------------------------------------------------------------------
// Native-owned memory
// ---------------------------------------------------------------------------

unsafe extern "C" fn release_symbol_list(_thread: *mut graal_isolatethread_t, symbols: *mut dxfg_symbol_list) -> i32 {
    SYMBOL_LISTS_RELEASED.with(|c| c.set(c.get() + 1));
    unsafe { list::release_native::<Symbol>(symbols) };
    0
}

unsafe extern "C" fn release_event(_thread: *mut graal_isolatethread_t, event: *mut dxfg_event_type_t) -> i32 {
    EVENTS_RELEASED.with(|c| c.set(c.get() + 1));
    unsafe { MarketEvent::release_native(event) };
    0
}
