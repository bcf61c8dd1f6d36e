//! Safe bindings for the dxFeed Graal native image.
//!
//! This crate provides RAII wrappers around the raw C ABI in
//! `dxfeed-graal-sys`: one process-wide isolate, per-thread attachment,
//! owned Java object handles, conversion of symbols and events to and from
//! native records, listener callbacks and propagation of Java exceptions.
//!
//! # Example
//!
//! ```no_run
//! use dxfeed_graal::{Endpoint, EventKind, Role, Symbol};
//!
//! let endpoint = Endpoint::builder().role(Role::Feed).build()?;
//! endpoint.connect("demo.dxfeed.com:7300")?;
//!
//! let subscription = endpoint.feed()?.create_subscription(&[EventKind::Quote])?;
//! subscription.set_event_listener(|events| {
//!     for event in events {
//!         println!("{}: {:?}", event.event_symbol(), event);
//!     }
//! })?;
//! subscription.add_symbol(&Symbol::string("AAPL"))?;
//! # Ok::<(), dxfeed_graal::GraalError>(())
//! ```
//!
//! # Threads
//!
//! Any thread may call into the crate; it is attached to the isolate on
//! first use and detached when it exits. [`IsolateThread`] is `!Send`.
//! Handles (`Endpoint`, `Subscription`, ...) are `Send + Sync`.
//!
//! Listeners run on native dispatch threads. A panic in a listener is
//! caught at the boundary and logged.

pub mod config;
pub mod endpoint;
mod error;
pub mod events;
mod exception;
pub mod handle;
pub mod isolate;
pub mod listener;
pub mod marshal;
pub mod subscription;
pub mod system;

pub use config::RuntimeConfig;
pub use endpoint::{Endpoint, EndpointBuilder, EndpointState, Feed, Publisher, Role};
pub use error::{GraalError, GraalResult, IsolateErrorCode, JavaException, MarshalError};
pub use events::{EventKind, MarketEvent};
pub use handle::JavaHandle;
pub use isolate::{Isolate, IsolateThread};
pub use listener::{ListenerRegistry, ListenerToken};
pub use marshal::{IndexedEventSource, NativeBox, NativeMarshal, SourceKind, Symbol};
pub use subscription::Subscription;

// Re-export the raw bindings for direct FFI access when needed
pub use dxfeed_graal_sys;
