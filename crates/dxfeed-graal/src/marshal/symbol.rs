//! Subscription symbols.
//!
//! Native symbols are a tagged union: a `dxfg_symbol_t` header carrying the
//! discriminator, followed by the variant payload. Wrapper variants point to
//! an inner symbol of any variant, so encode, decode and release all recurse
//! over the same graph.

use std::fmt;

use dxfeed_graal_sys::{
    DXFG_SYMBOL_CANDLE, DXFG_SYMBOL_INDEXED_EVENT_SUBSCRIPTION, DXFG_SYMBOL_STRING,
    DXFG_SYMBOL_TIME_SERIES_SUBSCRIPTION, DXFG_SYMBOL_WILDCARD, dxfg_candle_symbol_t,
    dxfg_indexed_event_subscription_symbol_t, dxfg_string_symbol_t, dxfg_symbol_t,
    dxfg_symbol_type_t, dxfg_time_series_subscription_symbol_t, dxfg_wildcard_symbol_t,
};
use scopeguard::{ScopeGuard, guard};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GraalError, GraalResult, MarshalError};
use crate::marshal::{IndexedEventSource, NativeMarshal, string};

/// Wrapper nesting deeper than this is rejected in both directions.
const MAX_NESTING: usize = 32;

/// A subscription symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Symbol {
    /// Plain instrument symbol such as `"AAPL"`
    String { symbol: String },
    /// Subscribes to all symbols
    Wildcard,
    /// Candle symbol such as `"AAPL{=1m}"`
    Candle { symbol: String },
    /// Indexed events of `symbol` from one source
    IndexedEvent {
        symbol: Box<Symbol>,
        source: IndexedEventSource,
    },
    /// Time series events of `symbol` starting at `from_time` (millis)
    #[serde(rename_all = "camelCase")]
    TimeSeries { symbol: Box<Symbol>, from_time: i64 },
}

impl Symbol {
    pub fn string(symbol: impl Into<String>) -> Self {
        Self::String {
            symbol: symbol.into(),
        }
    }

    pub fn candle(symbol: impl Into<String>) -> Self {
        Self::Candle {
            symbol: symbol.into(),
        }
    }

    pub fn indexed_event(symbol: impl Into<Symbol>, source: IndexedEventSource) -> Self {
        Self::IndexedEvent {
            symbol: Box::new(symbol.into()),
            source,
        }
    }

    pub fn time_series(symbol: impl Into<Symbol>, from_time: i64) -> Self {
        Self::TimeSeries {
            symbol: Box::new(symbol.into()),
            from_time,
        }
    }

    fn encode(&self, depth: usize) -> GraalResult<*mut dxfg_symbol_t> {
        if depth > MAX_NESTING {
            return Err(GraalError::invalid_argument(format!(
                "symbol nesting exceeds {} levels",
                MAX_NESTING
            )));
        }

        let symbol = match self {
            Self::String { symbol } => boxed(dxfg_string_symbol_t {
                supper: header(DXFG_SYMBOL_STRING),
                symbol: string::to_native(symbol)?,
            }),
            Self::Wildcard => boxed(dxfg_wildcard_symbol_t {
                supper: header(DXFG_SYMBOL_WILDCARD),
            }),
            Self::Candle { symbol } => boxed(dxfg_candle_symbol_t {
                supper: header(DXFG_SYMBOL_CANDLE),
                symbol: string::to_native(symbol)?,
            }),
            Self::IndexedEvent { symbol, source } => {
                let inner = inner_guard(symbol.encode(depth + 1)?);
                let source = source.to_native()?;
                boxed(dxfg_indexed_event_subscription_symbol_t {
                    supper: header(DXFG_SYMBOL_INDEXED_EVENT_SUBSCRIPTION),
                    symbol: ScopeGuard::into_inner(inner),
                    source,
                })
            }
            Self::TimeSeries { symbol, from_time } => {
                let inner = symbol.encode(depth + 1)?;
                boxed(dxfg_time_series_subscription_symbol_t {
                    supper: header(DXFG_SYMBOL_TIME_SERIES_SUBSCRIPTION),
                    symbol: inner,
                    from_time: *from_time,
                })
            }
        };
        Ok(symbol)
    }

    /// # Safety
    /// `native` must be null or point to a valid symbol record.
    unsafe fn decode(native: *const dxfg_symbol_t, depth: usize) -> GraalResult<Self> {
        if native.is_null() {
            return Err(MarshalError::malformed("symbol", "null pointer").into());
        }
        if depth > MAX_NESTING {
            return Err(MarshalError::malformed(
                "symbol",
                format!("nesting exceeds {} levels", MAX_NESTING),
            )
            .into());
        }

        // SAFETY: the discriminator is the first field of every variant; the
        // payload is only read after it selected the record type
        unsafe {
            match (*native).type_ {
                DXFG_SYMBOL_STRING => {
                    let record = &*native.cast::<dxfg_string_symbol_t>();
                    Ok(Self::String {
                        symbol: string::from_native(record.symbol)?,
                    })
                }
                DXFG_SYMBOL_WILDCARD => Ok(Self::Wildcard),
                DXFG_SYMBOL_CANDLE => {
                    let record = &*native.cast::<dxfg_candle_symbol_t>();
                    Ok(Self::Candle {
                        symbol: string::from_native(record.symbol)?,
                    })
                }
                DXFG_SYMBOL_INDEXED_EVENT_SUBSCRIPTION => {
                    let record = &*native.cast::<dxfg_indexed_event_subscription_symbol_t>();
                    Ok(Self::IndexedEvent {
                        symbol: Box::new(Self::decode(record.symbol, depth + 1)?),
                        source: IndexedEventSource::from_native(record.source)?,
                    })
                }
                DXFG_SYMBOL_TIME_SERIES_SUBSCRIPTION => {
                    let record = &*native.cast::<dxfg_time_series_subscription_symbol_t>();
                    Ok(Self::TimeSeries {
                        symbol: Box::new(Self::decode(record.symbol, depth + 1)?),
                        from_time: record.from_time,
                    })
                }
                value => Err(MarshalError::UnknownVariant {
                    kind: "symbol",
                    value,
                }
                .into()),
            }
        }
    }

    /// Free a Rust-allocated symbol: inner symbol first, then the wrapper's
    /// own record.
    ///
    /// # Safety
    /// `native` must be null or come from [`Symbol::encode`].
    unsafe fn release(native: *mut dxfg_symbol_t) {
        if native.is_null() {
            return;
        }
        // SAFETY: every record was boxed by encode with the type its header names
        unsafe {
            match (*native).type_ {
                DXFG_SYMBOL_STRING => {
                    let record = Box::from_raw(native.cast::<dxfg_string_symbol_t>());
                    string::release_native(record.symbol.cast_mut());
                }
                DXFG_SYMBOL_WILDCARD => {
                    drop(Box::from_raw(native.cast::<dxfg_wildcard_symbol_t>()));
                }
                DXFG_SYMBOL_CANDLE => {
                    let record = Box::from_raw(native.cast::<dxfg_candle_symbol_t>());
                    string::release_native(record.symbol.cast_mut());
                }
                DXFG_SYMBOL_INDEXED_EVENT_SUBSCRIPTION => {
                    let record =
                        Box::from_raw(native.cast::<dxfg_indexed_event_subscription_symbol_t>());
                    Self::release(record.symbol);
                    IndexedEventSource::release_native(record.source);
                    drop(record);
                }
                DXFG_SYMBOL_TIME_SERIES_SUBSCRIPTION => {
                    let record =
                        Box::from_raw(native.cast::<dxfg_time_series_subscription_symbol_t>());
                    Self::release(record.symbol);
                    drop(record);
                }
                value => warn!(value, "Leaking symbol record with unknown discriminator"),
            }
        }
    }
}

fn header(type_: dxfg_symbol_type_t) -> dxfg_symbol_t {
    dxfg_symbol_t { type_ }
}

fn boxed<R>(record: R) -> *mut dxfg_symbol_t {
    Box::into_raw(Box::new(record)).cast()
}

fn inner_guard(
    inner: *mut dxfg_symbol_t,
) -> ScopeGuard<*mut dxfg_symbol_t, impl FnOnce(*mut dxfg_symbol_t)> {
    guard(inner, |inner| {
        // SAFETY: inner came from encode and was not handed out
        unsafe { Symbol::release(inner) }
    })
}

impl NativeMarshal for Symbol {
    type Native = dxfg_symbol_t;

    fn to_native(&self) -> GraalResult<*mut dxfg_symbol_t> {
        self.encode(0)
    }

    unsafe fn from_native(native: *const dxfg_symbol_t) -> GraalResult<Self> {
        // SAFETY: per trait contract
        unsafe { Self::decode(native, 0) }
    }

    unsafe fn release_native(native: *mut dxfg_symbol_t) {
        // SAFETY: per trait contract
        unsafe { Self::release(native) }
    }
}

impl From<&str> for Symbol {
    fn from(symbol: &str) -> Self {
        Self::string(symbol)
    }
}

impl From<String> for Symbol {
    fn from(symbol: String) -> Self {
        Self::String { symbol }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String { symbol } | Self::Candle { symbol } => f.write_str(symbol),
            Self::Wildcard => f.write_str("*"),
            Self::IndexedEvent { symbol, source } => write!(f, "{}#{}", symbol, source),
            Self::TimeSeries { symbol, from_time } => write!(f, "{}@{}", symbol, from_time),
        }
    }
}
