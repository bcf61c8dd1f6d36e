//! Market events and their native records.
//!
//! Every native event record starts with a `dxfg_event_type_t` carrying the
//! event class code. Decoding reads that code first and dispatches to the
//! converter of the matching record type. Codes that belong to the protocol
//! but have no converter here are `NotImplemented`; codes outside the
//! protocol are `UnknownVariant`.

use std::fmt;
use std::os::raw::c_char;

use dxfeed_graal_sys::*;
use scopeguard::{ScopeGuard, guard};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GraalError, GraalResult, MarshalError};
use crate::marshal::{NativeMarshal, PartialConversion, list, string};

mod candle;
mod greeks;
mod order;
mod profile;
mod quote;
mod series;
mod summary;
mod theo_price;
mod time_and_sale;
mod trade;
mod underlying;

pub use candle::Candle;
pub use greeks::Greeks;
pub use order::Order;
pub use profile::Profile;
pub use quote::Quote;
pub use series::Series;
pub use summary::Summary;
pub use theo_price::TheoPrice;
pub use time_and_sale::TimeAndSale;
pub use trade::{Trade, TradeEth};
pub use underlying::Underlying;

macro_rules! event_kinds {
    ($($variant:ident = $code:ident => $name:literal, $supported:literal;)*) => {
        /// Every event class defined by the native protocol.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum EventKind {
            $($variant),*
        }

        impl EventKind {
            pub const ALL: &'static [EventKind] = &[$(Self::$variant),*];

            /// Map a native class code. Codes outside the protocol are
            /// `UnknownVariant`.
            pub fn from_code(code: dxfg_event_clazz_t) -> GraalResult<Self> {
                match code {
                    $($code => Ok(Self::$variant),)*
                    value => Err(MarshalError::UnknownVariant {
                        kind: "event type",
                        value,
                    }
                    .into()),
                }
            }

            /// Native class code
            pub fn code(self) -> dxfg_event_clazz_t {
                match self {
                    $(Self::$variant => $code,)*
                }
            }

            /// Java simple class name
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }

            /// Whether events of this kind can be converted by this binding
            pub fn is_supported(self) -> bool {
                match self {
                    $(Self::$variant => $supported,)*
                }
            }
        }
    };
}

event_kinds! {
    Quote = DXFG_EVENT_QUOTE => "Quote", true;
    Profile = DXFG_EVENT_PROFILE => "Profile", true;
    Summary = DXFG_EVENT_SUMMARY => "Summary", true;
    Greeks = DXFG_EVENT_GREEKS => "Greeks", true;
    Candle = DXFG_EVENT_CANDLE => "Candle", true;
    DailyCandle = DXFG_EVENT_DAILY_CANDLE => "DailyCandle", false;
    Underlying = DXFG_EVENT_UNDERLYING => "Underlying", true;
    TheoPrice = DXFG_EVENT_THEO_PRICE => "TheoPrice", true;
    Trade = DXFG_EVENT_TRADE => "Trade", true;
    TradeEth = DXFG_EVENT_TRADE_ETH => "TradeETH", true;
    Configuration = DXFG_EVENT_CONFIGURATION => "Configuration", false;
    Message = DXFG_EVENT_MESSAGE => "Message", false;
    TimeAndSale = DXFG_EVENT_TIME_AND_SALE => "TimeAndSale", true;
    OrderBase = DXFG_EVENT_ORDER_BASE => "OrderBase", false;
    Order = DXFG_EVENT_ORDER => "Order", true;
    AnalyticOrder = DXFG_EVENT_ANALYTIC_ORDER => "AnalyticOrder", false;
    OtcMarketsOrder = DXFG_EVENT_OTC_MARKETS_ORDER => "OtcMarketsOrder", false;
    SpreadOrder = DXFG_EVENT_SPREAD_ORDER => "SpreadOrder", false;
    Series = DXFG_EVENT_SERIES => "Series", true;
    OptionSale = DXFG_EVENT_OPTION_SALE => "OptionSale", false;
    TextMessage = DXFG_EVENT_TEXT_MESSAGE => "TextMessage", false;
}

impl EventKind {
    /// Fail with `NotImplemented` for kinds without a converter
    pub fn ensure_supported(self) -> GraalResult<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(MarshalError::NotImplemented {
                kind: "event type",
                name: self.name(),
            }
            .into())
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Event class codes cross the boundary as boxed `c_int` elements of a
/// `dxfg_event_clazz_list_t`.
impl NativeMarshal for EventKind {
    type Native = dxfg_event_clazz_t;

    fn to_native(&self) -> GraalResult<*mut dxfg_event_clazz_t> {
        if !self.is_supported() {
            return Err(GraalError::invalid_argument(format!(
                "event type {} has no native record mapping",
                self.name()
            )));
        }
        Ok(Box::into_raw(Box::new(self.code())))
    }

    unsafe fn from_native(native: *const dxfg_event_clazz_t) -> GraalResult<Self> {
        if native.is_null() {
            return Err(MarshalError::malformed("event type", "null pointer").into());
        }
        // SAFETY: non-null per check above
        Self::from_code(unsafe { *native })
    }

    unsafe fn release_native(native: *mut dxfg_event_clazz_t) {
        if !native.is_null() {
            // SAFETY: allocated by to_native
            drop(unsafe { Box::from_raw(native) });
        }
    }
}

/// Converter between one event struct and its native record.
///
/// `encode` fills a record by value, allocating its strings; `release_strings`
/// frees exactly those strings. Numeric and packed fields are copied
/// verbatim in both directions.
pub(crate) trait EventRecord: Sized {
    const KIND: EventKind;
    type Record;

    fn encode(&self) -> GraalResult<Self::Record>;

    /// # Safety
    /// String fields of `record` must be null or NUL-terminated.
    unsafe fn decode(record: &Self::Record) -> GraalResult<Self>;

    /// # Safety
    /// `record` must come from `encode`.
    unsafe fn release_strings(record: &Self::Record);
}

fn encode_boxed<E: EventRecord>(event: &E) -> GraalResult<*mut dxfg_event_type_t> {
    Ok(Box::into_raw(Box::new(event.encode()?)).cast())
}

/// # Safety
/// `native` must point to a valid record of `E::Record`.
unsafe fn decode_boxed<E: EventRecord>(native: *const dxfg_event_type_t) -> GraalResult<E> {
    // SAFETY: the discriminator selected E
    unsafe { E::decode(&*native.cast::<E::Record>()) }
}

/// # Safety
/// `native` must come from `encode_boxed::<E>`.
unsafe fn release_boxed<E: EventRecord>(native: *mut dxfg_event_type_t) {
    // SAFETY: boxed by encode_boxed with this record type
    let record = unsafe { Box::from_raw(native.cast::<E::Record>()) };
    // SAFETY: record came from E::encode
    unsafe { E::release_strings(&record) };
}

/// Build the shared market event header; the symbol is allocated.
pub(crate) fn encode_header(
    kind: EventKind,
    event_symbol: &str,
    event_time: i64,
) -> GraalResult<dxfg_market_event_t> {
    Ok(dxfg_market_event_t {
        event_type: dxfg_event_type_t { clazz: kind.code() },
        event_symbol: string::to_native(event_symbol)?,
        event_time,
    })
}

/// Free the header's symbol unless the header is moved into a record
pub(crate) fn guard_header(
    header: dxfg_market_event_t,
) -> ScopeGuard<dxfg_market_event_t, impl FnOnce(dxfg_market_event_t)> {
    guard(header, |header| {
        // SAFETY: the symbol came from string::to_native in encode_header
        unsafe { release_string(header.event_symbol) }
    })
}

/// Free a fresh string unless it is moved into a record
pub(crate) fn guard_string(ptr: *mut c_char) -> ScopeGuard<*mut c_char, impl FnOnce(*mut c_char)> {
    guard(ptr, |ptr| {
        // SAFETY: ptr came from string::to_native and was not handed out
        unsafe { string::release_native(ptr) }
    })
}

/// # Safety
/// `event_symbol` must be null or NUL-terminated.
pub(crate) unsafe fn decode_symbol(event_symbol: *const c_char) -> GraalResult<String> {
    // SAFETY: per caller contract
    unsafe { string::from_native(event_symbol) }
}

/// # Safety
/// `ptr` must be null or come from `string::to_native`.
pub(crate) unsafe fn release_string(ptr: *const c_char) {
    // SAFETY: per caller contract
    unsafe { string::release_native(ptr.cast_mut()) }
}

macro_rules! market_events {
    ($($variant:ident),* $(,)?) => {
        /// A market event of any supported kind.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "eventType")]
        pub enum MarketEvent {
            $($variant($variant)),*
        }

        impl MarketEvent {
            /// Kind of this event
            pub fn kind(&self) -> EventKind {
                match self {
                    $(Self::$variant(_) => <$variant as EventRecord>::KIND,)*
                }
            }

            /// Symbol the event belongs to
            pub fn event_symbol(&self) -> &str {
                match self {
                    $(Self::$variant(e) => &e.event_symbol,)*
                }
            }

            /// Event time in milliseconds since the epoch, 0 if unset
            pub fn event_time(&self) -> i64 {
                match self {
                    $(Self::$variant(e) => e.event_time,)*
                }
            }

            fn encode(&self) -> GraalResult<*mut dxfg_event_type_t> {
                match self {
                    $(Self::$variant(e) => encode_boxed(e),)*
                }
            }

            /// # Safety
            /// `native` must point to a valid event record.
            unsafe fn decode(native: *const dxfg_event_type_t) -> GraalResult<Self> {
                // SAFETY: every record starts with the discriminator
                let kind = EventKind::from_code(unsafe { (*native).clazz })?;
                $(
                    if kind == <$variant as EventRecord>::KIND {
                        // SAFETY: discriminator matched this record type
                        return unsafe { decode_boxed::<$variant>(native) }.map(Self::$variant);
                    }
                )*
                Err(MarshalError::NotImplemented {
                    kind: "event type",
                    name: kind.name(),
                }
                .into())
            }

            /// # Safety
            /// `native` must come from `MarketEvent::encode`.
            unsafe fn release(native: *mut dxfg_event_type_t) {
                // SAFETY: every record starts with the discriminator
                let code = unsafe { (*native).clazz };
                $(
                    if code == <$variant as EventRecord>::KIND.code() {
                        // SAFETY: encoded with this record type
                        unsafe { release_boxed::<$variant>(native) };
                        return;
                    }
                )*
                warn!(code, "Leaking event record with unsupported discriminator");
            }
        }

        $(
            impl From<$variant> for MarketEvent {
                fn from(event: $variant) -> Self {
                    Self::$variant(event)
                }
            }
        )*
    };
}

market_events!(
    Quote,
    Trade,
    TradeEth,
    TimeAndSale,
    Profile,
    Summary,
    Greeks,
    Series,
    Order,
    Candle,
    Underlying,
    TheoPrice,
);

impl MarketEvent {
    /// Serialize the event as JSON
    pub fn to_json(&self) -> GraalResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl NativeMarshal for MarketEvent {
    type Native = dxfg_event_type_t;

    fn to_native(&self) -> GraalResult<*mut dxfg_event_type_t> {
        self.encode()
    }

    unsafe fn from_native(native: *const dxfg_event_type_t) -> GraalResult<Self> {
        if native.is_null() {
            return Err(MarshalError::malformed("event", "null pointer").into());
        }
        // SAFETY: non-null, valid per trait contract
        unsafe { Self::decode(native) }
    }

    unsafe fn release_native(native: *mut dxfg_event_type_t) {
        if !native.is_null() {
            // SAFETY: per trait contract
            unsafe { Self::release(native) }
        }
    }
}

/// Allocate a native event list; free it with [`release_native_list`].
pub fn to_native_list(events: &[MarketEvent]) -> GraalResult<*mut dxfg_event_type_list> {
    list::to_native(events)
}

/// Free a list produced by [`to_native_list`].
///
/// # Safety
/// `native` must be null or come from [`to_native_list`].
pub unsafe fn release_native_list(native: *mut dxfg_event_type_list) {
    // SAFETY: per caller contract
    unsafe { list::release_native::<MarketEvent>(native) }
}

/// Convert a native event list, preserving order.
///
/// # Safety
/// `native` must point to a valid event list.
pub unsafe fn from_native_list(native: *const dxfg_event_type_list) -> GraalResult<Vec<MarketEvent>> {
    // SAFETY: per caller contract
    unsafe { list::from_native(native) }
}

/// Convert a native event list, keeping the events converted before the
/// first failure.
///
/// # Safety
/// `native` must point to a valid event list.
pub unsafe fn from_native_list_partial(
    native: *const dxfg_event_type_list,
) -> PartialConversion<MarketEvent> {
    // SAFETY: per caller contract
    unsafe { list::from_native_partial(native) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::NativeBox;

    fn quote() -> Quote {
        Quote {
            event_symbol: "AAPL".into(),
            event_time: 1_700_000_000_123,
            time_millis_sequence: 7,
            bid_price: 189.5,
            bid_size: 300.0,
            ask_price: 189.6,
            ask_size: 200.0,
            bid_exchange_code: b'Q' as i16,
            ask_exchange_code: b'N' as i16,
            ..Default::default()
        }
    }

    fn trade() -> Trade {
        Trade {
            event_symbol: "AAPL".into(),
            price: 189.55,
            size: 100.0,
            time_sequence: (1_700_000_000i64 << 32) | 42,
            flags: 0x0400_0004,
            ..Default::default()
        }
    }

    fn time_and_sale() -> TimeAndSale {
        TimeAndSale {
            event_symbol: "AAPL".into(),
            index: (1_700_000_000i64 << 32) | 9,
            price: 189.57,
            size: 50.0,
            exchange_sale_conditions: Some("@T".into()),
            buyer: Some("BUYER".into()),
            seller: None,
            ..Default::default()
        }
    }

    #[test]
    fn test_heterogeneous_list_preserves_order_and_types() {
        let events = vec![
            MarketEvent::from(quote()),
            MarketEvent::from(trade()),
            MarketEvent::from(time_and_sale()),
        ];
        let native = NativeBox::new(&events).unwrap();
        assert_eq!(unsafe { (*native.as_ptr()).size }, 3);

        let back = unsafe { from_native_list(native.as_ptr()) }.unwrap();
        assert_eq!(back.len(), 3);
        assert!(matches!(back[0], MarketEvent::Quote(_)));
        assert!(matches!(back[1], MarketEvent::Trade(_)));
        assert!(matches!(back[2], MarketEvent::TimeAndSale(_)));
        assert_eq!(back, events);
    }

    #[test]
    fn test_packed_fields_pass_through() {
        let event = MarketEvent::from(trade());
        let native = NativeBox::new(&event).unwrap();
        let record = unsafe { &*native.as_ptr().cast::<dxfg_trade_t>() };
        assert_eq!(record.trade_base.time_sequence, (1_700_000_000i64 << 32) | 42);
        assert_eq!(record.trade_base.flags, 0x0400_0004);
        assert_eq!(record.trade_base.market_event.event_type.clazz, DXFG_EVENT_TRADE);
    }

    #[test]
    fn test_unknown_and_unsupported_codes() {
        let unknown = dxfg_event_type_t { clazz: 99 };
        let err = unsafe { MarketEvent::from_native(&unknown) }.unwrap_err();
        assert_eq!(err.error_type(), "UnknownVariant");

        let message = dxfg_event_type_t {
            clazz: DXFG_EVENT_MESSAGE,
        };
        let err = unsafe { MarketEvent::from_native(&message) }.unwrap_err();
        assert!(matches!(
            err,
            GraalError::Marshal(MarshalError::NotImplemented {
                name: "Message",
                ..
            })
        ));
    }

    #[test]
    fn test_partial_list_conversion() {
        let good = MarketEvent::from(quote()).to_native().unwrap();
        let mut bad = dxfg_event_type_t {
            clazz: DXFG_EVENT_OPTION_SALE,
        };
        let mut elements = [good, &mut bad as *mut _];
        let native = dxfg_event_type_list {
            size: 2,
            elements: elements.as_mut_ptr(),
        };

        let partial = unsafe { from_native_list_partial(&native) };
        assert_eq!(partial.converted.len(), 1);
        assert_eq!(partial.converted[0].kind(), EventKind::Quote);
        assert_eq!(partial.error.as_ref().map(GraalError::error_type), Some("NotImplemented"));

        unsafe { MarketEvent::release_native(good) };
    }

    #[test]
    fn test_event_kind_codes() {
        assert_eq!(EventKind::ALL.len(), 21);
        for (code, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.code(), code as i32);
            assert_eq!(EventKind::from_code(code as i32).unwrap(), *kind);
        }
        assert!(EventKind::from_code(21).is_err());
        assert!(EventKind::from_code(-1).is_err());
    }

    #[test]
    fn test_unsupported_kind_rejected_on_encode() {
        let err = EventKind::TextMessage.to_native().unwrap_err();
        assert!(matches!(err, GraalError::InvalidArgument(_)));
        assert!(err.to_string().contains("TextMessage"));
        assert!(EventKind::Greeks.ensure_supported().is_ok());
        assert!(EventKind::SpreadOrder.ensure_supported().is_err());
    }

    #[test]
    fn test_accessors_and_json() {
        let event = MarketEvent::from(quote());
        assert_eq!(event.kind(), EventKind::Quote);
        assert_eq!(event.event_symbol(), "AAPL");
        assert_eq!(event.event_time(), 1_700_000_000_123);

        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["eventType"], "Quote");
        assert_eq!(json["eventSymbol"], "AAPL");
    }
}
