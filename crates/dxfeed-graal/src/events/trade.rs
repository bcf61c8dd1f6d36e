//! Last trade events. `Trade` covers regular trading hours and `TradeEth`
//! extended trading hours; both share the trade base record.

use dxfeed_graal_sys::{dxfg_trade_base_t, dxfg_trade_eth_t, dxfg_trade_t};
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, encode_header, release_string};

macro_rules! trade_event {
    ($(#[$meta:meta])* $name:ident, $record:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub struct $name {
            pub event_symbol: String,
            pub event_time: i64,
            /// Packed seconds, milliseconds and sequence
            pub time_sequence: i64,
            pub time_nano_part: i32,
            pub exchange_code: i16,
            pub price: f64,
            pub change: f64,
            pub size: f64,
            pub day_id: i32,
            pub day_volume: f64,
            pub day_turnover: f64,
            /// Packed tick direction and trading-hours flags
            pub flags: i32,
        }

        impl EventRecord for $name {
            const KIND: EventKind = $kind;
            type Record = $record;

            fn encode(&self) -> GraalResult<$record> {
                Ok($record {
                    trade_base: dxfg_trade_base_t {
                        market_event: encode_header(Self::KIND, &self.event_symbol, self.event_time)?,
                        time_sequence: self.time_sequence,
                        time_nano_part: self.time_nano_part,
                        exchange_code: self.exchange_code,
                        price: self.price,
                        change: self.change,
                        size: self.size,
                        day_id: self.day_id,
                        day_volume: self.day_volume,
                        day_turnover: self.day_turnover,
                        flags: self.flags,
                    },
                })
            }

            unsafe fn decode(record: &$record) -> GraalResult<Self> {
                let base = &record.trade_base;
                Ok(Self {
                    // SAFETY: per trait contract
                    event_symbol: unsafe { decode_symbol(base.market_event.event_symbol) }?,
                    event_time: base.market_event.event_time,
                    time_sequence: base.time_sequence,
                    time_nano_part: base.time_nano_part,
                    exchange_code: base.exchange_code,
                    price: base.price,
                    change: base.change,
                    size: base.size,
                    day_id: base.day_id,
                    day_volume: base.day_volume,
                    day_turnover: base.day_turnover,
                    flags: base.flags,
                })
            }

            unsafe fn release_strings(record: &$record) {
                // SAFETY: allocated by encode
                unsafe { release_string(record.trade_base.market_event.event_symbol) };
            }
        }
    };
}

trade_event!(
    /// Last trade during regular trading hours
    Trade,
    dxfg_trade_t,
    EventKind::Trade
);

trade_event!(
    /// Last trade during extended trading hours
    TradeEth,
    dxfg_trade_eth_t,
    EventKind::TradeEth
);
