use dxfeed_graal_sys::dxfg_quote_t;
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, encode_header, release_string};

/// Best bid and offer for a symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub event_symbol: String,
    pub event_time: i64,
    /// Packed milliseconds-of-time and sequence
    pub time_millis_sequence: i32,
    pub time_nano_part: i32,
    pub bid_time: i64,
    pub bid_exchange_code: i16,
    pub bid_price: f64,
    pub bid_size: f64,
    pub ask_time: i64,
    pub ask_exchange_code: i16,
    pub ask_price: f64,
    pub ask_size: f64,
}

impl EventRecord for Quote {
    const KIND: EventKind = EventKind::Quote;
    type Record = dxfg_quote_t;

    fn encode(&self) -> GraalResult<dxfg_quote_t> {
        Ok(dxfg_quote_t {
            market_event: encode_header(Self::KIND, &self.event_symbol, self.event_time)?,
            time_millis_sequence: self.time_millis_sequence,
            time_nano_part: self.time_nano_part,
            bid_time: self.bid_time,
            bid_exchange_code: self.bid_exchange_code,
            bid_price: self.bid_price,
            bid_size: self.bid_size,
            ask_time: self.ask_time,
            ask_exchange_code: self.ask_exchange_code,
            ask_price: self.ask_price,
            ask_size: self.ask_size,
        })
    }

    unsafe fn decode(record: &dxfg_quote_t) -> GraalResult<Self> {
        Ok(Self {
            // SAFETY: per trait contract
            event_symbol: unsafe { decode_symbol(record.market_event.event_symbol) }?,
            event_time: record.market_event.event_time,
            time_millis_sequence: record.time_millis_sequence,
            time_nano_part: record.time_nano_part,
            bid_time: record.bid_time,
            bid_exchange_code: record.bid_exchange_code,
            bid_price: record.bid_price,
            bid_size: record.bid_size,
            ask_time: record.ask_time,
            ask_exchange_code: record.ask_exchange_code,
            ask_price: record.ask_price,
            ask_size: record.ask_size,
        })
    }

    unsafe fn release_strings(record: &dxfg_quote_t) {
        // SAFETY: allocated by encode
        unsafe { release_string(record.market_event.event_symbol) };
    }
}
