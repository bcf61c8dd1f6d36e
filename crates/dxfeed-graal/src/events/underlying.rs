use dxfeed_graal_sys::dxfg_underlying_t;
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, encode_header, release_string};

/// Implied volatility and option volume of an underlying.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Underlying {
    pub event_symbol: String,
    pub event_time: i64,
    pub event_flags: i32,
    pub index: i64,
    pub volatility: f64,
    pub front_volatility: f64,
    pub back_volatility: f64,
    pub call_volume: f64,
    pub put_volume: f64,
    pub put_call_ratio: f64,
}

impl EventRecord for Underlying {
    const KIND: EventKind = EventKind::Underlying;
    type Record = dxfg_underlying_t;

    fn encode(&self) -> GraalResult<dxfg_underlying_t> {
        Ok(dxfg_underlying_t {
            market_event: encode_header(Self::KIND, &self.event_symbol, self.event_time)?,
            event_flags: self.event_flags,
            index: self.index,
            volatility: self.volatility,
            front_volatility: self.front_volatility,
            back_volatility: self.back_volatility,
            call_volume: self.call_volume,
            put_volume: self.put_volume,
            put_call_ratio: self.put_call_ratio,
        })
    }

    unsafe fn decode(record: &dxfg_underlying_t) -> GraalResult<Self> {
        Ok(Self {
            // SAFETY: per trait contract
            event_symbol: unsafe { decode_symbol(record.market_event.event_symbol) }?,
            event_time: record.market_event.event_time,
            event_flags: record.event_flags,
            index: record.index,
            volatility: record.volatility,
            front_volatility: record.front_volatility,
            back_volatility: record.back_volatility,
            call_volume: record.call_volume,
            put_volume: record.put_volume,
            put_call_ratio: record.put_call_ratio,
        })
    }

    unsafe fn release_strings(record: &dxfg_underlying_t) {
        // SAFETY: allocated by encode
        unsafe { release_string(record.market_event.event_symbol) };
    }
}
