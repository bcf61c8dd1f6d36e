use dxfeed_graal_sys::dxfg_series_t;
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, encode_header, release_string};

/// Properties of an option series for one expiration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub event_symbol: String,
    pub event_time: i64,
    pub event_flags: i32,
    pub index: i64,
    pub time_sequence: i64,
    /// Day id of expiration
    pub expiration: i32,
    pub volatility: f64,
    pub call_volume: f64,
    pub put_volume: f64,
    pub put_call_ratio: f64,
    pub forward_price: f64,
    pub dividend: f64,
    pub interest: f64,
}

impl EventRecord for Series {
    const KIND: EventKind = EventKind::Series;
    type Record = dxfg_series_t;

    fn encode(&self) -> GraalResult<dxfg_series_t> {
        Ok(dxfg_series_t {
            market_event: encode_header(Self::KIND, &self.event_symbol, self.event_time)?,
            event_flags: self.event_flags,
            index: self.index,
            time_sequence: self.time_sequence,
            expiration: self.expiration,
            volatility: self.volatility,
            call_volume: self.call_volume,
            put_volume: self.put_volume,
            put_call_ratio: self.put_call_ratio,
            forward_price: self.forward_price,
            dividend: self.dividend,
            interest: self.interest,
        })
    }

    unsafe fn decode(record: &dxfg_series_t) -> GraalResult<Self> {
        Ok(Self {
            // SAFETY: per trait contract
            event_symbol: unsafe { decode_symbol(record.market_event.event_symbol) }?,
            event_time: record.market_event.event_time,
            event_flags: record.event_flags,
            index: record.index,
            time_sequence: record.time_sequence,
            expiration: record.expiration,
            volatility: record.volatility,
            call_volume: record.call_volume,
            put_volume: record.put_volume,
            put_call_ratio: record.put_call_ratio,
            forward_price: record.forward_price,
            dividend: record.dividend,
            interest: record.interest,
        })
    }

    unsafe fn release_strings(record: &dxfg_series_t) {
        // SAFETY: allocated by encode
        unsafe { release_string(record.market_event.event_symbol) };
    }
}
