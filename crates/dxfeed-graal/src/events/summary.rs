use dxfeed_graal_sys::dxfg_summary_t;
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, encode_header, release_string};

/// Daily open, high, low and close plus open interest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub event_symbol: String,
    pub event_time: i64,
    pub day_id: i32,
    pub day_open_price: f64,
    pub day_high_price: f64,
    pub day_low_price: f64,
    pub day_close_price: f64,
    pub prev_day_id: i32,
    pub prev_day_close_price: f64,
    pub prev_day_volume: f64,
    pub open_interest: i64,
    /// Packed close price types
    pub flags: i32,
}

impl EventRecord for Summary {
    const KIND: EventKind = EventKind::Summary;
    type Record = dxfg_summary_t;

    fn encode(&self) -> GraalResult<dxfg_summary_t> {
        Ok(dxfg_summary_t {
            market_event: encode_header(Self::KIND, &self.event_symbol, self.event_time)?,
            day_id: self.day_id,
            day_open_price: self.day_open_price,
            day_high_price: self.day_high_price,
            day_low_price: self.day_low_price,
            day_close_price: self.day_close_price,
            prev_day_id: self.prev_day_id,
            prev_day_close_price: self.prev_day_close_price,
            prev_day_volume: self.prev_day_volume,
            open_interest: self.open_interest,
            flags: self.flags,
        })
    }

    unsafe fn decode(record: &dxfg_summary_t) -> GraalResult<Self> {
        Ok(Self {
            // SAFETY: per trait contract
            event_symbol: unsafe { decode_symbol(record.market_event.event_symbol) }?,
            event_time: record.market_event.event_time,
            day_id: record.day_id,
            day_open_price: record.day_open_price,
            day_high_price: record.day_high_price,
            day_low_price: record.day_low_price,
            day_close_price: record.day_close_price,
            prev_day_id: record.prev_day_id,
            prev_day_close_price: record.prev_day_close_price,
            prev_day_volume: record.prev_day_volume,
            open_interest: record.open_interest,
            flags: record.flags,
        })
    }

    unsafe fn release_strings(record: &dxfg_summary_t) {
        // SAFETY: allocated by encode
        unsafe { release_string(record.market_event.event_symbol) };
    }
}
