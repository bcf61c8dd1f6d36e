use dxfeed_graal_sys::dxfg_theo_price_t;
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, encode_header, release_string};

/// Theoretical option price computed by a pricing model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TheoPrice {
    pub event_symbol: String,
    pub event_time: i64,
    pub event_flags: i32,
    pub index: i64,
    pub price: f64,
    pub underlying_price: f64,
    pub delta: f64,
    pub gamma: f64,
    pub dividend: f64,
    pub interest: f64,
}

impl EventRecord for TheoPrice {
    const KIND: EventKind = EventKind::TheoPrice;
    type Record = dxfg_theo_price_t;

    fn encode(&self) -> GraalResult<dxfg_theo_price_t> {
        Ok(dxfg_theo_price_t {
            market_event: encode_header(Self::KIND, &self.event_symbol, self.event_time)?,
            event_flags: self.event_flags,
            index: self.index,
            price: self.price,
            underlying_price: self.underlying_price,
            delta: self.delta,
            gamma: self.gamma,
            dividend: self.dividend,
            interest: self.interest,
        })
    }

    unsafe fn decode(record: &dxfg_theo_price_t) -> GraalResult<Self> {
        Ok(Self {
            // SAFETY: per trait contract
            event_symbol: unsafe { decode_symbol(record.market_event.event_symbol) }?,
            event_time: record.market_event.event_time,
            event_flags: record.event_flags,
            index: record.index,
            price: record.price,
            underlying_price: record.underlying_price,
            delta: record.delta,
            gamma: record.gamma,
            dividend: record.dividend,
            interest: record.interest,
        })
    }

    unsafe fn release_strings(record: &dxfg_theo_price_t) {
        // SAFETY: allocated by encode
        unsafe { release_string(record.market_event.event_symbol) };
    }
}
