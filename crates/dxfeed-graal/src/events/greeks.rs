use dxfeed_graal_sys::dxfg_greeks_t;
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, encode_header, release_string};

/// Option price sensitivities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Greeks {
    pub event_symbol: String,
    pub event_time: i64,
    pub event_flags: i32,
    pub index: i64,
    pub price: f64,
    pub volatility: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub rho: f64,
    pub vega: f64,
}

impl EventRecord for Greeks {
    const KIND: EventKind = EventKind::Greeks;
    type Record = dxfg_greeks_t;

    fn encode(&self) -> GraalResult<dxfg_greeks_t> {
        Ok(dxfg_greeks_t {
            market_event: encode_header(Self::KIND, &self.event_symbol, self.event_time)?,
            event_flags: self.event_flags,
            index: self.index,
            price: self.price,
            volatility: self.volatility,
            delta: self.delta,
            gamma: self.gamma,
            theta: self.theta,
            rho: self.rho,
            vega: self.vega,
        })
    }

    unsafe fn decode(record: &dxfg_greeks_t) -> GraalResult<Self> {
        Ok(Self {
            // SAFETY: per trait contract
            event_symbol: unsafe { decode_symbol(record.market_event.event_symbol) }?,
            event_time: record.market_event.event_time,
            event_flags: record.event_flags,
            index: record.index,
            price: record.price,
            volatility: record.volatility,
            delta: record.delta,
            gamma: record.gamma,
            theta: record.theta,
            rho: record.rho,
            vega: record.vega,
        })
    }

    unsafe fn release_strings(record: &dxfg_greeks_t) {
        // SAFETY: allocated by encode
        unsafe { release_string(record.market_event.event_symbol) };
    }
}
