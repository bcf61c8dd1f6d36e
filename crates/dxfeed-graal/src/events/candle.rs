//! Candles are the one record without the market event header: the symbol
//! and time follow the discriminator directly, with event flags in between.

use dxfeed_graal_sys::{dxfg_candle_t, dxfg_event_type_t};
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, release_string};
use crate::marshal::string;

/// OHLCV bar of a candle symbol such as `AAPL{=1m}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub event_symbol: String,
    pub event_time: i64,
    pub event_flags: i32,
    pub index: i64,
    pub count: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub vwap: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
    pub imp_volatility: f64,
    pub open_interest: f64,
}

impl EventRecord for Candle {
    const KIND: EventKind = EventKind::Candle;
    type Record = dxfg_candle_t;

    fn encode(&self) -> GraalResult<dxfg_candle_t> {
        Ok(dxfg_candle_t {
            event_type: dxfg_event_type_t {
                clazz: Self::KIND.code(),
            },
            event_symbol: string::to_native(&self.event_symbol)?,
            event_flags: self.event_flags,
            event_time: self.event_time,
            index: self.index,
            count: self.count,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            vwap: self.vwap,
            bid_volume: self.bid_volume,
            ask_volume: self.ask_volume,
            imp_volatility: self.imp_volatility,
            open_interest: self.open_interest,
        })
    }

    unsafe fn decode(record: &dxfg_candle_t) -> GraalResult<Self> {
        Ok(Self {
            // SAFETY: per trait contract
            event_symbol: unsafe { decode_symbol(record.event_symbol) }?,
            event_time: record.event_time,
            event_flags: record.event_flags,
            index: record.index,
            count: record.count,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
            vwap: record.vwap,
            bid_volume: record.bid_volume,
            ask_volume: record.ask_volume,
            imp_volatility: record.imp_volatility,
            open_interest: record.open_interest,
        })
    }

    unsafe fn release_strings(record: &dxfg_candle_t) {
        // SAFETY: allocated by encode
        unsafe { release_string(record.event_symbol) };
    }
}
