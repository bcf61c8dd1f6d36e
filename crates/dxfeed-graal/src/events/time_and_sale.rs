use dxfeed_graal_sys::dxfg_time_and_sale_t;
use scopeguard::ScopeGuard;
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{
    EventKind, EventRecord, decode_symbol, encode_header, guard_header, guard_string, release_string,
};
use crate::marshal::string;

/// A single trade or a change to a previously reported trade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAndSale {
    pub event_symbol: String,
    pub event_time: i64,
    pub event_flags: i32,
    /// Packed time and sequence; unique per symbol
    pub index: i64,
    pub time_nano_part: i32,
    pub exchange_code: i16,
    pub price: f64,
    pub size: f64,
    pub bid_price: f64,
    pub ask_price: f64,
    pub exchange_sale_conditions: Option<String>,
    /// Packed trade-through, aggressor side, spread leg and type bits
    pub flags: i32,
    pub buyer: Option<String>,
    pub seller: Option<String>,
}

impl EventRecord for TimeAndSale {
    const KIND: EventKind = EventKind::TimeAndSale;
    type Record = dxfg_time_and_sale_t;

    fn encode(&self) -> GraalResult<dxfg_time_and_sale_t> {
        let header = guard_header(encode_header(Self::KIND, &self.event_symbol, self.event_time)?);
        let conditions = guard_string(string::to_native_opt(self.exchange_sale_conditions.as_deref())?);
        let buyer = guard_string(string::to_native_opt(self.buyer.as_deref())?);
        let seller = string::to_native_opt(self.seller.as_deref())?;

        Ok(dxfg_time_and_sale_t {
            market_event: ScopeGuard::into_inner(header),
            event_flags: self.event_flags,
            index: self.index,
            time_nano_part: self.time_nano_part,
            exchange_code: self.exchange_code,
            price: self.price,
            size: self.size,
            bid_price: self.bid_price,
            ask_price: self.ask_price,
            exchange_sale_conditions: ScopeGuard::into_inner(conditions).cast_const(),
            flags: self.flags,
            buyer: ScopeGuard::into_inner(buyer).cast_const(),
            seller: seller.cast_const(),
        })
    }

    unsafe fn decode(record: &dxfg_time_and_sale_t) -> GraalResult<Self> {
        // SAFETY: per trait contract
        unsafe {
            Ok(Self {
                event_symbol: decode_symbol(record.market_event.event_symbol)?,
                event_time: record.market_event.event_time,
                event_flags: record.event_flags,
                index: record.index,
                time_nano_part: record.time_nano_part,
                exchange_code: record.exchange_code,
                price: record.price,
                size: record.size,
                bid_price: record.bid_price,
                ask_price: record.ask_price,
                exchange_sale_conditions: string::from_native_opt(record.exchange_sale_conditions)?,
                flags: record.flags,
                buyer: string::from_native_opt(record.buyer)?,
                seller: string::from_native_opt(record.seller)?,
            })
        }
    }

    unsafe fn release_strings(record: &dxfg_time_and_sale_t) {
        // SAFETY: allocated by encode
        unsafe {
            release_string(record.market_event.event_symbol);
            release_string(record.exchange_sale_conditions);
            release_string(record.buyer);
            release_string(record.seller);
        }
    }
}
