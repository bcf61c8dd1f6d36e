use dxfeed_graal_sys::{dxfg_order_base_t, dxfg_order_t};
use scopeguard::{ScopeGuard, guard};
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{EventKind, EventRecord, decode_symbol, encode_header, guard_header, release_string};
use crate::marshal::{IndexedEventSource, string};

/// One order in a price-level or order-level book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub event_symbol: String,
    pub event_time: i64,
    pub source: IndexedEventSource,
    pub event_flags: i32,
    /// Unique per source and symbol
    pub index: i64,
    pub time_sequence: i64,
    pub time_nano_part: i32,
    pub action_time: i64,
    pub order_id: i64,
    pub aux_order_id: i64,
    pub price: f64,
    pub size: f64,
    pub executed_size: f64,
    pub count: i64,
    /// Packed action, exchange, side and scope
    pub flags: i32,
    pub trade_id: i64,
    pub trade_price: f64,
    pub trade_size: f64,
    pub market_maker: Option<String>,
}

impl EventRecord for Order {
    const KIND: EventKind = EventKind::Order;
    type Record = dxfg_order_t;

    fn encode(&self) -> GraalResult<dxfg_order_t> {
        let header = guard_header(encode_header(Self::KIND, &self.event_symbol, self.event_time)?);
        let source = guard(self.source.write_record()?, |source| {
            // SAFETY: produced by write_record above
            unsafe { IndexedEventSource::release_record(&source) }
        });
        let market_maker = string::to_native_opt(self.market_maker.as_deref())?;

        Ok(dxfg_order_t {
            order_base: dxfg_order_base_t {
                market_event: ScopeGuard::into_inner(header),
                source: ScopeGuard::into_inner(source),
                event_flags: self.event_flags,
                index: self.index,
                time_sequence: self.time_sequence,
                time_nano_part: self.time_nano_part,
                action_time: self.action_time,
                order_id: self.order_id,
                aux_order_id: self.aux_order_id,
                price: self.price,
                size: self.size,
                executed_size: self.executed_size,
                count: self.count,
                flags: self.flags,
                trade_id: self.trade_id,
                trade_price: self.trade_price,
                trade_size: self.trade_size,
            },
            market_maker: market_maker.cast_const(),
        })
    }

    unsafe fn decode(record: &dxfg_order_t) -> GraalResult<Self> {
        let base = &record.order_base;
        // SAFETY: per trait contract
        unsafe {
            Ok(Self {
                event_symbol: decode_symbol(base.market_event.event_symbol)?,
                event_time: base.market_event.event_time,
                source: IndexedEventSource::read_record(&base.source)?,
                event_flags: base.event_flags,
                index: base.index,
                time_sequence: base.time_sequence,
                time_nano_part: base.time_nano_part,
                action_time: base.action_time,
                order_id: base.order_id,
                aux_order_id: base.aux_order_id,
                price: base.price,
                size: base.size,
                executed_size: base.executed_size,
                count: base.count,
                flags: base.flags,
                trade_id: base.trade_id,
                trade_price: base.trade_price,
                trade_size: base.trade_size,
                market_maker: string::from_native_opt(record.market_maker)?,
            })
        }
    }

    unsafe fn release_strings(record: &dxfg_order_t) {
        // SAFETY: allocated by encode
        unsafe {
            release_string(record.order_base.market_event.event_symbol);
            IndexedEventSource::release_record(&record.order_base.source);
            release_string(record.market_maker);
        }
    }
}
