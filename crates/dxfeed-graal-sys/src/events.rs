//! Event record layouts.
//!
//! Every concrete record starts with `dxfg_event_type_t` so a pointer to any
//! of them can be read as a `dxfg_event_type_t` to obtain the discriminator.

use std::os::raw::{c_char, c_int};

use crate::{dxfg_indexed_event_source_t, dxfg_list};

pub type dxfg_event_clazz_t = c_int;
pub const DXFG_EVENT_QUOTE: dxfg_event_clazz_t = 0;
pub const DXFG_EVENT_PROFILE: dxfg_event_clazz_t = 1;
pub const DXFG_EVENT_SUMMARY: dxfg_event_clazz_t = 2;
pub const DXFG_EVENT_GREEKS: dxfg_event_clazz_t = 3;
pub const DXFG_EVENT_CANDLE: dxfg_event_clazz_t = 4;
pub const DXFG_EVENT_DAILY_CANDLE: dxfg_event_clazz_t = 5;
pub const DXFG_EVENT_UNDERLYING: dxfg_event_clazz_t = 6;
pub const DXFG_EVENT_THEO_PRICE: dxfg_event_clazz_t = 7;
pub const DXFG_EVENT_TRADE: dxfg_event_clazz_t = 8;
pub const DXFG_EVENT_TRADE_ETH: dxfg_event_clazz_t = 9;
pub const DXFG_EVENT_CONFIGURATION: dxfg_event_clazz_t = 10;
pub const DXFG_EVENT_MESSAGE: dxfg_event_clazz_t = 11;
pub const DXFG_EVENT_TIME_AND_SALE: dxfg_event_clazz_t = 12;
pub const DXFG_EVENT_ORDER_BASE: dxfg_event_clazz_t = 13;
pub const DXFG_EVENT_ORDER: dxfg_event_clazz_t = 14;
pub const DXFG_EVENT_ANALYTIC_ORDER: dxfg_event_clazz_t = 15;
pub const DXFG_EVENT_OTC_MARKETS_ORDER: dxfg_event_clazz_t = 16;
pub const DXFG_EVENT_SPREAD_ORDER: dxfg_event_clazz_t = 17;
pub const DXFG_EVENT_SERIES: dxfg_event_clazz_t = 18;
pub const DXFG_EVENT_OPTION_SALE: dxfg_event_clazz_t = 19;
pub const DXFG_EVENT_TEXT_MESSAGE: dxfg_event_clazz_t = 20;

pub type dxfg_event_clazz_list_t = dxfg_list<dxfg_event_clazz_t>;

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_event_type_t {
    pub clazz: dxfg_event_clazz_t,
}

pub type dxfg_event_type_list = dxfg_list<dxfg_event_type_t>;

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_market_event_t {
    pub event_type: dxfg_event_type_t,
    pub event_symbol: *const c_char,
    pub event_time: i64,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_quote_t {
    pub market_event: dxfg_market_event_t,
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

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_profile_t {
    pub market_event: dxfg_market_event_t,
    pub description: *const c_char,
    pub status_reason: *const c_char,
    pub halt_start_time: i64,
    pub halt_end_time: i64,
    pub high_limit_price: f64,
    pub low_limit_price: f64,
    pub high_52_week_price: f64,
    pub low_52_week_price: f64,
    pub beta: f64,
    pub earnings_per_share: f64,
    pub dividend_frequency: f64,
    pub ex_dividend_amount: f64,
    pub ex_dividend_day_id: i32,
    pub shares: f64,
    pub free_float: f64,
    pub flags: i32,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_summary_t {
    pub market_event: dxfg_market_event_t,
    pub day_id: i32,
    pub day_open_price: f64,
    pub day_high_price: f64,
    pub day_low_price: f64,
    pub day_close_price: f64,
    pub prev_day_id: i32,
    pub prev_day_close_price: f64,
    pub prev_day_volume: f64,
    pub open_interest: i64,
    pub flags: i32,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_greeks_t {
    pub market_event: dxfg_market_event_t,
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

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_candle_t {
    pub event_type: dxfg_event_type_t,
    pub event_symbol: *const c_char,
    pub event_flags: i32,
    pub event_time: i64,
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

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_underlying_t {
    pub market_event: dxfg_market_event_t,
    pub event_flags: i32,
    pub index: i64,
    pub volatility: f64,
    pub front_volatility: f64,
    pub back_volatility: f64,
    pub call_volume: f64,
    pub put_volume: f64,
    pub put_call_ratio: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_theo_price_t {
    pub market_event: dxfg_market_event_t,
    pub event_flags: i32,
    pub index: i64,
    pub price: f64,
    pub underlying_price: f64,
    pub delta: f64,
    pub gamma: f64,
    pub dividend: f64,
    pub interest: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_trade_base_t {
    pub market_event: dxfg_market_event_t,
    pub time_sequence: i64,
    pub time_nano_part: i32,
    pub exchange_code: i16,
    pub price: f64,
    pub change: f64,
    pub size: f64,
    pub day_id: i32,
    pub day_volume: f64,
    pub day_turnover: f64,
    pub flags: i32,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_trade_t {
    pub trade_base: dxfg_trade_base_t,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_trade_eth_t {
    pub trade_base: dxfg_trade_base_t,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_time_and_sale_t {
    pub market_event: dxfg_market_event_t,
    pub event_flags: i32,
    pub index: i64,
    pub time_nano_part: i32,
    pub exchange_code: i16,
    pub price: f64,
    pub size: f64,
    pub bid_price: f64,
    pub ask_price: f64,
    pub exchange_sale_conditions: *const c_char,
    pub flags: i32,
    pub buyer: *const c_char,
    pub seller: *const c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_order_base_t {
    pub market_event: dxfg_market_event_t,
    /// Embedded by value, unlike the pointer held by indexed-event symbols.
    pub source: dxfg_indexed_event_source_t,
    pub event_flags: i32,
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
    pub flags: i32,
    pub trade_id: i64,
    pub trade_price: f64,
    pub trade_size: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_order_t {
    pub order_base: dxfg_order_base_t,
    pub market_maker: *const c_char,
}

#[repr(C)]
#[derive(Debug)]
pub struct dxfg_series_t {
    pub market_event: dxfg_market_event_t,
    pub event_flags: i32,
    pub index: i64,
    pub time_sequence: i64,
    pub expiration: i32,
    pub volatility: f64,
    pub call_volume: f64,
    pub put_volume: f64,
    pub put_call_ratio: f64,
    pub forward_price: f64,
    pub dividend: f64,
    pub interest: f64,
}
