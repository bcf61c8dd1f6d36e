use dxfeed_graal_sys::dxfg_profile_t;
use scopeguard::ScopeGuard;
use serde::{Deserialize, Serialize};

use crate::error::GraalResult;
use crate::events::{
    EventKind, EventRecord, decode_symbol, encode_header, guard_header, guard_string, release_string,
};
use crate::marshal::string;

/// Instrument profile: description, trading status and limits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub event_symbol: String,
    pub event_time: i64,
    pub description: Option<String>,
    pub status_reason: Option<String>,
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
    /// Packed trading status and short sale restriction
    pub flags: i32,
}

impl EventRecord for Profile {
    const KIND: EventKind = EventKind::Profile;
    type Record = dxfg_profile_t;

    fn encode(&self) -> GraalResult<dxfg_profile_t> {
        let header = guard_header(encode_header(Self::KIND, &self.event_symbol, self.event_time)?);
        let description = guard_string(string::to_native_opt(self.description.as_deref())?);
        let status_reason = string::to_native_opt(self.status_reason.as_deref())?;

        Ok(dxfg_profile_t {
            market_event: ScopeGuard::into_inner(header),
            description: ScopeGuard::into_inner(description).cast_const(),
            status_reason: status_reason.cast_const(),
            halt_start_time: self.halt_start_time,
            halt_end_time: self.halt_end_time,
            high_limit_price: self.high_limit_price,
            low_limit_price: self.low_limit_price,
            high_52_week_price: self.high_52_week_price,
            low_52_week_price: self.low_52_week_price,
            beta: self.beta,
            earnings_per_share: self.earnings_per_share,
            dividend_frequency: self.dividend_frequency,
            ex_dividend_amount: self.ex_dividend_amount,
            ex_dividend_day_id: self.ex_dividend_day_id,
            shares: self.shares,
            free_float: self.free_float,
            flags: self.flags,
        })
    }

    unsafe fn decode(record: &dxfg_profile_t) -> GraalResult<Self> {
        // SAFETY: per trait contract
        unsafe {
            Ok(Self {
                event_symbol: decode_symbol(record.market_event.event_symbol)?,
                event_time: record.market_event.event_time,
                description: string::from_native_opt(record.description)?,
                status_reason: string::from_native_opt(record.status_reason)?,
                halt_start_time: record.halt_start_time,
                halt_end_time: record.halt_end_time,
                high_limit_price: record.high_limit_price,
                low_limit_price: record.low_limit_price,
                high_52_week_price: record.high_52_week_price,
                low_52_week_price: record.low_52_week_price,
                beta: record.beta,
                earnings_per_share: record.earnings_per_share,
                dividend_frequency: record.dividend_frequency,
                ex_dividend_amount: record.ex_dividend_amount,
                ex_dividend_day_id: record.ex_dividend_day_id,
                shares: record.shares,
                free_float: record.free_float,
                flags: record.flags,
            })
        }
    }

    unsafe fn release_strings(record: &dxfg_profile_t) {
        // SAFETY: allocated by encode
        unsafe {
            release_string(record.market_event.event_symbol);
            release_string(record.description);
            release_string(record.status_reason);
        }
    }
}
