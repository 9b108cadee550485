//! Decoded tick records.
//!
//! Prices stay as the raw integers found on the wire and are converted to
//! decimals on access through [`Price::value`], so nothing is lost before
//! scaling. Timestamps stay as raw epoch seconds with `chrono` accessors.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{FINE_DIVISOR, PAISE_DIVISOR};

// ---------------------------------------------------------------------------
// Price scaling
// ---------------------------------------------------------------------------

/// Exchange-dependent divisor applied to raw wire prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PriceScale {
    /// Prices in paise: divide by 100.
    Paise,
    /// Prices in 1e-7 units: divide by 10,000,000.
    Fine,
}

impl PriceScale {
    /// Select the scale for an exchange code.
    pub fn for_exchange(exchange_code: u8) -> Self {
        match exchange_code {
            1 | 2 | 4 | 6 | 7 => Self::Paise,
            _ => Self::Fine,
        }
    }

    /// The divisor for this scale.
    pub fn divisor(self) -> f64 {
        match self {
            Self::Paise => PAISE_DIVISOR,
            Self::Fine => FINE_DIVISOR,
        }
    }

    /// Convert a raw wire integer to a decimal price.
    pub fn apply(self, raw: i64) -> f64 {
        raw as f64 / self.divisor()
    }
}

/// A wire price together with its scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Price {
    raw: i64,
    scale: PriceScale,
}

impl Price {
    pub fn new(raw: i64, scale: PriceScale) -> Self {
        Self { raw, scale }
    }

    /// The integer exactly as it appeared on the wire.
    pub fn raw(self) -> i64 {
        self.raw
    }

    pub fn scale(self) -> PriceScale {
        self.scale
    }

    /// The decimal price.
    pub fn value(self) -> f64 {
        self.scale.apply(self.raw)
    }
}

fn epoch_to_utc(secs: u32) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::from(secs), 0)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Full market-data snapshot (frame kind 1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullTick {
    pub exchange_code: u8,
    pub instrument_code: u32,
    /// Last traded price.
    pub ltp: Price,
    /// Last trade time (epoch seconds).
    pub last_trade_time: u32,
    pub last_trade_qty: u32,
    /// Cumulative traded volume for the day.
    pub volume: u32,
    pub best_bid_price: Price,
    pub best_bid_qty: u32,
    pub best_ask_price: Price,
    pub best_ask_qty: u32,
    pub total_buy_qty: u64,
    pub total_sell_qty: u64,
    /// Average traded price.
    pub atp: Price,
    /// Exchange timestamp (epoch seconds).
    pub exchange_timestamp: u32,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub yearly_high: Price,
    pub yearly_low: Price,
}

impl FullTick {
    pub fn last_trade_at(&self) -> Option<DateTime<Utc>> {
        epoch_to_utc(self.last_trade_time)
    }

    pub fn exchange_time(&self) -> Option<DateTime<Utc>> {
        epoch_to_utc(self.exchange_timestamp)
    }
}

/// Compact market-data snapshot (frame kind 2).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompactTick {
    pub exchange_code: u8,
    pub instrument_code: u32,
    /// Last traded price.
    pub ltp: Price,
    /// Change against the previous close. Signed on the wire.
    pub change: Price,
    /// Exchange timestamp (epoch seconds).
    pub exchange_timestamp: u32,
    /// Cumulative traded volume for the day.
    pub volume: u32,
}

impl CompactTick {
    pub fn exchange_time(&self) -> Option<DateTime<Utc>> {
        epoch_to_utc(self.exchange_timestamp)
    }
}

/// The latest known tick for an instrument, in whichever shape it arrived.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TickRecord {
    Full(FullTick),
    Compact(CompactTick),
}

impl TickRecord {
    /// The instrument this tick belongs to.
    pub fn instrument_code(&self) -> u32 {
        match self {
            Self::Full(t) => t.instrument_code,
            Self::Compact(t) => t.instrument_code,
        }
    }

    pub fn exchange_code(&self) -> u8 {
        match self {
            Self::Full(t) => t.exchange_code,
            Self::Compact(t) => t.exchange_code,
        }
    }

    /// Last traded price, present in both shapes.
    pub fn ltp(&self) -> Price {
        match self {
            Self::Full(t) => t.ltp,
            Self::Compact(t) => t.ltp,
        }
    }

    pub fn volume(&self) -> u32 {
        match self {
            Self::Full(t) => t.volume,
            Self::Compact(t) => t.volume,
        }
    }

    /// Exchange timestamp (epoch seconds).
    pub fn exchange_timestamp(&self) -> u32 {
        match self {
            Self::Full(t) => t.exchange_timestamp,
            Self::Compact(t) => t.exchange_timestamp,
        }
    }

    pub fn exchange_time(&self) -> Option<DateTime<Utc>> {
        epoch_to_utc(self.exchange_timestamp())
    }
}

impl From<FullTick> for TickRecord {
    fn from(t: FullTick) -> Self {
        Self::Full(t)
    }
}

impl From<CompactTick> for TickRecord {
    fn from(t: CompactTick) -> Self {
        Self::Compact(t)
    }
}
