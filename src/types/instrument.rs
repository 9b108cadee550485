//! Instrument descriptors and the master contract types they are built from.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{FeedError, Result};
use crate::types::enums::{DerivativeKind, Exchange};

// ---------------------------------------------------------------------------
// Master contract entry
// ---------------------------------------------------------------------------

/// A JSON field the master contract encodes either as a number or a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumOrString {
    Num(f64),
    Str(String),
}

impl NumOrString {
    fn as_u32(&self, field: &str) -> Result<u32> {
        let parsed = match self {
            Self::Num(n) => Some(*n),
            Self::Str(s) => s.trim().parse::<f64>().ok(),
        };
        parsed
            .filter(|n| n.is_finite() && *n >= 0.0 && *n <= f64::from(u32::MAX))
            .map(|n| n as u32)
            .ok_or_else(|| FeedError::InvalidArgument(format!("invalid {field}: {self:?}")))
    }
}

/// One tradable contract as returned by the master contract endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractEntry {
    pub trading_symbol: String,
    /// Display symbol, e.g. `"BANKNIFTY JUL 34800.0 CE"` or `"Nifty 50"`.
    pub symbol: String,
    #[serde(default, rename = "lotSize")]
    pub lot_size: Option<NumOrString>,
    /// Expiry as epoch seconds.
    #[serde(default)]
    pub expiry: Option<i64>,
    pub exchange_code: u8,
    pub exchange: String,
    pub code: NumOrString,
}

// ---------------------------------------------------------------------------
// Instrument
// ---------------------------------------------------------------------------

/// Immutable descriptor of a tradable contract or index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Instrument {
    pub trading_symbol: String,
    /// Display symbol; its first token is the underlying.
    pub symbol: String,
    /// Broker-assigned instrument code (unique key).
    pub code: u32,
    pub exchange_code: u8,
    pub exchange: String,
    pub lot_size: Option<u32>,
    pub expiry: Option<NaiveDate>,
    pub kind: DerivativeKind,
    /// Strike price; only set for calls and puts.
    pub strike: Option<u32>,
}

impl Instrument {
    /// Build an index or equity instrument.
    ///
    /// The exchange name is derived from the code; unknown codes leave it
    /// empty.
    pub fn spot(symbol: impl Into<String>, code: u32, exchange_code: u8) -> Self {
        let symbol = symbol.into();
        Self {
            trading_symbol: symbol.clone(),
            symbol,
            code,
            exchange_code,
            exchange: Exchange::from_code(exchange_code)
                .map(|e| e.as_str().to_owned())
                .unwrap_or_default(),
            lot_size: None,
            expiry: None,
            kind: DerivativeKind::Spot,
            strike: None,
        }
    }

    /// Derive an instrument from a master contract entry.
    ///
    /// The last token of `symbol` selects the kind; for options the token
    /// before it is the strike, written as a float.
    pub fn from_contract(entry: &ContractEntry) -> Result<Self> {
        let code = entry.code.as_u32("code")?;
        let lot_size = entry
            .lot_size
            .as_ref()
            .map(|l| l.as_u32("lotSize"))
            .transpose()?;
        let expiry = entry
            .expiry
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.date_naive());

        let parts: Vec<&str> = entry.symbol.split_whitespace().collect();
        let kind = parts
            .last()
            .map_or(DerivativeKind::Spot, |s| DerivativeKind::from_symbol_suffix(s));
        let strike = if kind.is_option() {
            let raw = parts
                .len()
                .checked_sub(2)
                .and_then(|i| parts.get(i))
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| {
                    FeedError::InvalidArgument(format!("no strike in symbol {:?}", entry.symbol))
                })?;
            Some(raw as u32)
        } else {
            None
        };

        Ok(Self {
            trading_symbol: entry.trading_symbol.clone(),
            symbol: entry.symbol.clone(),
            code,
            exchange_code: entry.exchange_code,
            exchange: entry.exchange.clone(),
            lot_size,
            expiry,
            kind,
            strike,
        })
    }

    /// The underlying, i.e. the first token of the symbol.
    pub fn underlying(&self) -> &str {
        self.symbol.split_whitespace().next().unwrap_or("")
    }

    /// The `(exchange_code, instrument_code)` pair used in feed requests.
    pub fn feed_key(&self) -> (u8, u32) {
        (self.exchange_code, self.code)
    }
}

// ---------------------------------------------------------------------------
// Instrument book
// ---------------------------------------------------------------------------

/// Read-only lookup tables over a directory snapshot.
#[derive(Debug, Clone, Default)]
pub struct InstrumentBook {
    instruments: Vec<Arc<Instrument>>,
    by_code: HashMap<u32, Arc<Instrument>>,
    by_symbol: HashMap<String, Arc<Instrument>>,
}

impl InstrumentBook {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        let instruments: Vec<Arc<Instrument>> = instruments.into_iter().map(Arc::new).collect();
        let by_code = instruments
            .iter()
            .map(|i| (i.code, Arc::clone(i)))
            .collect();
        let by_symbol = instruments
            .iter()
            .map(|i| (i.symbol.clone(), Arc::clone(i)))
            .collect();
        Self {
            instruments,
            by_code,
            by_symbol,
        }
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Instrument>> {
        self.instruments.iter()
    }

    pub fn by_code(&self, code: u32) -> Option<&Arc<Instrument>> {
        self.by_code.get(&code)
    }

    /// Look up by exact display symbol (e.g. `"Nifty Bank"`).
    pub fn by_symbol(&self, symbol: &str) -> Option<&Arc<Instrument>> {
        self.by_symbol.get(symbol)
    }

    /// An index instrument by its display name.
    pub fn index(&self, name: &str) -> Option<&Arc<Instrument>> {
        self.by_symbol(name)
            .filter(|i| i.kind == DerivativeKind::Spot)
    }

    /// The call or put of `underlying` at `strike` expiring on `expiry`.
    pub fn option(
        &self,
        underlying: &str,
        strike: u32,
        expiry: NaiveDate,
        kind: DerivativeKind,
    ) -> Option<&Arc<Instrument>> {
        self.instruments.iter().find(|i| {
            i.kind == kind
                && i.strike == Some(strike)
                && i.expiry == Some(expiry)
                && i.underlying() == underlying
        })
    }

    /// The future of `underlying` expiring on `expiry`.
    pub fn future(&self, underlying: &str, expiry: NaiveDate) -> Option<&Arc<Instrument>> {
        self.instruments.iter().find(|i| {
            i.kind == DerivativeKind::Future
                && i.expiry == Some(expiry)
                && i.underlying() == underlying
        })
    }
}
