//! Shared enum types that map directly to ANT API values.
//!
//! Exchange variants keep the upper-case names used by the master contract
//! and the numeric codes used on the binary feed.
#![allow(clippy::upper_case_acronyms)]

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// Exchange identifier used across the ANT API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// NSE equity and indices (code 1).
    NSE,
    /// NSE futures & options (code 2).
    NFO,
    /// NSE currency derivatives (code 3).
    CDS,
    /// MCX commodities (code 4).
    MCX,
    /// BSE equity (code 6).
    BSE,
    /// BSE futures & options (code 7).
    BFO,
}

impl Exchange {
    /// Returns the numeric exchange code used in feed requests and frames.
    pub fn code(self) -> u8 {
        match self {
            Self::NSE => 1,
            Self::NFO => 2,
            Self::CDS => 3,
            Self::MCX => 4,
            Self::BSE => 6,
            Self::BFO => 7,
        }
    }

    /// Construct from a numeric exchange code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::NSE),
            2 => Some(Self::NFO),
            3 => Some(Self::CDS),
            4 => Some(Self::MCX),
            6 => Some(Self::BSE),
            7 => Some(Self::BFO),
            _ => None,
        }
    }

    /// Name used by the master contract endpoint (`?exchanges=`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NSE => "NSE",
            Self::NFO => "NFO",
            Self::CDS => "CDS",
            Self::MCX => "MCX",
            Self::BSE => "BSE",
            Self::BFO => "BFO",
        }
    }
}

// ---------------------------------------------------------------------------
// Derivative kind
// ---------------------------------------------------------------------------

/// What kind of contract an instrument is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivativeKind {
    /// Call option (`CE`).
    Call,
    /// Put option (`PE`).
    Put,
    /// Future (`FUT`).
    Future,
    /// Index or equity; not a derivative.
    Spot,
}

impl DerivativeKind {
    /// Parse the trailing token of a master-contract symbol.
    pub fn from_symbol_suffix(suffix: &str) -> Self {
        match suffix {
            "CE" => Self::Call,
            "PE" => Self::Put,
            "FUT" => Self::Future,
            _ => Self::Spot,
        }
    }

    /// Whether this is a call or a put.
    pub fn is_option(self) -> bool {
        matches!(self, Self::Call | Self::Put)
    }
}

// ---------------------------------------------------------------------------
// Feed modes
// ---------------------------------------------------------------------------

/// Subscription mode carried in the `"m"` field of feed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    #[serde(rename = "marketdata")]
    MarketData,
    #[serde(rename = "compact_marketdata")]
    CompactMarketData,
    #[serde(rename = "snapquote")]
    SnapQuote,
    #[serde(rename = "full_snapquote")]
    FullSnapQuote,
    #[serde(rename = "spreaddata")]
    SpreadData,
    #[serde(rename = "spread_snapquote")]
    SpreadSnapQuote,
    Dpr,
    Oi,
    MarketStatus,
    ExchangeMessages,
}

impl FeedMode {
    /// The wire string for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarketData => "marketdata",
            Self::CompactMarketData => "compact_marketdata",
            Self::SnapQuote => "snapquote",
            Self::FullSnapQuote => "full_snapquote",
            Self::SpreadData => "spreaddata",
            Self::SpreadSnapQuote => "spread_snapquote",
            Self::Dpr => "dpr",
            Self::Oi => "oi",
            Self::MarketStatus => "market_status",
            Self::ExchangeMessages => "exchange_messages",
        }
    }
}

/// Action carried in the `"a"` field of feed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedAction {
    #[serde(rename = "subscribe")]
    Subscribe,
    #[serde(rename = "unsubscribe")]
    Unsubscribe,
    #[serde(rename = "h")]
    Heartbeat,
}

// ---------------------------------------------------------------------------
// Frame kinds
// ---------------------------------------------------------------------------

/// Kind tag found in the first byte of every binary feed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameKind {
    /// Full market data (tag 1).
    MarketData = 1,
    /// Compact market data (tag 2).
    CompactMarketData = 2,
    SnapQuote = 3,
    FullSnapQuote = 4,
    SpreadData = 5,
    SpreadSnapQuote = 6,
    /// Daily price band (tag 7).
    Dpr = 7,
    /// Open interest (tag 8).
    OpenInterest = 8,
    MarketStatus = 9,
    ExchangeMessages = 10,
}

impl FrameKind {
    /// Look up the kind for a tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        const KINDS: [FrameKind; 10] = [
            FrameKind::MarketData,
            FrameKind::CompactMarketData,
            FrameKind::SnapQuote,
            FrameKind::FullSnapQuote,
            FrameKind::SpreadData,
            FrameKind::SpreadSnapQuote,
            FrameKind::Dpr,
            FrameKind::OpenInterest,
            FrameKind::MarketStatus,
            FrameKind::ExchangeMessages,
        ];
        KINDS.get(usize::from(tag).checked_sub(1)?).copied()
    }

    /// Whether frames of this kind carry tick data.
    pub fn carries_ticks(self) -> bool {
        matches!(self, Self::MarketData | Self::CompactMarketData)
    }
}
