//! Constants for the ANT API.
//!
//! Contains base URLs, the WebSocket endpoint, binary frame sizes and the
//! timing defaults used by the feed. These are used internally by
//! [`FeedSystem`](crate::feed::FeedSystem) and the WebSocket types, but are
//! also exported for advanced usage.

// ---------------------------------------------------------------------------
// Base URLs
// ---------------------------------------------------------------------------

/// Base URL for the ANT REST API.
pub const API_BASE_URL: &str = "https://ant.aliceblueonline.com";

/// Path of the master contract download. The `exchanges` query parameter
/// selects the exchange (e.g. `NSE`, `NFO`).
pub const MASTER_CONTRACT_PATH: &str = "/api/v2/contracts.json";

// ---------------------------------------------------------------------------
// WebSocket URLs
// ---------------------------------------------------------------------------

/// WebSocket endpoint for the live market feed (binary). The access token is
/// appended as the `access_token` query parameter on every connect.
pub const WS_MARKET_FEED_URL: &str = "wss://ant.aliceblueonline.com/hydrasocket/v2/websocket";

/// Query parameter carrying the access token on the feed URL.
pub const WS_TOKEN_PARAM: &str = "access_token";

// ---------------------------------------------------------------------------
// Binary frame layout
// ---------------------------------------------------------------------------

/// Fixed length of a full market-data frame, kind tag included.
pub const FULL_FRAME_LEN: usize = 86;

/// Fixed length of a compact market-data frame, kind tag included.
pub const COMPACT_FRAME_LEN: usize = 22;

/// Divisor for prices on exchanges quoted in paise (NSE, NFO, MCX, BSE, BFO).
pub const PAISE_DIVISOR: f64 = 100.0;

/// Divisor for prices on every other exchange (currency segments).
pub const FINE_DIVISOR: f64 = 10_000_000.0;

// ---------------------------------------------------------------------------
// Feed timing and limits
// ---------------------------------------------------------------------------

/// Feed timing and batching limits.
pub mod feed {
    /// Interval between heartbeat frames, in seconds.
    pub const HEARTBEAT_INTERVAL_SECS: u64 = 5;
    /// Delay before a reconnect attempt, in milliseconds.
    pub const RECONNECT_DELAY_MS: u64 = 1_000;
    /// Poll interval of `wait_until_open`, in milliseconds.
    pub const OPEN_POLL_INTERVAL_MS: u64 = 10;
    /// Maximum instruments per re-subscribe message after a reconnect.
    pub const MAX_INSTRUMENTS_PER_SUBSCRIBE: usize = 100;
}

// ---------------------------------------------------------------------------
// Index instruments
// ---------------------------------------------------------------------------

/// Master-contract symbol of the NIFTY 50 index.
pub const NIFTY_INDEX: &str = "Nifty 50";

/// Master-contract symbol of the NIFTY BANK index.
pub const BANKNIFTY_INDEX: &str = "Nifty Bank";

/// Master-contract symbol of the India VIX volatility index.
pub const INDIA_VIX_INDEX: &str = "India VIX";

/// Master-contract segment holding index instruments.
pub const SEGMENT_INDICES: &str = "NSE-IND";

/// Master-contract segment holding index options.
pub const SEGMENT_OPTIONS: &str = "NSE-OPT";

/// Master-contract segment holding index futures.
pub const SEGMENT_FUTURES: &str = "NSE-FUT";
