//! WebSocket market feed.
//!
//! The ANT feed endpoint streams market data as **binary frames** and takes
//! JSON control messages on the same socket.
//!
//! ## [`packet`]: Frame decoder
//!
//! Pure functions that classify a frame by its leading kind byte and decode
//! the two tick-carrying kinds:
//!
//! - **Full market data**: LTP, best bid/ask, OHLC, 52-week range (86 bytes)
//! - **Compact market data**: LTP, change, volume (22 bytes)
//!
//! ## [`subscription`]: Subscription tracker
//!
//! Computes which instruments actually need a subscribe or unsubscribe
//! message.
//!
//! ## [`connection`]: Connection manager
//!
//! Owns the socket: token-authenticated connect, heartbeat, reconnect with a
//! fixed backoff and dispatch of decoded ticks into the
//! [`OptionChain`](crate::option_chain::OptionChain).

pub mod connection;
pub mod packet;
pub mod subscription;
