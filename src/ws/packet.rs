//! Binary feed frame decoder.
//!
//! Every frame starts with a one-byte [`FrameKind`] tag. Full (tag 1) and
//! compact (tag 2) market-data frames follow with big-endian fields at fixed
//! offsets; the other eight kinds are recognised but not decoded.
//!
//! Full frame, 86 bytes:
//!
//! ```text
//!  0 kind          1 exchange      2 code          6 ltp
//! 10 ltt          14 ltq          18 volume       22 bid price
//! 26 bid qty      30 ask price    34 ask qty      38 total buy qty (u64)
//! 46 total sell qty (u64)         54 atp          58 exchange ts
//! 62 open         66 high         70 low          74 close
//! 78 52w high     82 52w low
//! ```
//!
//! Compact frame, 22 bytes:
//!
//! ```text
//!  0 kind   1 exchange   2 code   6 ltp   10 change (i32)   14 exchange ts   18 volume
//! ```
//!
//! Decoding is pure: length is validated, values are taken as-is.

use crate::constants::{COMPACT_FRAME_LEN, FULL_FRAME_LEN};
use crate::error::{FeedError, Result};
use crate::types::enums::FrameKind;
use crate::types::tick::{CompactTick, FullTick, Price, PriceScale, TickRecord};

/// A classified frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A decoded full or compact tick.
    Tick(TickRecord),
    /// A frame of a kind this crate does not decode.
    Other(FrameKind),
}

// ---------------------------------------------------------------------------
// Big-endian readers. Callers validate the frame length first.
// ---------------------------------------------------------------------------

#[inline(always)]
fn read_u32_be(data: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[inline(always)]
fn read_i32_be(data: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[inline(always)]
fn read_u64_be(data: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    u64::from_be_bytes(buf)
}

fn ensure_len(data: &[u8], need: usize, kind: FrameKind) -> Result<()> {
    if data.len() < need {
        return Err(FeedError::Format(format!(
            "{kind:?} frame too short: {} bytes (need {need})",
            data.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public decoding API
// ---------------------------------------------------------------------------

/// Read the kind tag of a frame.
pub fn classify(data: &[u8]) -> Result<FrameKind> {
    let tag = *data
        .first()
        .ok_or_else(|| FeedError::Format("empty frame".into()))?;
    FrameKind::from_tag(tag).ok_or_else(|| FeedError::Format(format!("unknown frame kind: {tag}")))
}

/// Decode a full market-data frame.
pub fn decode_full(data: &[u8]) -> Result<FullTick> {
    ensure_len(data, FULL_FRAME_LEN, FrameKind::MarketData)?;

    let exchange_code = data[1];
    let scale = PriceScale::for_exchange(exchange_code);
    let price = |at: usize| Price::new(i64::from(read_u32_be(data, at)), scale);

    Ok(FullTick {
        exchange_code,
        instrument_code: read_u32_be(data, 2),
        ltp: price(6),
        last_trade_time: read_u32_be(data, 10),
        last_trade_qty: read_u32_be(data, 14),
        volume: read_u32_be(data, 18),
        best_bid_price: price(22),
        best_bid_qty: read_u32_be(data, 26),
        best_ask_price: price(30),
        best_ask_qty: read_u32_be(data, 34),
        total_buy_qty: read_u64_be(data, 38),
        total_sell_qty: read_u64_be(data, 46),
        atp: price(54),
        exchange_timestamp: read_u32_be(data, 58),
        open: price(62),
        high: price(66),
        low: price(70),
        close: price(74),
        yearly_high: price(78),
        yearly_low: price(82),
    })
}

/// Decode a compact market-data frame.
pub fn decode_compact(data: &[u8]) -> Result<CompactTick> {
    ensure_len(data, COMPACT_FRAME_LEN, FrameKind::CompactMarketData)?;

    let exchange_code = data[1];
    let scale = PriceScale::for_exchange(exchange_code);

    Ok(CompactTick {
        exchange_code,
        instrument_code: read_u32_be(data, 2),
        ltp: Price::new(i64::from(read_u32_be(data, 6)), scale),
        change: Price::new(i64::from(read_i32_be(data, 10)), scale),
        exchange_timestamp: read_u32_be(data, 14),
        volume: read_u32_be(data, 18),
    })
}

/// Classify a frame and decode it when it carries tick data.
pub fn parse_frame(data: &[u8]) -> Result<Frame> {
    match classify(data)? {
        FrameKind::MarketData => Ok(Frame::Tick(decode_full(data)?.into())),
        FrameKind::CompactMarketData => Ok(Frame::Tick(decode_compact(data)?.into())),
        other => Ok(Frame::Other(other)),
    }
}
