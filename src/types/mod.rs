//! Data types shared by the feed, the cache and the REST client.
//!
//! ## Organization
//!
//! - [`enums`]: Exchanges, derivative kinds, feed modes/actions, frame kinds
//! - [`instrument`]: Instruments, master contract entries, lookup book
//! - [`tick`]: Decoded tick records and price scaling
//!
//! All enums are re-exported at the module root via `pub use enums::*`.

pub mod enums;
pub mod instrument;
pub mod tick;

pub use enums::*;
pub use instrument::{Instrument, InstrumentBook};
pub use tick::{CompactTick, FullTick, Price, PriceScale, TickRecord};
