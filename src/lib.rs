//! # ant-feed
//!
//! Live market-data feed for index options on the ANT (Alice Blue)
//! trading platform.
//!
//! The crate keeps one WebSocket session to the feed endpoint, decodes the
//! binary market-data frames it streams and stores the latest tick of every
//! subscribed instrument in a concurrent [`OptionChain`] that strategies
//! query at any time.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ant_feed::api::contracts::MasterContractDirectory;
//! use ant_feed::client::AntClient;
//! use ant_feed::feed::FeedSystemBuilder;
//! use ant_feed::provider::StaticToken;
//!
//! #[tokio::main]
//! async fn main() -> ant_feed::error::Result<()> {
//!     let client = AntClient::new("your-access-token")?;
//!     let feed = FeedSystemBuilder::new(
//!         StaticToken::new("your-access-token"),
//!         MasterContractDirectory::new(client),
//!     )
//!     .build();
//!
//!     feed.start().await?;
//!     // feed.subscribe(..), feed.query(..), feed.index_quote(..)
//!     feed.stop().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod constants;
pub mod error;
pub mod feed;
pub mod option_chain;
pub mod provider;
pub mod selection;
pub mod types;
pub mod ws;

/// Re-export the REST client at crate root for convenience.
pub use client::AntClient;
/// Re-export the error type and Result alias.
pub use error::{FeedError, Result};
pub use feed::{FeedSystem, FeedSystemBuilder};
pub use option_chain::OptionChain;
