//! Feed facade used by strategies.
//!
//! [`FeedSystem`] composes the connection, the subscription tracker and the
//! option chain behind a subscribe/unsubscribe/query interface. Build one
//! per process and share it (e.g. behind an `Arc`) with every strategy.
//!
//! # Quick Start
//!
//! ```no_run
//! use ant_feed::api::contracts::MasterContractDirectory;
//! use ant_feed::client::AntClient;
//! use ant_feed::constants::BANKNIFTY_INDEX;
//! use ant_feed::feed::FeedSystemBuilder;
//! use ant_feed::provider::StaticToken;
//!
//! # #[tokio::main]
//! # async fn main() -> ant_feed::error::Result<()> {
//! let client = AntClient::new("access-token")?;
//! let feed = FeedSystemBuilder::new(
//!     StaticToken::new("access-token"),
//!     MasterContractDirectory::new(client),
//! )
//! .reconnect_delay_ms(1_000)
//! .build();
//!
//! feed.start().await?;
//!
//! match feed.index_quote(BANKNIFTY_INDEX) {
//!     Ok(tick) => println!("Bank Nifty {}", tick.ltp().value()),
//!     Err(e) if e.is_not_found() => println!("no tick yet"),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::constants::{BANKNIFTY_INDEX, INDIA_VIX_INDEX, NIFTY_INDEX};
use crate::error::{FeedError, Result};
use crate::option_chain::OptionChain;
use crate::provider::{InstrumentDirectory, TokenProvider};
use crate::types::enums::FeedMode;
use crate::types::instrument::{Instrument, InstrumentBook};
use crate::types::tick::TickRecord;
use crate::ws::connection::{ConnectionConfig, FeedConnection};
use crate::ws::subscription::SubscriptionTracker;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`FeedSystem`].
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Socket settings, including the subscription mode.
    pub connection: ConnectionConfig,
    /// Upper bound on the wait for the first open session during
    /// [`FeedSystem::start`]. `None` waits indefinitely.
    pub open_timeout: Option<Duration>,
    /// Index instruments subscribed on start, by master-contract symbol.
    pub index_symbols: Vec<String>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            open_timeout: None,
            index_symbols: [NIFTY_INDEX, BANKNIFTY_INDEX, INDIA_VIX_INDEX]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`FeedSystem`] with custom configuration.
pub struct FeedSystemBuilder<A, D> {
    tokens: A,
    directory: D,
    config: FeedConfig,
}

impl<A: TokenProvider, D: InstrumentDirectory> FeedSystemBuilder<A, D> {
    pub fn new(tokens: A, directory: D) -> Self {
        Self {
            tokens,
            directory,
            config: FeedConfig::default(),
        }
    }

    /// Set the feed endpoint (without token). Default: the ANT endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.connection.url = url.into();
        self
    }

    /// Set the subscription mode. Default: compact market data.
    pub fn mode(mut self, mode: FeedMode) -> Self {
        self.config.connection.mode = mode;
        self
    }

    /// Set the reconnect delay in milliseconds. Default: 1,000.
    pub fn reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.config.connection.reconnect_delay = Duration::from_millis(ms);
        self
    }

    /// Set the heartbeat interval. Default: 5 seconds.
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.connection.heartbeat_interval = interval;
        self
    }

    /// Set how often `start` checks for an open session. Default: 10 ms.
    pub fn open_poll_interval(mut self, interval: Duration) -> Self {
        self.config.connection.open_poll_interval = interval;
        self
    }

    /// Bound the wait for the first open session. Default: unbounded.
    pub fn open_timeout(mut self, limit: Duration) -> Self {
        self.config.open_timeout = Some(limit);
        self
    }

    /// Replace the index symbols subscribed on start.
    pub fn index_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.index_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> FeedSystem<A, D> {
        FeedSystem::new(self.tokens, self.directory, self.config)
    }
}

// ---------------------------------------------------------------------------
// FeedSystem
// ---------------------------------------------------------------------------

/// The composed feed context: connection, subscriptions and price cache.
pub struct FeedSystem<A, D> {
    config: FeedConfig,
    tokens: Arc<A>,
    directory: D,
    chain: Arc<OptionChain>,
    subscriptions: Arc<SubscriptionTracker>,
    connection: FeedConnection<A>,
    started: Mutex<bool>,
    book: OnceLock<InstrumentBook>,
    indices: OnceLock<Vec<Arc<Instrument>>>,
}

/// Keep the cause of a failed startup step under the step's error kind.
fn startup_error(kind: fn(String) -> FeedError, e: FeedError) -> FeedError {
    match e {
        FeedError::Auth(_) | FeedError::Directory(_) => e,
        other => kind(other.to_string()),
    }
}

impl<A: TokenProvider, D: InstrumentDirectory> FeedSystem<A, D> {
    pub fn new(tokens: A, directory: D, config: FeedConfig) -> Self {
        let tokens = Arc::new(tokens);
        let chain = Arc::new(OptionChain::new());
        let subscriptions = Arc::new(SubscriptionTracker::new());
        let connection = FeedConnection::new(
            config.connection.clone(),
            Arc::clone(&tokens),
            Arc::clone(&chain),
            Arc::clone(&subscriptions),
        );

        Self {
            config,
            tokens,
            directory,
            chain,
            subscriptions,
            connection,
            started: Mutex::new(false),
            book: OnceLock::new(),
            indices: OnceLock::new(),
        }
    }

    /// Start the feed. Calls after the first successful start are no-ops.
    ///
    /// Fetches the token ([`FeedError::Auth`] on failure) and the instrument
    /// directory ([`FeedError::Directory`] on failure), starts the
    /// connection with heartbeats, waits for the first open session and
    /// subscribes the configured indices.
    pub async fn start(&self) -> Result<()> {
        let mut started = self.started.lock().await;
        if *started {
            return Ok(());
        }

        self.tokens
            .current_token()
            .await
            .map_err(|e| startup_error(FeedError::Auth, e))?;

        let instruments = self
            .directory
            .instruments()
            .await
            .map_err(|e| startup_error(FeedError::Directory, e))?;
        let book = InstrumentBook::new(instruments);
        let indices = self.resolve_indices(&book);
        let book = self.book.get_or_init(|| book);
        let indices = self.indices.get_or_init(|| indices);

        // A previous start may have timed out with the connection running.
        if !self.connection.is_started() {
            self.connection.start(true).await?;
        }
        self.connection.send_heartbeat();

        match self.config.open_timeout {
            Some(limit) => self.connection.wait_until_open_timeout(limit).await?,
            None => self.connection.wait_until_open().await?,
        }

        let subscribed = self.subscribe(indices.iter().map(Arc::as_ref)).await;
        *started = true;
        tracing::info!(
            instruments = book.len(),
            indices = subscribed,
            "Feed system started"
        );
        Ok(())
    }

    fn resolve_indices(&self, book: &InstrumentBook) -> Vec<Arc<Instrument>> {
        self.config
            .index_symbols
            .iter()
            .filter_map(|symbol| {
                let found = book.index(symbol).cloned();
                if found.is_none() {
                    tracing::warn!(%symbol, "Index not found in instrument directory");
                }
                found
            })
            .collect()
    }

    /// Subscribe instruments that are not subscribed yet.
    ///
    /// Returns how many were newly tracked. The request is dropped if the
    /// connection is not open at that moment; tracked instruments are sent
    /// again whenever a session opens.
    pub async fn subscribe<'a, I>(&self, instruments: I) -> usize
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        self.connection.subscribe(instruments).await
    }

    /// Unsubscribe instruments that are currently subscribed.
    ///
    /// Cached ticks of unsubscribed instruments stay in the option chain.
    pub async fn unsubscribe<'a, I>(&self, instruments: I) -> usize
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        self.connection.unsubscribe(instruments).await
    }

    /// The latest known tick for `instrument`, possibly stale.
    pub fn query(&self, instrument: &Instrument) -> Result<TickRecord> {
        self.chain.get(instrument)
    }

    /// The latest tick of one of the indices subscribed on start.
    pub fn index_quote(&self, symbol: &str) -> Result<TickRecord> {
        let index = self
            .indices
            .get()
            .and_then(|indices| indices.iter().find(|i| i.symbol == symbol))
            .ok_or_else(|| FeedError::InvalidArgument(format!("{symbol} is not a feed index")))?;
        self.query(index)
    }

    /// The directory snapshot taken on start.
    pub fn instruments(&self) -> Option<&InstrumentBook> {
        self.book.get()
    }

    /// Stop the connection and its background tasks.
    pub async fn stop(&self) {
        self.connection.stop().await;
    }

    pub fn option_chain(&self) -> &Arc<OptionChain> {
        &self.chain
    }

    pub fn subscriptions(&self) -> &Arc<SubscriptionTracker> {
        &self.subscriptions
    }

    pub fn connection(&self) -> &FeedConnection<A> {
        &self.connection
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }
}
