//! Streaming connection to the binary market feed.
//!
//! [`FeedConnection`] owns the socket lifecycle: it fetches a token, opens
//! the WebSocket, decodes binary frames into the [`OptionChain`], keeps the
//! session alive with heartbeats and reconnects after a fixed backoff
//! whenever the socket fails. Only [`stop`](FeedConnection::stop) ends it.
//!
//! ```text
//!   start()        handshake ok
//! Disconnected ──▶ Connecting ──▶ Open
//!      ▲               │            │ socket error / server close
//!      └─── backoff ◀──┴────────────┘
//!
//!   stop() from any state ──▶ Closing (terminal)
//! ```
//!
//! Requests written through [`send`](FeedConnection::send) are dropped
//! silently unless the connection is open; nothing is queued. Callers that
//! need a request delivered gate on
//! [`wait_until_open`](FeedConnection::wait_until_open) first. Subscriptions
//! tracked by the [`SubscriptionTracker`] are re-sent whenever a session
//! opens, so nothing tracked is lost across reconnects. Tracker changes made
//! through [`subscribe`](FeedConnection::subscribe) and
//! [`unsubscribe`](FeedConnection::unsubscribe) are written in the same
//! order they are applied, never interleaved with a re-subscribe.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Serialize, Serializer};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::constants::{WS_MARKET_FEED_URL, WS_TOKEN_PARAM, feed};
use crate::error::{FeedError, Result};
use crate::option_chain::OptionChain;
use crate::provider::TokenProvider;
use crate::types::enums::{FeedAction, FeedMode};
use crate::types::instrument::Instrument;
use crate::ws::packet::{Frame, parse_frame};
use crate::ws::subscription::SubscriptionTracker;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WriterHalf = SplitSink<WsStream, Message>;
type ReaderHalf = SplitStream<WsStream>;

// ---------------------------------------------------------------------------
// Control envelope
// ---------------------------------------------------------------------------

/// JSON control message sent over the feed socket:
/// `{"a": action, "v": [[exchange_code, instrument_code], ...], "m": mode}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedRequest {
    #[serde(rename = "a")]
    pub action: FeedAction,
    #[serde(rename = "v")]
    pub instruments: Vec<(u8, u32)>,
    /// `None` is written as an empty string (heartbeats).
    #[serde(rename = "m", serialize_with = "mode_or_empty")]
    pub mode: Option<FeedMode>,
}

fn mode_or_empty<S: Serializer>(mode: &Option<FeedMode>, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(mode.map_or("", FeedMode::as_str))
}

impl FeedRequest {
    pub fn subscribe(mode: FeedMode, instruments: Vec<(u8, u32)>) -> Self {
        Self {
            action: FeedAction::Subscribe,
            instruments,
            mode: Some(mode),
        }
    }

    pub fn unsubscribe(mode: FeedMode, instruments: Vec<(u8, u32)>) -> Self {
        Self {
            action: FeedAction::Unsubscribe,
            instruments,
            mode: Some(mode),
        }
    }

    /// `{"a":"h","v":[],"m":""}`
    pub fn heartbeat() -> Self {
        Self {
            action: FeedAction::Heartbeat,
            instruments: Vec::new(),
            mode: None,
        }
    }
}

// ---------------------------------------------------------------------------
// State and configuration
// ---------------------------------------------------------------------------

/// Lifecycle state of a [`FeedConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    /// Stop requested. Terminal.
    Closing,
}

/// Configuration for a [`FeedConnection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Feed endpoint without the token parameter.
    pub url: String,
    /// Mode used when re-sending tracked subscriptions.
    pub mode: FeedMode,
    /// Delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Interval between heartbeat frames.
    pub heartbeat_interval: Duration,
    /// Poll interval of [`FeedConnection::wait_until_open`].
    pub open_poll_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: WS_MARKET_FEED_URL.to_owned(),
            mode: FeedMode::CompactMarketData,
            reconnect_delay: Duration::from_millis(feed::RECONNECT_DELAY_MS),
            heartbeat_interval: Duration::from_secs(feed::HEARTBEAT_INTERVAL_SECS),
            open_poll_interval: Duration::from_millis(feed::OPEN_POLL_INTERVAL_MS),
        }
    }
}

/// Build the feed URL with `token` embedded as the access-token parameter.
pub fn feed_url(base: &str, token: &str) -> Result<Url> {
    let mut url = Url::parse(base)?;
    url.query_pairs_mut().append_pair(WS_TOKEN_PARAM, token);
    Ok(url)
}

/// Resolve once stop has been requested.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    // The guard returned by `wait_for` is not `Send`; drop it before returning.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

// ---------------------------------------------------------------------------
// FeedConnection
// ---------------------------------------------------------------------------

/// The write half of the current socket and the signal used to tear the
/// session down when a write fails.
struct Session {
    sink: WriterHalf,
    lost: Arc<Notify>,
}

struct Inner<T> {
    config: ConnectionConfig,
    tokens: Arc<T>,
    chain: Arc<OptionChain>,
    subscriptions: Arc<SubscriptionTracker>,
    state: watch::Sender<ConnectionState>,
    shutdown: watch::Sender<bool>,
    writer: Mutex<Option<Session>>,
    /// Held across a tracker change and the request that announces it.
    control: Mutex<()>,
    started: AtomicBool,
    heartbeat_started: AtomicBool,
    reconnects: AtomicU64,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

/// Market feed socket with auto-reconnect and heartbeat.
///
/// Cheap to clone; clones share the same socket and state.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use ant_feed::option_chain::OptionChain;
/// use ant_feed::provider::StaticToken;
/// use ant_feed::types::FeedMode;
/// use ant_feed::ws::connection::{ConnectionConfig, FeedConnection, FeedRequest};
/// use ant_feed::ws::subscription::SubscriptionTracker;
///
/// # #[tokio::main]
/// # async fn main() -> ant_feed::error::Result<()> {
/// let conn = FeedConnection::new(
///     ConnectionConfig::default(),
///     Arc::new(StaticToken::new("your-access-token")),
///     Arc::new(OptionChain::new()),
///     Arc::new(SubscriptionTracker::new()),
/// );
/// conn.start(true).await?;
/// conn.send_heartbeat();
/// conn.wait_until_open().await?;
/// conn.send(&FeedRequest::subscribe(FeedMode::CompactMarketData, vec![(1, 26000)]))
///     .await;
/// # Ok(())
/// # }
/// ```
pub struct FeedConnection<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for FeedConnection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: TokenProvider> FeedConnection<T> {
    pub fn new(
        config: ConnectionConfig,
        tokens: Arc<T>,
        chain: Arc<OptionChain>,
        subscriptions: Arc<SubscriptionTracker>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                config,
                tokens,
                chain,
                subscriptions,
                state,
                shutdown,
                writer: Mutex::new(None),
                control: Mutex::new(()),
                started: AtomicBool::new(false),
                heartbeat_started: AtomicBool::new(false),
                reconnects: AtomicU64::new(0),
                tasks: std::sync::Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start the connect/receive/reconnect loop.
    ///
    /// With `run_in_background` the loop is spawned on its own task and this
    /// returns as soon as the task exists, before the socket is open.
    /// Otherwise the loop runs on the caller's task until [`stop`](Self::stop).
    pub async fn start(&self, run_in_background: bool) -> Result<()> {
        if *self.inner.shutdown.borrow() {
            return Err(FeedError::Closed);
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(FeedError::InvalidArgument(
                "feed connection already started".into(),
            ));
        }

        let inner = Arc::clone(&self.inner);
        if run_in_background {
            let task = tokio::spawn(inner.run());
            self.inner.track(task);
            tracing::info!("Feed connection task spawned");
        } else {
            inner.run().await;
        }
        Ok(())
    }

    /// Write a control request if the connection is open.
    ///
    /// Returns `false` when the request was dropped, either because the
    /// connection is not open or because the write failed. A failed write
    /// is handled as a disconnect.
    pub async fn send(&self, request: &FeedRequest) -> bool {
        self.inner.send_request(request).await
    }

    /// Track instruments that are not subscribed yet and announce them.
    ///
    /// Returns how many were newly tracked. The request is dropped if the
    /// connection is not open; tracked instruments go out again whenever a
    /// session opens.
    pub async fn subscribe<'a, I>(&self, instruments: I) -> usize
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        let instruments: Vec<&Instrument> = instruments.into_iter().collect();
        let _control = self.inner.control.lock().await;
        let added = self.inner.subscriptions.subscribe(instruments);
        if added.is_empty() {
            return 0;
        }
        let count = added.len();
        let sent = self
            .inner
            .send_request(&FeedRequest::subscribe(self.inner.config.mode, added))
            .await;
        tracing::debug!(count, sent, "Subscribed instruments");
        count
    }

    /// Stop tracking instruments that are subscribed and announce it.
    pub async fn unsubscribe<'a, I>(&self, instruments: I) -> usize
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        let instruments: Vec<&Instrument> = instruments.into_iter().collect();
        let _control = self.inner.control.lock().await;
        let removed = self.inner.subscriptions.unsubscribe(instruments);
        if removed.is_empty() {
            return 0;
        }
        let count = removed.len();
        let sent = self
            .inner
            .send_request(&FeedRequest::unsubscribe(self.inner.config.mode, removed))
            .await;
        tracing::debug!(count, sent, "Unsubscribed instruments");
        count
    }

    /// Spawn the heartbeat task. Later calls are no-ops.
    pub fn send_heartbeat(&self) {
        if self.inner.heartbeat_started.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(inner.heartbeat_loop());
        self.inner.track(task);
    }

    /// Poll until the connection is open.
    ///
    /// Waits without bound; see [`wait_until_open_timeout`](Self::wait_until_open_timeout).
    /// Fails with [`FeedError::Closed`] if the connection is stopped.
    pub async fn wait_until_open(&self) -> Result<()> {
        loop {
            match self.state() {
                ConnectionState::Open => return Ok(()),
                ConnectionState::Closing => return Err(FeedError::Closed),
                _ => tokio::time::sleep(self.inner.config.open_poll_interval).await,
            }
        }
    }

    /// [`wait_until_open`](Self::wait_until_open) bounded by `limit`.
    pub async fn wait_until_open_timeout(&self, limit: Duration) -> Result<()> {
        tokio::time::timeout(limit, self.wait_until_open())
            .await
            .map_err(|_| FeedError::OpenTimeout(limit))?
    }

    /// Stop the connection for good.
    ///
    /// The receive and heartbeat loops exit at their next suspension point;
    /// this waits for the background tasks to finish.
    pub async fn stop(&self) {
        self.inner.shutdown.send_replace(true);
        self.inner.state.send_replace(ConnectionState::Closing);

        if let Some(mut session) = self.inner.writer.lock().await.take() {
            let _ = session.sink.send(Message::Close(None)).await;
        }

        let tasks: Vec<_> = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            let _ = task.await;
        }

        tracing::info!("Feed connection stopped");
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Number of successful re-connects since start.
    pub fn reconnect_count(&self) -> u64 {
        self.inner.reconnects.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }
}

// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

impl<T: TokenProvider> Inner<T> {
    fn track(&self, task: JoinHandle<()>) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(task);
    }

    /// Move to `next` unless the connection is already closing.
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|state| {
            if *state == ConnectionState::Closing || *state == next {
                return false;
            }
            tracing::debug!(from = ?state, to = ?next, "Feed state change");
            *state = next;
            true
        });
    }

    fn is_open(&self) -> bool {
        *self.state.borrow() == ConnectionState::Open
    }

    /// Connect, receive until the socket fails, back off, repeat.
    async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut opened_before = false;

        loop {
            if *shutdown.borrow() {
                break;
            }
            self.set_state(ConnectionState::Connecting);

            let attempt = tokio::select! {
                attempt = self.connect() => attempt,
                _ = stop_requested(&mut shutdown) => break,
            };

            match attempt {
                Ok((read, lost)) => {
                    self.set_state(ConnectionState::Open);
                    if opened_before {
                        self.reconnects.fetch_add(1, Ordering::Relaxed);
                    }
                    opened_before = true;
                    self.resubscribe().await;
                    self.receive(read, &lost, &mut shutdown).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Feed connection attempt failed");
                }
            }

            self.writer.lock().await.take();
            if *shutdown.borrow() {
                break;
            }
            self.set_state(ConnectionState::Disconnected);

            tracing::info!(
                delay_ms = self.config.reconnect_delay.as_millis() as u64,
                "Attempting reconnect..."
            );
            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
                _ = stop_requested(&mut shutdown) => break,
            }
        }

        self.set_state(ConnectionState::Closing);
        tracing::info!("Feed connection loop exited");
    }

    /// Fetch a token and open the socket. Stores the write half.
    async fn connect(&self) -> Result<(ReaderHalf, Arc<Notify>)> {
        let token = self.tokens.current_token().await?;
        let url = feed_url(&self.config.url, &token)?;

        let ws = match connect_async(url.as_str()).await {
            Ok((ws, _resp)) => ws,
            Err(tungstenite::Error::Http(resp)) if matches!(resp.status().as_u16(), 401 | 403) => {
                self.tokens.invalidate();
                return Err(FeedError::Auth(format!(
                    "feed handshake rejected with HTTP {}",
                    resp.status()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let (sink, read) = ws.split();
        let lost = Arc::new(Notify::new());
        *self.writer.lock().await = Some(Session {
            sink,
            lost: Arc::clone(&lost),
        });

        tracing::info!("Connected to market-feed WebSocket");
        Ok((read, lost))
    }

    /// Read frames until the socket fails, a write fails, or stop.
    async fn receive(
        &self,
        mut read: ReaderHalf,
        lost: &Notify,
        shutdown: &mut watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = stop_requested(shutdown) => return,
                _ = lost.notified() => {
                    tracing::warn!("Feed session lost after a failed write");
                    return;
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Binary(data))) => self.dispatch(&data),
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(text = %text.as_str(), "Received text on market feed");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Market-feed WebSocket closed by server");
                        return;
                    }
                    // Ping/pong handled by tungstenite
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Market-feed WebSocket error");
                        return;
                    }
                    None => {
                        tracing::info!("Market-feed WebSocket stream ended");
                        return;
                    }
                },
            }
        }
    }

    /// Decode one binary frame and apply it to the option chain.
    fn dispatch(&self, data: &[u8]) {
        match parse_frame(data) {
            Ok(Frame::Tick(record)) => {
                let code = record.instrument_code();
                if self.subscriptions.was_subscribed(code) {
                    self.chain.update(record);
                } else {
                    tracing::trace!(code, "Dropping tick for unsubscribed instrument");
                }
            }
            Ok(Frame::Other(kind)) => tracing::trace!(?kind, "Ignoring frame"),
            Err(e) => {
                tracing::warn!(error = %e, len = data.len(), "Failed to parse feed frame");
            }
        }
    }

    async fn send_request(&self, request: &FeedRequest) -> bool {
        if !self.is_open() {
            tracing::debug!(action = ?request.action, "Feed not open, dropping request");
            return false;
        }
        match serde_json::to_string(request) {
            Ok(json) => self.write(Message::Text(json.into())).await,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize feed request");
                false
            }
        }
    }

    /// Write one message on the current session. A failed write ends the
    /// session.
    async fn write(&self, msg: Message) -> bool {
        let mut guard = self.writer.lock().await;
        let Some(session) = guard.as_mut() else {
            return false;
        };
        match session.sink.send(msg).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "Market-feed write failed");
                session.lost.notify_one();
                *guard = None;
                false
            }
        }
    }

    /// Send every tracked subscription on a fresh session.
    async fn resubscribe(&self) {
        let _control = self.control.lock().await;
        let subs = self.subscriptions.snapshot();
        if subs.is_empty() {
            return;
        }
        for chunk in subs.chunks(feed::MAX_INSTRUMENTS_PER_SUBSCRIBE) {
            let req = FeedRequest::subscribe(self.config.mode, chunk.to_vec());
            if !self.send_request(&req).await {
                tracing::warn!("Re-subscribe interrupted");
                return;
            }
        }
        tracing::info!(count = subs.len(), "Re-subscribed tracked instruments");
    }

    async fn heartbeat_loop(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop_requested(&mut shutdown) => break,
                _ = ticker.tick() => {
                    if !self.is_open() {
                        continue;
                    }
                    match serde_json::to_vec(&FeedRequest::heartbeat()) {
                        Ok(payload) => {
                            self.write(Message::Ping(Bytes::from(payload))).await;
                        }
                        Err(e) => tracing::warn!(error = %e, "Failed to serialize heartbeat"),
                    }
                }
            }
        }
        tracing::debug!("Heartbeat task exited");
    }
}
