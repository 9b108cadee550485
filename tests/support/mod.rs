//! Local market-feed server for connection tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http;

pub const WAIT: Duration = Duration::from_secs(5);

/// Compact tick for instrument 52242 on NFO, LTP 451.00.
pub const COMPACT_52242: [u8; 22] = [
    0x02, 0x02, 0x00, 0x00, 0xCC, 0x12, 0x00, 0x00, 0xB0, 0x2C, 0x00, 0x00, 0x1B, 0xC6, 0x60,
    0xD4, 0x57, 0x9E, 0x00, 0x00, 0x00, 0x05,
];

/// Compact tick for `code` on NFO.
pub fn compact_frame(code: u32) -> Vec<u8> {
    let mut frame = COMPACT_52242.to_vec();
    frame[2..6].copy_from_slice(&code.to_be_bytes());
    frame
}

/// One accepted client session.
pub struct ServerConn {
    pub ws: WebSocketStream<TcpStream>,
    /// Request URI of the handshake, query included.
    pub uri: String,
}

impl ServerConn {
    /// Next text message parsed as JSON, skipping control frames.
    pub async fn next_json(&mut self) -> serde_json::Value {
        tokio::time::timeout(WAIT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return serde_json::from_str(text.as_str()).expect("json request");
                    }
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {other:?}"),
                }
            }
        })
        .await
        .expect("timed out waiting for a request")
    }

    /// Every text message until none arrives for `quiet`.
    pub async fn drain_json(&mut self, quiet: Duration) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        loop {
            match tokio::time::timeout(quiet, self.ws.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => {
                    out.push(serde_json::from_str(text.as_str()).expect("json request"));
                }
                Ok(Some(Ok(_))) => continue,
                _ => return out,
            }
        }
    }

    /// Payload of the next ping frame.
    pub async fn next_ping(&mut self) -> Vec<u8> {
        tokio::time::timeout(WAIT, async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Ping(payload))) => return payload.to_vec(),
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {other:?}"),
                }
            }
        })
        .await
        .expect("timed out waiting for a ping")
    }

    pub async fn send_binary(&mut self, data: Vec<u8>) {
        self.ws
            .send(Message::Binary(data.into()))
            .await
            .expect("send frame");
    }
}

/// A listening server and the sessions it accepted.
pub struct MockFeed {
    pub url: String,
    pub sessions: mpsc::UnboundedReceiver<ServerConn>,
    /// Handshakes seen, accepted or not.
    pub attempts: Arc<AtomicUsize>,
}

impl MockFeed {
    /// Accept every handshake.
    pub async fn start() -> Self {
        Self::spawn(None, 0).await
    }

    /// Reject every handshake with `status`.
    pub async fn rejecting(status: u16) -> Self {
        Self::spawn(Some(status), usize::MAX).await
    }

    /// Reject the first `count` handshakes with `status`, accept the rest.
    pub async fn rejecting_first(status: u16, count: usize) -> Self {
        Self::spawn(Some(status), count).await
    }

    pub async fn next_session(&mut self) -> ServerConn {
        tokio::time::timeout(WAIT, self.sessions.recv())
            .await
            .expect("timed out waiting for a client")
            .expect("server stopped")
    }

    async fn spawn(reject: Option<u16>, reject_count: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (tx, sessions) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&attempts);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = counter.fetch_add(1, Ordering::SeqCst);
                let reject = reject.filter(|_| seen < reject_count);
                let mut uri = String::new();
                let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    uri = req.uri().to_string();
                    match reject {
                        Some(status) => Err(http::Response::builder()
                            .status(status)
                            .body(None)
                            .expect("error response")),
                        None => Ok(resp),
                    }
                };
                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };
                if tx.send(ServerConn { ws, uri }).is_err() {
                    break;
                }
            }
        });

        Self {
            url: format!("ws://{addr}/feed"),
            sessions,
            attempts,
        }
    }
}

/// Poll `check` until it holds or [`WAIT`] elapses.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
