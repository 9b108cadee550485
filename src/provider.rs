//! Collaborator interfaces consumed by the feed.
//!
//! The feed does not log in and does not know where instruments come from.
//! It asks a [`TokenProvider`] for the access token on every connect and an
//! [`InstrumentDirectory`] for the instrument list once at startup.

use std::future::Future;
use std::sync::{PoisonError, RwLock};

use crate::error::{FeedError, Result};
use crate::types::instrument::Instrument;

/// Source of the bearer token embedded in the feed URL.
pub trait TokenProvider: Send + Sync + 'static {
    /// The token to use for the next connection.
    fn current_token(&self) -> impl Future<Output = Result<String>> + Send;

    /// Signal that the server rejected the last token.
    ///
    /// Providers that can log in again drop their cached token here. The
    /// connection keeps retrying either way.
    fn invalidate(&self) {}
}

/// Source of the instrument snapshot used at startup.
pub trait InstrumentDirectory: Send + Sync {
    fn instruments(&self) -> impl Future<Output = Result<Vec<Instrument>>> + Send;
}

/// A fixed token, e.g. read from the environment.
///
/// It cannot fetch a new token by itself, so a rejection is only logged and
/// the same token is offered again on the next connect. Swap in a fresh one
/// with [`set`](Self::set).
#[derive(Debug, Default)]
pub struct StaticToken {
    token: RwLock<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(token.into()),
        }
    }

    /// Replace the token (e.g. after a manual re-login).
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token.into();
    }
}

impl TokenProvider for StaticToken {
    async fn current_token(&self) -> Result<String> {
        let token = self.token.read().unwrap_or_else(PoisonError::into_inner);
        if token.is_empty() {
            return Err(FeedError::Auth("no access token available".into()));
        }
        Ok(token.clone())
    }

    fn invalidate(&self) {
        tracing::warn!("Access token rejected by the feed server, retrying with the same token");
    }
}

/// A fixed instrument list.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    instruments: Vec<Instrument>,
}

impl StaticDirectory {
    pub fn new(instruments: Vec<Instrument>) -> Self {
        Self { instruments }
    }
}

impl InstrumentDirectory for StaticDirectory {
    async fn instruments(&self) -> Result<Vec<Instrument>> {
        Ok(self.instruments.clone())
    }
}
