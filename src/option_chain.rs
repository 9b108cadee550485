//! Live price cache keyed by instrument code.
//!
//! The feed's receive loop is the only writer; strategies read concurrently.
//! Entries are whole [`TickRecord`] values replaced under a per-shard lock,
//! so a reader sees either the previous record or the new one, never a mix.
//!
//! There is no timestamp check on update: the last frame applied wins, even
//! if a delayed frame carries an older exchange timestamp. Entries are never
//! evicted and may outlive their subscription; treat them as "last known".

use dashmap::DashMap;

use crate::error::{FeedError, Result};
use crate::types::instrument::Instrument;
use crate::types::tick::TickRecord;

/// Concurrent map from instrument code to its latest tick.
#[derive(Debug, Default)]
pub struct OptionChain {
    ticks: DashMap<u32, TickRecord>,
}

impl OptionChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for the record's instrument.
    pub fn update(&self, record: TickRecord) {
        self.ticks.insert(record.instrument_code(), record);
    }

    /// The latest tick for `instrument`.
    pub fn get(&self, instrument: &Instrument) -> Result<TickRecord> {
        self.get_by_code(instrument.code)
    }

    /// The latest tick for an instrument code.
    pub fn get_by_code(&self, code: u32) -> Result<TickRecord> {
        self.ticks
            .get(&code)
            .map(|entry| entry.value().clone())
            .ok_or(FeedError::NotFound { code })
    }

    pub fn contains(&self, code: u32) -> bool {
        self.ticks.contains_key(&code)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}
