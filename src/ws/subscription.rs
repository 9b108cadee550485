//! Subscription bookkeeping for the market feed.
//!
//! [`SubscriptionTracker`] remembers which instrument codes are subscribed
//! and turns a requested instrument list into the delta that actually has to
//! go over the wire. It performs no I/O.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::instrument::Instrument;

#[derive(Debug, Default)]
struct Subscriptions {
    /// Instrument code -> exchange code.
    active: HashMap<u32, u8>,
    /// Every code that has ever been subscribed.
    seen: HashSet<u32>,
}

/// Thread-safe set of subscribed instruments.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    inner: Mutex<Subscriptions>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscriptions> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add instruments that are not yet subscribed.
    ///
    /// Returns the `(exchange_code, instrument_code)` pairs that were added;
    /// already subscribed instruments are skipped.
    pub fn subscribe<'a, I>(&self, instruments: I) -> Vec<(u8, u32)>
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        let mut subs = self.lock();
        let mut added = Vec::new();
        for inst in instruments {
            if subs.active.contains_key(&inst.code) {
                continue;
            }
            subs.active.insert(inst.code, inst.exchange_code);
            subs.seen.insert(inst.code);
            added.push(inst.feed_key());
        }
        added
    }

    /// Remove instruments that are currently subscribed.
    ///
    /// Returns the pairs that were removed; unknown instruments are skipped.
    pub fn unsubscribe<'a, I>(&self, instruments: I) -> Vec<(u8, u32)>
    where
        I: IntoIterator<Item = &'a Instrument>,
    {
        let mut subs = self.lock();
        instruments
            .into_iter()
            .filter_map(|inst| {
                subs.active
                    .remove(&inst.code)
                    .map(|exchange_code| (exchange_code, inst.code))
            })
            .collect()
    }

    pub fn contains(&self, code: u32) -> bool {
        self.lock().active.contains_key(&code)
    }

    /// Whether `code` is subscribed now or was at some point.
    pub fn was_subscribed(&self, code: u32) -> bool {
        self.lock().seen.contains(&code)
    }

    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().active.is_empty()
    }

    /// All currently subscribed pairs, in no particular order.
    pub fn snapshot(&self) -> Vec<(u8, u32)> {
        self.lock()
            .active
            .iter()
            .map(|(&code, &exchange_code)| (exchange_code, code))
            .collect()
    }
}
