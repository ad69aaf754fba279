//! Market State Store
//!
//! Owned, concurrently-readable registry of the current market state:
//! securities by native symbol, order books by native symbol and the latest
//! session clock.
//!
//! # Design
//!
//! Per-key invariants (the deletion flag never being cleared, one side of a
//! depth row never disturbing the other) are upheld through
//! get-or-create-then-merge on a single map entry. The entry's shard lock is
//! held for the duration of the merge closure, so merges for the same key are
//! serialized while different keys proceed in parallel. Last writer wins.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use super::depth::{DepthLevel, Quote, SecurityDepth, Side};
use super::security::Security;
use super::session::BistTime;

/// Concurrent state store shared by every decoder worker.
#[derive(Debug, Default)]
pub struct MarketStateStore {
    securities: DashMap<String, Security>,
    quotes: DashMap<String, Quote>,
    session_time: RwLock<Option<BistTime>>,
}

impl MarketStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Securities
    // =========================================================================

    /// Look up or create the security for `org_security`, then merge into it.
    ///
    /// Returns whatever `merge` returns. Do not call back into the store's
    /// security map from inside `merge`.
    pub fn merge_security<R>(&self, org_security: &str, merge: impl FnOnce(&mut Security) -> R) -> R {
        let mut entry = self
            .securities
            .entry(org_security.to_string())
            .or_insert_with(|| Security::new(org_security));
        merge(entry.value_mut())
    }

    /// Look up or create, merge, and return a snapshot of the merged record.
    pub fn upsert_security(
        &self,
        org_security: &str,
        merge: impl FnOnce(&mut Security),
    ) -> Security {
        self.merge_security(org_security, |security| {
            merge(security);
            security.clone()
        })
    }

    /// Snapshot of a security by native symbol.
    #[must_use]
    pub fn security(&self, org_security: &str) -> Option<Security> {
        self.securities.get(org_security).map(|s| s.value().clone())
    }

    /// Book size announced for a security by its create message or
    /// reference row.
    #[must_use]
    pub fn security_depth_size(&self, org_security: &str) -> Option<u32> {
        self.securities
            .get(org_security)
            .and_then(|s| s.value().depth_size)
    }

    /// Whether a security is known.
    #[must_use]
    pub fn contains_security(&self, org_security: &str) -> bool {
        self.securities.contains_key(org_security)
    }

    /// Number of known securities, deleted ones included.
    #[must_use]
    pub fn security_count(&self) -> usize {
        self.securities.len()
    }

    /// Snapshot of every security, ordered by native symbol.
    #[must_use]
    pub fn securities_snapshot(&self) -> Vec<Security> {
        let mut all: Vec<Security> = self.securities.iter().map(|s| s.value().clone()).collect();
        all.sort_by(|a, b| a.org_security.cmp(&b.org_security));
        all
    }

    /// Clear the intraday statistics of every security.
    ///
    /// The only path that clears numeric attributes. Returns the number of
    /// securities touched.
    pub fn reset_intraday(&self) -> usize {
        let mut touched = 0;
        for mut entry in self.securities.iter_mut() {
            entry.value_mut().reset_intraday();
            touched += 1;
        }
        touched
    }

    // =========================================================================
    // Order Books
    // =========================================================================

    /// Apply one side update to one depth row.
    ///
    /// The book is created on first use with `depth_size()` rows. Returns a
    /// snapshot of the updated row.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_depth(
        &self,
        org_security: &str,
        depth_size: impl FnOnce() -> u32,
        row_index: u32,
        side: Side,
        level: DepthLevel,
        stream_time: &str,
        now: DateTime<Utc>,
    ) -> SecurityDepth {
        let mut quote = self
            .quotes
            .entry(org_security.to_string())
            .or_insert_with(|| Quote::new(org_security, depth_size()));
        quote.apply(row_index, side, level, stream_time, now)
    }

    /// Snapshot of a security's order book.
    #[must_use]
    pub fn quote(&self, org_security: &str) -> Option<Quote> {
        self.quotes.get(org_security).map(|q| q.value().clone())
    }

    /// Snapshot of one order-book row.
    #[must_use]
    pub fn depth_row(&self, org_security: &str, row_index: u32) -> Option<SecurityDepth> {
        self.quotes
            .get(org_security)
            .and_then(|q| q.row(row_index).cloned())
    }

    /// Number of order books.
    #[must_use]
    pub fn quote_count(&self) -> usize {
        self.quotes.len()
    }

    // =========================================================================
    // Session Time
    // =========================================================================

    /// Replace the session clock.
    pub fn set_session_time(&self, time: BistTime) {
        *self.session_time.write() = Some(time);
    }

    /// Latest session clock, if one has been received.
    #[must_use]
    pub fn session_time(&self) -> Option<BistTime> {
        self.session_time.read().clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
