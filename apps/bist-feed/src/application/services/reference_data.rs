//! Reference Data Loader
//!
//! Applies durable reference rows to the security registry using the same
//! get-or-create-then-merge path the live decoders use: the deletion flag is
//! only ever set, and a column that does not parse leaves its attribute at
//! the previous value.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::ports::{RowSourceError, SecurityRow, SecurityRowSource, SharedClock};
use crate::domain::depth::MAX_DEPTH_SIZE;
use crate::domain::market::MarketStateStore;
use crate::domain::reference::{Exchange, MarketSegment};
use crate::domain::security::{IndexMembership, Security, SecurityField};

/// Outcome of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Rows returned by the source.
    pub rows: usize,
    /// Rows merged into the registry.
    pub applied: usize,
    /// Rows skipped for lacking a native symbol.
    pub skipped: usize,
    /// Attribute values that failed to parse.
    pub field_errors: usize,
}

/// Loads reference rows into a [`MarketStateStore`].
pub struct ReferenceDataLoader {
    source: Arc<dyn SecurityRowSource>,
    store: Arc<MarketStateStore>,
    clock: SharedClock,
}

impl ReferenceDataLoader {
    /// Create a loader over a row source.
    #[must_use]
    pub fn new(
        source: Arc<dyn SecurityRowSource>,
        store: Arc<MarketStateStore>,
        clock: SharedClock,
    ) -> Self {
        Self {
            source,
            store,
            clock,
        }
    }

    /// Read every row from the source and merge it into the store.
    ///
    /// # Errors
    ///
    /// Returns [`RowSourceError`] if the source cannot be read. Individual bad
    /// rows and values are counted in the summary, not returned as errors.
    pub async fn load(&self) -> Result<LoadSummary, RowSourceError> {
        let rows = self.source.load_rows().await?;
        let mut summary = LoadSummary {
            rows: rows.len(),
            ..LoadSummary::default()
        };

        for row in &rows {
            let Some(symbol) = row.get(SecurityRow::ORG_SECURITY) else {
                summary.skipped += 1;
                continue;
            };
            let now = self.clock.now();
            summary.field_errors += self.store.merge_security(symbol, |security| {
                let errors = apply_row(security, row);
                security.touch(now);
                errors
            });
            summary.applied += 1;
        }

        if summary.skipped > 0 || summary.field_errors > 0 {
            warn!(
                skipped = summary.skipped,
                field_errors = summary.field_errors,
                "Reference data contained unusable values"
            );
        }
        info!(
            rows = summary.rows,
            applied = summary.applied,
            securities = self.store.security_count(),
            "Reference data loaded"
        );

        Ok(summary)
    }
}

/// Merge one row into a security. Returns the number of unparseable values.
fn apply_row(security: &mut Security, row: &SecurityRow) -> usize {
    let mut errors = 0;

    if let Some(description) = row.get(SecurityRow::DESCRIPTION) {
        security.description = description.to_string();
    }
    if let Some(code) = row.get(SecurityRow::EXCHANGE) {
        security.exchange = Exchange::from_code(code);
    }
    if let Some(code) = row.get(SecurityRow::MARKET_SEGMENT) {
        security.market_segment = MarketSegment::from_code(code);
    }
    if let Some(class) = row.get(SecurityRow::SECURITY_CLASS) {
        security.security_class = class.to_string();
    }
    if let Some(underlying) = row.get(SecurityRow::UNDERLYING) {
        security.underlying = underlying.to_string();
    }
    if let Some(code) = row.get(SecurityRow::INDEX_CODE) {
        security.index_membership = IndexMembership::from_code(code);
    }

    if let Some(raw) = row.get(SecurityRow::DECIMAL_COUNT) {
        match raw.parse() {
            Ok(value) => security.decimal_count = Some(value),
            Err(_) => errors += 1,
        }
    }
    if let Some(raw) = row.get(SecurityRow::DEPTH_SIZE) {
        match raw.parse::<u32>() {
            Ok(value) if (1..=MAX_DEPTH_SIZE).contains(&value) => {
                security.depth_size = Some(value);
            }
            _ => errors += 1,
        }
    }
    if let Some(raw) = row.get(SecurityRow::SECTOR_ID) {
        match raw.parse() {
            Ok(value) => security.sector_id = Some(value),
            Err(_) => errors += 1,
        }
    }

    if row
        .get(SecurityRow::IS_DELETED)
        .is_some_and(|v| matches!(v, "1" | "true" | "True" | "TRUE"))
    {
        security.mark_deleted();
    }

    for (column, value) in row.iter() {
        let Some(field) = SecurityField::from_column(column) else {
            continue;
        };
        if value.trim().is_empty() {
            continue;
        }
        if let Err(error) = security.apply_field(field, value) {
            debug!(symbol = %security.org_security, %error, "Skipping reference value");
            errors += 1;
        }
    }

    security.derive_display_symbol();
    errors
}
