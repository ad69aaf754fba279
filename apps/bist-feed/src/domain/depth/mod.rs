//! Order-Book Depth Types
//!
//! A [`Quote`] owns the order book of one security as an ordered map of
//! [`SecurityDepth`] rows keyed by 0-based row index. Each row holds both the
//! buy and the sell side; a depth update touches exactly one side.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Depth rows for futures and options.
pub const DERIVATIVE_DEPTH_SIZE: u32 = 10;

/// Depth rows for everything else.
pub const DEFAULT_DEPTH_SIZE: u32 = 5;

/// Largest book the feed can announce. Larger counts are malformed.
pub const MAX_DEPTH_SIZE: u32 = 50;

/// Native-symbol prefixes of futures and options.
const DERIVATIVE_PREFIXES: [&str; 2] = ["F_", "O_"];

/// Number of depth rows a symbol publishes when the feed does not say.
#[must_use]
pub fn conventional_depth_size(native_symbol: &str) -> u32 {
    if DERIVATIVE_PREFIXES
        .iter()
        .any(|prefix| native_symbol.starts_with(prefix))
    {
        DERIVATIVE_DEPTH_SIZE
    } else {
        DEFAULT_DEPTH_SIZE
    }
}

// =============================================================================
// Side
// =============================================================================

/// Order-book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side (`0` on the wire).
    Buy,
    /// Sell side (`1` on the wire).
    Sell,
}

impl Side {
    /// Parse the wire side code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::Buy),
            "1" => Some(Self::Sell),
            _ => None,
        }
    }
}

// =============================================================================
// Security Depth
// =============================================================================

/// One side of a depth row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DepthLevel {
    /// Price of the level.
    pub price: Decimal,
    /// Total lots at the level.
    pub lots: i64,
    /// Number of orders at the level.
    pub orders: i64,
}

/// One order-book row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecurityDepth {
    /// 0-based row index.
    pub row_index: u32,
    /// Buy side.
    pub buy: DepthLevel,
    /// Sell side.
    pub sell: DepthLevel,
    /// Local time of the last update.
    pub updated_at: Option<DateTime<Utc>>,
    /// Feed time of the last update.
    pub stream_time: String,
}

impl SecurityDepth {
    /// Create an empty row.
    #[must_use]
    pub fn new(row_index: u32) -> Self {
        Self {
            row_index,
            ..Self::default()
        }
    }

    /// Replace one side of the row, leaving the other untouched.
    pub fn update_side(&mut self, side: Side, level: DepthLevel) {
        match side {
            Side::Buy => self.buy = level,
            Side::Sell => self.sell = level,
        }
    }

    /// Level on the given side.
    #[must_use]
    pub const fn level(&self, side: Side) -> &DepthLevel {
        match side {
            Side::Buy => &self.buy,
            Side::Sell => &self.sell,
        }
    }
}

// =============================================================================
// Quote
// =============================================================================

/// Order book of one security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Feed-native symbol.
    pub org_security: String,
    /// Configured number of rows.
    pub depth_size: u32,
    /// Rows by 0-based index.
    pub rows: BTreeMap<u32, SecurityDepth>,
    /// Local time of the last update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Quote {
    /// Create a book with `depth_size` empty rows, capped at
    /// [`MAX_DEPTH_SIZE`].
    #[must_use]
    pub fn new(org_security: impl Into<String>, depth_size: u32) -> Self {
        let depth_size = depth_size.min(MAX_DEPTH_SIZE);
        Self {
            org_security: org_security.into(),
            depth_size,
            rows: (0..depth_size).map(|i| (i, SecurityDepth::new(i))).collect(),
            updated_at: None,
        }
    }

    /// Row at a 0-based index, created if absent.
    pub fn row_mut(&mut self, row_index: u32) -> &mut SecurityDepth {
        self.rows
            .entry(row_index)
            .or_insert_with(|| SecurityDepth::new(row_index))
    }

    /// Row at a 0-based index.
    #[must_use]
    pub fn row(&self, row_index: u32) -> Option<&SecurityDepth> {
        self.rows.get(&row_index)
    }

    /// Apply one side update to one row and stamp both row and book.
    ///
    /// Returns a copy of the updated row.
    pub fn apply(
        &mut self,
        row_index: u32,
        side: Side,
        level: DepthLevel,
        stream_time: &str,
        now: DateTime<Utc>,
    ) -> SecurityDepth {
        let row = self.row_mut(row_index);
        row.update_side(side, level);
        row.stream_time = stream_time.to_string();
        row.updated_at = Some(now);
        let snapshot = row.clone();
        self.updated_at = Some(now);
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventional_sizes() {
        assert_eq!(conventional_depth_size("F_XU0301224"), 10);
        assert_eq!(conventional_depth_size("O_AKBNKE1224C5.00"), 10);
        assert_eq!(conventional_depth_size("AKBNK"), 5);
        assert_eq!(conventional_depth_size("FROTO"), 5);
    }

    #[test]
    fn side_codes() {
        assert_eq!(Side::from_code("0"), Some(Side::Buy));
        assert_eq!(Side::from_code("1"), Some(Side::Sell));
        assert_eq!(Side::from_code("2"), None);
        assert_eq!(Side::from_code(""), None);
    }

    #[test]
    fn new_quote_has_empty_rows() {
        let quote = Quote::new("AKBNK", 5);
        assert_eq!(quote.rows.len(), 5);
        assert_eq!(quote.row(4).unwrap().row_index, 4);
        assert!(quote.row(5).is_none());
    }

    #[test]
    fn apply_touches_one_side_only() {
        let mut quote = Quote::new("AKBNK", 5);
        let now = Utc::now();

        quote.apply(
            0,
            Side::Sell,
            DepthLevel {
                price: Decimal::new(1055, 2),
                lots: 40,
                orders: 2,
            },
            "09:29:59",
            now,
        );
        let row = quote.apply(
            0,
            Side::Buy,
            DepthLevel {
                price: Decimal::new(1050, 2),
                lots: 100,
                orders: 5,
            },
            "09:30:00",
            now,
        );

        assert_eq!(row.buy.price, Decimal::new(1050, 2));
        assert_eq!(row.sell.price, Decimal::new(1055, 2));
        assert_eq!(row.sell.lots, 40);
        assert_eq!(row.stream_time, "09:30:00");
        assert_eq!(quote.updated_at, Some(now));
    }

    #[test]
    fn oversized_book_is_capped() {
        let quote = Quote::new("AKBNK", u32::MAX);
        assert_eq!(quote.depth_size, MAX_DEPTH_SIZE);
        assert_eq!(quote.rows.len(), MAX_DEPTH_SIZE as usize);
    }

    #[test]
    fn rows_beyond_depth_size_are_created() {
        let mut quote = Quote::new("AKBNK", 2);
        quote.row_mut(7).buy.lots = 3;
        assert_eq!(quote.row(7).unwrap().buy.lots, 3);
    }
}
