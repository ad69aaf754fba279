//! Security Types
//!
//! A [`Security`] is keyed by its feed-native symbol (`org_security`). It is
//! created on first reference, merged in place for the life of the process and
//! never physically removed: deletion only sets a flag.
//!
//! # Display Symbols
//!
//! Equity symbols get a market suffix appended:
//!
//! - 6-character native symbols split into a 5-character root and a
//!   1-character suffix (`GARANF` → `GARAN.F`)
//! - 4- and 5-character native symbols get `.E` (`AKBNK` → `AKBNK.E`)
//!
//! Every other exchange uses the native symbol unchanged.

mod fields;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use fields::{FieldKind, FieldParseError, FieldValue, SecurityField, SecurityStats};

use super::reference::{Exchange, MarketSegment};

/// Separator between root and suffix in a display symbol.
pub const SYMBOL_SUFFIX_SEPARATOR: char = '.';

/// Suffix given to 4- and 5-character equity symbols.
pub const DEFAULT_EQUITY_SUFFIX: &str = "E";

// =============================================================================
// Index Membership
// =============================================================================

/// Index membership flags derived from the 3-character membership code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexMembership {
    /// Member of BIST 30.
    pub bist30: bool,
    /// Member of BIST 100.
    pub bist100: bool,
    /// Member of the participation index.
    pub participation: bool,
}

impl IndexMembership {
    /// Derive flags from a membership code.
    ///
    /// Each position is `'0'` for "not a member" and anything else for
    /// "member". Missing positions count as not a member.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let mut flags = code.chars().map(|c| c != '0');
        Self {
            bist30: flags.next().unwrap_or(false),
            bist100: flags.next().unwrap_or(false),
            participation: flags.next().unwrap_or(false),
        }
    }

    /// Encode back into the 3-character wire form.
    #[must_use]
    pub fn to_code(self) -> String {
        [self.bist30, self.bist100, self.participation]
            .iter()
            .map(|&member| if member { '1' } else { '0' })
            .collect()
    }
}

// =============================================================================
// Display Symbol
// =============================================================================

/// Derive `(symbol, suffix)` for a native symbol on the given exchange.
#[must_use]
pub fn display_symbol(native: &str, exchange: Exchange) -> (String, String) {
    if !exchange.is_equity() {
        return (native.to_string(), String::new());
    }

    match native.chars().count() {
        6 => {
            let root: String = native.chars().take(5).collect();
            let suffix: String = native.chars().skip(5).collect();
            (
                format!("{root}{SYMBOL_SUFFIX_SEPARATOR}{suffix}"),
                suffix,
            )
        }
        4 | 5 => (
            format!("{native}{SYMBOL_SUFFIX_SEPARATOR}{DEFAULT_EQUITY_SUFFIX}"),
            DEFAULT_EQUITY_SUFFIX.to_string(),
        ),
        _ => (native.to_string(), String::new()),
    }
}

// =============================================================================
// Security
// =============================================================================

/// A tradable instrument as known to the feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Security {
    /// Feed-native symbol, the primary key.
    pub org_security: String,
    /// Display symbol (with market suffix for equities).
    pub symbol: String,
    /// Market suffix part of the display symbol.
    pub symbol_sfx: String,
    /// Long name.
    pub description: String,
    /// Exchange classification.
    pub exchange: Exchange,
    /// Market segment classification.
    pub market_segment: MarketSegment,
    /// Security class letter from the create message.
    pub security_class: String,
    /// Sector identifier.
    pub sector_id: Option<i32>,
    /// Price precision.
    pub decimal_count: Option<u32>,
    /// Number of order-book rows published for this security.
    pub depth_size: Option<u32>,
    /// Underlying symbol for derivatives.
    pub underlying: String,
    /// Index membership flags.
    pub index_membership: IndexMembership,
    /// Trade statistics.
    pub stats: SecurityStats,
    /// Every `(code, value)` pair received through generic updates.
    pub attributes: BTreeMap<String, String>,
    /// Deletion flag; never cleared once set.
    pub is_deleted: bool,
    /// Time of the last mutation.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Security {
    /// Create an empty record for a native symbol.
    #[must_use]
    pub fn new(org_security: impl Into<String>) -> Self {
        let org_security = org_security.into();
        Self {
            symbol: org_security.clone(),
            org_security,
            ..Self::default()
        }
    }

    /// Recompute `symbol` and `symbol_sfx` from the native symbol and exchange.
    pub fn derive_display_symbol(&mut self) {
        let (symbol, suffix) = display_symbol(&self.org_security, self.exchange);
        self.symbol = symbol;
        self.symbol_sfx = suffix;
    }

    /// Set the deletion flag.
    pub const fn mark_deleted(&mut self) {
        self.is_deleted = true;
    }

    /// Parse and apply one attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`FieldParseError`] if `raw` does not parse; the attribute keeps
    /// its previous value.
    pub fn apply_field(&mut self, field: SecurityField, raw: &str) -> Result<(), FieldParseError> {
        field.apply(&mut self.stats, raw)
    }

    /// Clear every intraday attribute. Persistent attributes are kept.
    pub fn reset_intraday(&mut self) {
        for field in SecurityField::ALL.iter().filter(|f| f.is_intraday()) {
            field.clear(&mut self.stats);
        }
    }

    /// Stamp the last-update time.
    pub const fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use test_case::test_case;

    #[test_case("AKBNK", Exchange::Equity, "AKBNK.E", "E" ; "five char equity")]
    #[test_case("THYA", Exchange::Equity, "THYA.E", "E" ; "four char equity")]
    #[test_case("GARANF", Exchange::Equity, "GARAN.F", "F" ; "six char equity")]
    #[test_case("XU", Exchange::Equity, "XU", "" ; "short equity unchanged")]
    #[test_case("F_XU0301224", Exchange::Derivatives, "F_XU0301224", "" ; "derivative unchanged")]
    #[test_case("AKBNK", Exchange::Unknown, "AKBNK", "" ; "unknown exchange unchanged")]
    fn display_symbol_rules(native: &str, exchange: Exchange, symbol: &str, suffix: &str) {
        assert_eq!(
            display_symbol(native, exchange),
            (symbol.to_string(), suffix.to_string())
        );
    }

    #[test_case("101", true, false, true)]
    #[test_case("000", false, false, false)]
    #[test_case("1X0", true, true, false)]
    #[test_case("1", true, false, false)]
    #[test_case("", false, false, false)]
    fn index_membership_positions(code: &str, bist30: bool, bist100: bool, participation: bool) {
        let flags = IndexMembership::from_code(code);
        assert_eq!(flags.bist30, bist30);
        assert_eq!(flags.bist100, bist100);
        assert_eq!(flags.participation, participation);
    }

    #[test]
    fn index_membership_encodes() {
        assert_eq!(IndexMembership::from_code("101").to_code(), "101");
        assert_eq!(IndexMembership::default().to_code(), "000");
    }

    #[test]
    fn new_security_uses_native_symbol() {
        let security = Security::new("AKBNK");
        assert_eq!(security.org_security, "AKBNK");
        assert_eq!(security.symbol, "AKBNK");
        assert!(!security.is_deleted);
    }

    #[test]
    fn reset_intraday_keeps_persistent_fields() {
        let mut security = Security::new("AKBNK");
        security.apply_field(SecurityField::Last, "10.5").unwrap();
        security.apply_field(SecurityField::PrevClose, "10.1").unwrap();
        security.apply_field(SecurityField::YearHigh, "14").unwrap();

        security.reset_intraday();

        assert_eq!(security.stats.last, None);
        assert_eq!(security.stats.prev_close, Some(Decimal::new(101, 1)));
        assert_eq!(security.stats.year_high, Some(Decimal::new(14, 0)));
    }
}
