//! Field-Code Table
//!
//! Maps the numeric field codes of generic-update messages (`060`/`061`) to
//! security attributes. Codes not in the table are ignored here; the caller
//! still keeps them in the security's attribute map.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::domain::security::{FieldParseError, Security, SecurityField};

/// Wire field code to attribute.
pub const FIELD_CODES: &[(&str, SecurityField)] = &[
    // Prices and sizes
    ("1", SecurityField::Last),
    ("2", SecurityField::Bid),
    ("3", SecurityField::Ask),
    ("4", SecurityField::Open),
    ("5", SecurityField::High),
    ("6", SecurityField::Low),
    ("7", SecurityField::PrevClose),
    ("8", SecurityField::Close),
    ("9", SecurityField::LastSize),
    ("10", SecurityField::BidSize),
    ("11", SecurityField::AskSize),
    ("12", SecurityField::Volume),
    ("13", SecurityField::Turnover),
    ("14", SecurityField::Vwap),
    ("15", SecurityField::Change),
    ("16", SecurityField::ChangePercent),
    ("17", SecurityField::TradeCount),
    ("18", SecurityField::LastTradeTime),
    // Limits and settlement
    ("19", SecurityField::LimitUp),
    ("20", SecurityField::LimitDown),
    ("21", SecurityField::BasePrice),
    ("22", SecurityField::Settlement),
    ("23", SecurityField::PrevSettlement),
    ("24", SecurityField::OpenInterest),
    // Period aggregates
    ("30", SecurityField::WeekHigh),
    ("31", SecurityField::WeekLow),
    ("32", SecurityField::WeekClose),
    ("33", SecurityField::WeekVwap),
    ("34", SecurityField::WeekVolume),
    ("35", SecurityField::MonthHigh),
    ("36", SecurityField::MonthLow),
    ("37", SecurityField::MonthClose),
    ("38", SecurityField::MonthVwap),
    ("39", SecurityField::MonthVolume),
    ("40", SecurityField::YearHigh),
    ("41", SecurityField::YearLow),
    ("42", SecurityField::YearClose),
    ("43", SecurityField::YearVwap),
    ("44", SecurityField::YearVolume),
    ("45", SecurityField::PrevWeekClose),
    ("46", SecurityField::PrevMonthClose),
    ("47", SecurityField::PrevYearClose),
    // Fundamentals
    ("50", SecurityField::Capital),
    ("51", SecurityField::NetProfit),
    ("52", SecurityField::Equity),
    ("53", SecurityField::PriceEarnings),
    ("54", SecurityField::MarketValue),
    ("55", SecurityField::PriceToBook),
    ("56", SecurityField::DividendYield),
    ("57", SecurityField::FreeFloatRatio),
    ("58", SecurityField::ForeignRatio),
    // Pending orders and auctions
    ("60", SecurityField::TotalBidLots),
    ("61", SecurityField::TotalAskLots),
    ("62", SecurityField::TotalBidOrders),
    ("63", SecurityField::TotalAskOrders),
    ("64", SecurityField::AvgBidPrice),
    ("65", SecurityField::AvgAskPrice),
    ("66", SecurityField::TheoreticalPrice),
    ("67", SecurityField::TheoreticalVolume),
    // Contract details
    ("70", SecurityField::StrikePrice),
    ("71", SecurityField::ExpiryDate),
    ("72", SecurityField::TickSize),
    ("73", SecurityField::LotUnit),
    // Status
    ("80", SecurityField::TradingStatus),
    ("81", SecurityField::SessionName),
    ("82", SecurityField::StreamTime),
];

static INDEX: LazyLock<HashMap<&'static str, SecurityField>> =
    LazyLock::new(|| FIELD_CODES.iter().copied().collect());

/// Attribute for a field code.
#[must_use]
pub fn field_for_code(code: &str) -> Option<SecurityField> {
    INDEX.get(code.trim()).copied()
}

/// Result of applying one `(code, value)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    /// The attribute was updated.
    Applied(SecurityField),
    /// The code is not in the table or the value is empty.
    Ignored,
}

/// Apply one `(code, value)` pair to a security's statistics.
///
/// # Errors
///
/// Returns [`FieldParseError`] if the value does not parse as the
/// attribute's type; the attribute keeps its previous value.
pub fn apply_field_code(
    security: &mut Security,
    code: &str,
    value: &str,
) -> Result<FieldOutcome, FieldParseError> {
    let Some(field) = field_for_code(code) else {
        return Ok(FieldOutcome::Ignored);
    };
    if value.trim().is_empty() {
        return Ok(FieldOutcome::Ignored);
    }
    security.apply_field(field, value)?;
    Ok(FieldOutcome::Applied(field))
}
