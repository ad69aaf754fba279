//! Security Attributes
//!
//! The numeric and textual trade statistics carried by a [`Security`],
//! declared once through `security_fields!` so the attribute enum, the
//! storage struct, the column names used by reference-data rows and the
//! intraday reset set never drift apart.
//!
//! Values are parsed according to the attribute's declared type. A value
//! that does not parse leaves the attribute untouched.
//!
//! [`Security`]: super::Security

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

/// Parse type of a security attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Decimal number; `.` or `,` accepted as decimal mark.
    Decimal,
    /// Signed integer.
    Integer,
    /// Free text, stored trimmed.
    Text,
}

/// A value could not be parsed as the attribute's type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse {value:?} as {kind:?} for {column}")]
pub struct FieldParseError {
    /// Column name of the attribute.
    pub column: &'static str,
    /// Expected type.
    pub kind: FieldKind,
    /// Offending raw value.
    pub value: String,
}

/// Types that can be stored in a security attribute slot.
pub trait FieldValue: Sized {
    /// Declared kind used in error reports.
    const KIND: FieldKind;

    /// Parse a raw wire or column value.
    fn parse_field(raw: &str) -> Option<Self>;
}

impl FieldValue for Decimal {
    const KIND: FieldKind = FieldKind::Decimal;

    fn parse_field(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.contains(',') {
            Self::from_str(&trimmed.replace(',', ".")).ok()
        } else {
            Self::from_str(trimmed).ok()
        }
    }
}

impl FieldValue for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn parse_field(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::Text;

    fn parse_field(raw: &str) -> Option<Self> {
        Some(raw.trim().to_string())
    }
}

fn assign<T: FieldValue>(
    slot: &mut Option<T>,
    column: &'static str,
    raw: &str,
) -> Result<(), FieldParseError> {
    match T::parse_field(raw) {
        Some(value) => {
            *slot = Some(value);
            Ok(())
        }
        None => Err(FieldParseError {
            column,
            kind: T::KIND,
            value: raw.to_string(),
        }),
    }
}

macro_rules! security_fields {
    (@intraday intraday) => { true };
    (@intraday persistent) => { false };
    ($( $(#[$doc:meta])* $variant:ident => $field:ident : $ty:ty, $column:literal, $scope:ident; )+) => {
        /// A named trade-statistics attribute of a security.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum SecurityField {
            $( $(#[$doc])* $variant, )+
        }

        /// Trade statistics of a security. `None` means never received.
        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
        pub struct SecurityStats {
            $( $(#[$doc])* pub $field: Option<$ty>, )+
        }

        impl SecurityField {
            /// Every attribute, in declaration order.
            pub const ALL: &'static [Self] = &[ $( Self::$variant, )+ ];

            /// Column name used by reference-data rows.
            #[must_use]
            pub const fn column(self) -> &'static str {
                match self {
                    $( Self::$variant => $column, )+
                }
            }

            /// Parse type of this attribute.
            #[must_use]
            pub const fn kind(self) -> FieldKind {
                match self {
                    $( Self::$variant => <$ty as FieldValue>::KIND, )+
                }
            }

            /// Whether the attribute belongs to the current trading day.
            #[must_use]
            pub const fn is_intraday(self) -> bool {
                match self {
                    $( Self::$variant => security_fields!(@intraday $scope), )+
                }
            }

            /// Parse `raw` and store it into `stats`.
            ///
            /// # Errors
            ///
            /// Returns [`FieldParseError`] when `raw` does not parse; `stats`
            /// is left unchanged in that case.
            pub fn apply(self, stats: &mut SecurityStats, raw: &str) -> Result<(), FieldParseError> {
                match self {
                    $( Self::$variant => assign(&mut stats.$field, $column, raw), )+
                }
            }

            /// Reset the attribute to "never received".
            pub fn clear(self, stats: &mut SecurityStats) {
                match self {
                    $( Self::$variant => stats.$field = None, )+
                }
            }

            /// Look up an attribute by reference-data column name.
            #[must_use]
            pub fn from_column(column: &str) -> Option<Self> {
                match column {
                    $( $column => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

security_fields! {
    /// Last traded price.
    Last => last: Decimal, "Last", intraday;
    /// Best bid price.
    Bid => bid: Decimal, "Bid", intraday;
    /// Best ask price.
    Ask => ask: Decimal, "Ask", intraday;
    /// Session open price.
    Open => open: Decimal, "Open", intraday;
    /// Session high.
    High => high: Decimal, "High", intraday;
    /// Session low.
    Low => low: Decimal, "Low", intraday;
    /// Previous session close.
    PrevClose => prev_close: Decimal, "PrevClose", persistent;
    /// Session close.
    Close => close: Decimal, "Close", intraday;
    /// Size of the last trade in lots.
    LastSize => last_size: i64, "LastSize", intraday;
    /// Lots at the best bid.
    BidSize => bid_size: i64, "BidSize", intraday;
    /// Lots at the best ask.
    AskSize => ask_size: i64, "AskSize", intraday;
    /// Traded volume in lots.
    Volume => volume: i64, "Volume", intraday;
    /// Traded value.
    Turnover => turnover: Decimal, "Turnover", intraday;
    /// Volume weighted average price.
    Vwap => vwap: Decimal, "Vwap", intraday;
    /// Net change against previous close.
    Change => change: Decimal, "Change", intraday;
    /// Percent change against previous close.
    ChangePercent => change_percent: Decimal, "ChangePercent", intraday;
    /// Number of trades.
    TradeCount => trade_count: i64, "TradeCount", intraday;
    /// Time of the last trade.
    LastTradeTime => last_trade_time: String, "LastTradeTime", intraday;
    /// Upper price limit.
    LimitUp => limit_up: Decimal, "LimitUp", persistent;
    /// Lower price limit.
    LimitDown => limit_down: Decimal, "LimitDown", persistent;
    /// Base (reference) price.
    BasePrice => base_price: Decimal, "BasePrice", persistent;
    /// Settlement price.
    Settlement => settlement: Decimal, "Settlement", intraday;
    /// Previous settlement price.
    PrevSettlement => prev_settlement: Decimal, "PrevSettlement", persistent;
    /// Open interest in contracts.
    OpenInterest => open_interest: i64, "OpenInterest", intraday;
    /// Weekly high.
    WeekHigh => week_high: Decimal, "WeekHigh", persistent;
    /// Weekly low.
    WeekLow => week_low: Decimal, "WeekLow", persistent;
    /// Weekly close.
    WeekClose => week_close: Decimal, "WeekClose", persistent;
    /// Weekly VWAP.
    WeekVwap => week_vwap: Decimal, "WeekVwap", persistent;
    /// Weekly volume.
    WeekVolume => week_volume: i64, "WeekVolume", persistent;
    /// Monthly high.
    MonthHigh => month_high: Decimal, "MonthHigh", persistent;
    /// Monthly low.
    MonthLow => month_low: Decimal, "MonthLow", persistent;
    /// Monthly close.
    MonthClose => month_close: Decimal, "MonthClose", persistent;
    /// Monthly VWAP.
    MonthVwap => month_vwap: Decimal, "MonthVwap", persistent;
    /// Monthly volume.
    MonthVolume => month_volume: i64, "MonthVolume", persistent;
    /// Yearly high.
    YearHigh => year_high: Decimal, "YearHigh", persistent;
    /// Yearly low.
    YearLow => year_low: Decimal, "YearLow", persistent;
    /// Yearly close.
    YearClose => year_close: Decimal, "YearClose", persistent;
    /// Yearly VWAP.
    YearVwap => year_vwap: Decimal, "YearVwap", persistent;
    /// Yearly volume.
    YearVolume => year_volume: i64, "YearVolume", persistent;
    /// Previous week's close.
    PrevWeekClose => prev_week_close: Decimal, "PrevWeekClose", persistent;
    /// Previous month's close.
    PrevMonthClose => prev_month_close: Decimal, "PrevMonthClose", persistent;
    /// Previous year's close.
    PrevYearClose => prev_year_close: Decimal, "PrevYearClose", persistent;
    /// Paid-in capital.
    Capital => capital: Decimal, "Capital", persistent;
    /// Net profit of the last period.
    NetProfit => net_profit: Decimal, "NetProfit", persistent;
    /// Shareholders' equity.
    Equity => equity: Decimal, "Equity", persistent;
    /// Price to earnings ratio.
    PriceEarnings => price_earnings: Decimal, "PriceEarnings", persistent;
    /// Market value.
    MarketValue => market_value: Decimal, "MarketValue", persistent;
    /// Price to book ratio.
    PriceToBook => price_to_book: Decimal, "PriceToBook", persistent;
    /// Dividend yield.
    DividendYield => dividend_yield: Decimal, "DividendYield", persistent;
    /// Free float ratio.
    FreeFloatRatio => free_float_ratio: Decimal, "FreeFloatRatio", persistent;
    /// Foreign ownership ratio.
    ForeignRatio => foreign_ratio: Decimal, "ForeignRatio", persistent;
    /// Total pending buy lots.
    TotalBidLots => total_bid_lots: i64, "TotalBidLots", intraday;
    /// Total pending sell lots.
    TotalAskLots => total_ask_lots: i64, "TotalAskLots", intraday;
    /// Number of pending buy orders.
    TotalBidOrders => total_bid_orders: i64, "TotalBidOrders", intraday;
    /// Number of pending sell orders.
    TotalAskOrders => total_ask_orders: i64, "TotalAskOrders", intraday;
    /// Weighted average price of pending buy orders.
    AvgBidPrice => avg_bid_price: Decimal, "AvgBidPrice", intraday;
    /// Weighted average price of pending sell orders.
    AvgAskPrice => avg_ask_price: Decimal, "AvgAskPrice", intraday;
    /// Theoretical matching price during auctions.
    TheoreticalPrice => theoretical_price: Decimal, "TheoreticalPrice", intraday;
    /// Theoretical matching volume during auctions.
    TheoreticalVolume => theoretical_volume: i64, "TheoreticalVolume", intraday;
    /// Option strike price.
    StrikePrice => strike_price: Decimal, "StrikePrice", persistent;
    /// Contract expiry date.
    ExpiryDate => expiry_date: String, "ExpiryDate", persistent;
    /// Minimum price step.
    TickSize => tick_size: Decimal, "TickSize", persistent;
    /// Lot multiplier.
    LotUnit => lot_unit: i64, "LotUnit", persistent;
    /// Trading status text.
    TradingStatus => trading_status: String, "TradingStatus", intraday;
    /// Current session name.
    SessionName => session_name: String, "SessionName", intraday;
    /// Feed time of the last update.
    StreamTime => stream_time: String, "StreamTime", intraday;
}
