//! Static Reference Tables
//!
//! Exchange and market-segment codes used by the feed's create message.
//! Both tables are fixed at compile time and read-only for the life of
//! the process.

use serde::Serialize;

// =============================================================================
// Exchange
// =============================================================================

/// Exchange (market) a security trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exchange {
    /// Not resolved against the table.
    #[default]
    Unknown,
    /// Indices.
    Index,
    /// Debt securities market.
    DebtSecurities,
    /// Equity market.
    Equity,
    /// Futures and options market (VIOP).
    Derivatives,
    /// Foreign exchange and parities.
    Currency,
    /// Precious metals and commodities.
    Commodity,
    /// Investment and exchange traded funds.
    Fund,
    /// Warrants and certificates.
    Warrant,
}

/// Exchange code table: `(wire code, exchange, display name)`.
const EXCHANGES: &[(&str, Exchange, &str)] = &[
    ("1", Exchange::Index, "BIST Endeks"),
    ("2", Exchange::DebtSecurities, "Borçlanma Araçları Piyasası"),
    ("4", Exchange::Equity, "Pay Piyasası"),
    ("5", Exchange::Derivatives, "Vadeli İşlem ve Opsiyon Piyasası"),
    ("6", Exchange::Currency, "Döviz ve Parite"),
    ("7", Exchange::Commodity, "Kıymetli Madenler"),
    ("8", Exchange::Fund, "Yatırım Fonları"),
    ("9", Exchange::Warrant, "Varant ve Sertifika"),
];

impl Exchange {
    /// Resolve a wire exchange code.
    ///
    /// Unrecognized codes resolve to [`Exchange::Unknown`].
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        EXCHANGES
            .iter()
            .find(|(c, _, _)| *c == code.trim())
            .map_or(Self::Unknown, |(_, exchange, _)| *exchange)
    }

    /// Wire code for this exchange, if it has one.
    #[must_use]
    pub fn code(self) -> Option<&'static str> {
        EXCHANGES
            .iter()
            .find(|(_, e, _)| *e == self)
            .map(|(code, _, _)| *code)
    }

    /// Human-readable exchange name.
    #[must_use]
    pub fn name(self) -> &'static str {
        EXCHANGES
            .iter()
            .find(|(_, e, _)| *e == self)
            .map_or("Bilinmiyor", |(_, _, name)| *name)
    }

    /// Whether symbols on this exchange carry a market suffix.
    #[must_use]
    pub const fn is_equity(self) -> bool {
        matches!(self, Self::Equity)
    }
}

// =============================================================================
// Market Segment
// =============================================================================

/// Market segment (board) within an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSegment {
    /// Not resolved against the table.
    #[default]
    Unknown,
    /// Star market.
    Star,
    /// Main market.
    Main,
    /// Sub market.
    Sub,
    /// Watchlist market.
    Watchlist,
    /// Pre-market trading platform.
    PreMarket,
    /// Primary market (initial offerings).
    Primary,
    /// Structured products and funds market.
    StructuredProducts,
}

const MARKET_SEGMENTS: &[(&str, MarketSegment, &str)] = &[
    ("1", MarketSegment::Star, "Yıldız Pazar"),
    ("2", MarketSegment::Main, "Ana Pazar"),
    ("3", MarketSegment::Sub, "Alt Pazar"),
    ("4", MarketSegment::Watchlist, "Yakın İzleme Pazarı"),
    ("5", MarketSegment::PreMarket, "Piyasa Öncesi İşlem Platformu"),
    ("6", MarketSegment::Primary, "Birincil Piyasa"),
    ("7", MarketSegment::StructuredProducts, "Yapılandırılmış Ürünler ve Fon Pazarı"),
];

impl MarketSegment {
    /// Resolve a wire market-segment code.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        MARKET_SEGMENTS
            .iter()
            .find(|(c, _, _)| *c == code.trim())
            .map_or(Self::Unknown, |(_, segment, _)| *segment)
    }

    /// Human-readable segment name.
    #[must_use]
    pub fn name(self) -> &'static str {
        MARKET_SEGMENTS
            .iter()
            .find(|(_, s, _)| *s == self)
            .map_or("Bilinmiyor", |(_, _, name)| *name)
    }
}
