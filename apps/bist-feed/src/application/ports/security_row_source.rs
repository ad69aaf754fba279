//! Security Row Source Port (Driven Port)
//!
//! Durable reference data that pre-populates the security registry before
//! the live feed starts. Each row is a set of named columns; identity
//! columns are listed in [`SecurityRow`] and every other column name matches
//! a [`SecurityField`] column.
//!
//! [`SecurityField`]: crate::domain::security::SecurityField

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;

/// One reference-data row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecurityRow {
    columns: BTreeMap<String, String>,
}

impl SecurityRow {
    /// Native symbol column.
    pub const ORG_SECURITY: &'static str = "OrgSecurity";
    /// Long name column.
    pub const DESCRIPTION: &'static str = "Description";
    /// Exchange code column.
    pub const EXCHANGE: &'static str = "Exchange";
    /// Market-segment code column.
    pub const MARKET_SEGMENT: &'static str = "MarketSegment";
    /// Security class column.
    pub const SECURITY_CLASS: &'static str = "SecurityClass";
    /// Sector id column.
    pub const SECTOR_ID: &'static str = "SectorId";
    /// Price precision column.
    pub const DECIMAL_COUNT: &'static str = "DecimalCount";
    /// Depth-row count column.
    pub const DEPTH_SIZE: &'static str = "DepthSize";
    /// Underlying symbol column.
    pub const UNDERLYING: &'static str = "Underlying";
    /// Index-membership code column.
    pub const INDEX_CODE: &'static str = "IndexCode";
    /// Deletion flag column.
    pub const IS_DELETED: &'static str = "IsDeleted";

    /// Build a row from `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            columns: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of a column, trimmed. Empty values read as absent.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Iterate over every `(column, value)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Reference-data source error.
#[derive(Debug, thiserror::Error)]
pub enum RowSourceError {
    /// The underlying store could not be read.
    #[error("reference data unavailable: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be decoded.
    #[error("invalid reference row at line {line}: {message}")]
    InvalidRow {
        /// 1-based line or record number.
        line: usize,
        /// Decoder message.
        message: String,
    },
}

/// Port for reading security reference rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecurityRowSource: Send + Sync {
    /// Read every available row.
    async fn load_rows(&self) -> Result<Vec<SecurityRow>, RowSourceError>;
}
