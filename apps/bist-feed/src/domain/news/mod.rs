//! News Types
//!
//! Headlines and bodies arrive as separate messages sharing a news id.
//! They are published independently; correlating them is left to consumers.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which part of a news item a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsKind {
    /// Headline with metadata.
    Headline,
    /// Body text.
    Body,
}

/// Headline or body record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct News {
    /// Feed news id.
    pub news_id: String,
    /// Headline or body.
    pub kind: NewsKind,
    /// Publication date (headline only).
    pub date: String,
    /// Publication time (headline only).
    pub time: String,
    /// Source agency (headline only).
    pub source: String,
    /// Category (headline only).
    pub category: String,
    /// Priority (headline only).
    pub priority: String,
    /// Headline text.
    pub headline: String,
    /// Body text.
    pub content: String,
    /// Related native symbols.
    pub related_symbols: Vec<String>,
    /// Local receive time.
    pub received_at: DateTime<Utc>,
}

impl News {
    /// Empty record of the given kind.
    #[must_use]
    pub fn new(news_id: impl Into<String>, kind: NewsKind, received_at: DateTime<Utc>) -> Self {
        Self {
            news_id: news_id.into(),
            kind,
            date: String::new(),
            time: String::new(),
            source: String::new(),
            category: String::new(),
            priority: String::new(),
            headline: String::new(),
            content: String::new(),
            related_symbols: Vec::new(),
            received_at,
        }
    }

    /// Whether the headline references more than one security.
    #[must_use]
    pub fn is_multi_stock(&self) -> bool {
        self.related_symbols.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_stock_detection() {
        let mut news = News::new("42", NewsKind::Headline, Utc::now());
        assert!(!news.is_multi_stock());

        news.related_symbols = vec!["AKBNK".to_string()];
        assert!(!news.is_multi_stock());

        news.related_symbols.push("GARAN".to_string());
        assert!(news.is_multi_stock());
    }
}
