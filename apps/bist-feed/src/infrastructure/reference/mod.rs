//! JSON-Lines Reference Data Adapter
//!
//! Reads security reference rows from a file holding one flat JSON object
//! per line. Blank lines are skipped. Numbers and booleans are accepted as
//! column values and kept in their textual form; `null` columns are left
//! out of the row.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::application::ports::{RowSourceError, SecurityRow, SecurityRowSource};

/// [`SecurityRowSource`] backed by a JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonLinesRowSource {
    path: PathBuf,
}

impl JsonLinesRowSource {
    /// Create a source for `path`. The file is read on each load.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File this source reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SecurityRowSource for JsonLinesRowSource {
    async fn load_rows(&self) -> Result<Vec<SecurityRow>, RowSourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let rows = parse_rows(&content)?;
        tracing::debug!(path = %self.path.display(), rows = rows.len(), "Reference rows read");
        Ok(rows)
    }
}

fn parse_rows(content: &str) -> Result<Vec<SecurityRow>, RowSourceError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| parse_row(i + 1, line))
        .collect()
}

fn parse_row(line: usize, text: &str) -> Result<SecurityRow, RowSourceError> {
    let value: Value = serde_json::from_str(text).map_err(|e| RowSourceError::InvalidRow {
        line,
        message: e.to_string(),
    })?;
    let Value::Object(map) = value else {
        return Err(RowSourceError::InvalidRow {
            line,
            message: "expected a JSON object".to_string(),
        });
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (column, value) in map {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(RowSourceError::InvalidRow {
                    line,
                    message: format!("column {column} is not a scalar"),
                });
            }
        };
        pairs.push((column, text));
    }
    Ok(SecurityRow::from_pairs(pairs))
}
