//! Relational row source trait and types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

/// A single column value as read from the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl fmt::Display for CellValue {
    /// Deterministic, dict-literal style rendering.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("None"),
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Real(v) if v.is_nan() => f.write_str("nan"),
            CellValue::Real(v) if v.is_infinite() => {
                f.write_str(if *v > 0.0 { "inf" } else { "-inf" })
            }
            // Debug keeps the fractional part: 2.0 rather than 2
            CellValue::Real(v) => write!(f, "{:?}", v),
            CellValue::Text(s) => f.write_str(&quote_text(s)),
            CellValue::Blob(bytes) => {
                f.write_str("x'")?;
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                f.write_str("'")
            }
        }
    }
}

/// Single-quote a string, escaping quotes, backslashes and control characters.
pub fn quote_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// One fetched page of a table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowPage {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RowPage {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trait for relational sources (e.g., a SQLite file)
///
/// Implementations are read-only. Enumeration failures surface as
/// `Error::SourceRead`; failures scoped to a single table should surface as
/// `Error::TableRead` so the mapper can skip that table and carry on.
pub trait RowSource {
    /// Names of every user table, in a stable order.
    fn table_names(&self) -> Result<Vec<String>>;

    /// Fetch up to `limit` rows of `table`, skipping the first `offset`.
    fn fetch_page(&self, table: &str, offset: usize, limit: usize) -> Result<RowPage>;

    /// Release the underlying connection.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}
