//! Tabular result shared by extractors and output writers.
//!
//! Row 0 is the header; every data row has the header's arity.

use crate::scraper::ScraperError;

/// Header plus data rows, in source document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn new<S: AsRef<str>>(header: &[S]) -> Self {
        Self {
            header: header.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a data row. Rejects rows whose column count differs from the header's.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), ScraperError> {
        if row.len() != self.header.len() {
            return Err(ScraperError::RowArity {
                expected: self.header.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Header first, then each data row.
    pub fn all_rows(&self) -> impl Iterator<Item = &[String]> {
        std::iter::once(self.header.as_slice()).chain(self.rows.iter().map(Vec::as_slice))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
