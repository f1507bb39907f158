//! PEP status taxonomy and the per-run status census.

use crate::model::ResultTable;
use crate::scraper::error::ScraperError;

/// Preview code (as printed in the PEP numerical index) to the full statuses consistent with it.
const EXPECTED_STATUS: &[(&str, &[&str])] = &[
    ("A", &["Active", "Accepted"]),
    ("D", &["Deferred"]),
    ("F", &["Final"]),
    ("P", &["Provisional"]),
    ("R", &["Rejected"]),
    ("S", &["Superseded"]),
    ("W", &["Withdrawn"]),
    ("", &["Draft", "Active"]),
];

pub const CENSUS_HEADER: [&str; 2] = ["Статусы", "Кол-во"];
pub const TOTAL_LABEL: &str = "Total";

/// Full statuses allowed for `code`. Unknown codes allow nothing.
pub fn expected_statuses(code: &str) -> &'static [&'static str] {
    EXPECTED_STATUS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, statuses)| *statuses)
        .unwrap_or(&[])
}

pub fn is_expected(code: &str, status: &str) -> bool {
    expected_statuses(code).contains(&status)
}

/// Count of PEPs per full status, in first-seen order.
#[derive(Debug, Default)]
pub struct StatusCensus {
    counts: Vec<(String, u64)>,
    total: u64,
}

impl StatusCensus {
    pub fn record(&mut self, status: &str) {
        self.total += 1;
        match self.counts.iter_mut().find(|(s, _)| s == status) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((status.to_string(), 1)),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// One row per status, then the Total row.
    pub fn into_table(self) -> Result<ResultTable, ScraperError> {
        let mut table = ResultTable::new(&CENSUS_HEADER);
        for (status, count) in self.counts {
            table.push_row(vec![status, count.to_string()])?;
        }
        table.push_row(vec![TOTAL_LABEL.to_string(), self.total.to_string()])?;
        Ok(table)
    }
}
