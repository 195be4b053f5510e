//! Policy evaluation.
//!
//! Walks a decoded report and reports, per record, every disposition,
//! alignment or authentication check that did not pass. Failures nest: a
//! [`ReportFailure`] lists [`RecordFailure`]s, which list [`Reason`]s. They
//! all render through [`write_list`], one `\t* ` bullet per child, with the
//! child's own lines pushed one tab further.

use std::fmt;

use serde::Serialize;

use crate::models::{Aggregate, Record};

/// A single check that failed for a record, in evaluation order.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Disposition,
    DkimNotAligned,
    SpfNotAligned,
    DkimAuthentication,
    SpfAuthentication,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Disposition => write!(f, "DMARC disposition failed"),
            Reason::DkimNotAligned => write!(f, "DKIM is not aligned"),
            Reason::SpfNotAligned => write!(f, "SPF is not aligned"),
            Reason::DkimAuthentication => write!(f, "DKIM authentication failed"),
            Reason::SpfAuthentication => write!(f, "SPF authentication failed"),
        }
    }
}

/// Every failed check of one record. Never empty.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub source_ip: String,
    pub reasons: Vec<Reason>,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!("Failure for source IP {}:", self.source_ip);
        write_list(f, &title, &self.reasons)
    }
}

impl std::error::Error for RecordFailure {}

/// Every failing record of a report, in document order. Never empty.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ReportFailure {
    pub records: Vec<RecordFailure>,
}

impl fmt::Display for ReportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_list(f, "Some record failed:", &self.records)
    }
}

impl std::error::Error for ReportFailure {}

/// Writes `title`, then one bullet per item. Multi-line items are trimmed and
/// every line after their first gains one more leading tab.
fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, title: &str, items: &[T]) -> fmt::Result {
    writeln!(f, "{title}")?;
    for item in items {
        let text = item.to_string();
        writeln!(f, "\t* {}", text.trim().replace('\n', "\n\t"))?;
    }
    Ok(())
}

impl Record {
    /// Failed checks, ordered: disposition, DKIM alignment, SPF alignment,
    /// DKIM authentication, SPF authentication.
    pub fn reasons(&self) -> Vec<Reason> {
        let checks = [
            (self.final_disposition_success(), Reason::Disposition),
            (self.dkim_aligned(), Reason::DkimNotAligned),
            (self.spf_aligned(), Reason::SpfNotAligned),
            (self.dkim_success(), Reason::DkimAuthentication),
            (self.spf_success(), Reason::SpfAuthentication),
        ];
        checks
            .into_iter()
            .filter(|(passed, _)| !passed)
            .map(|(_, reason)| reason)
            .collect()
    }

    /// `Ok` only when all five checks pass.
    pub fn validate(&self) -> Result<(), RecordFailure> {
        let reasons = self.reasons();
        if reasons.is_empty() {
            return Ok(());
        }
        Err(RecordFailure {
            source_ip: self.row.source_ip.clone(),
            reasons,
        })
    }
}

impl Aggregate {
    /// Records with at least one failed check, in document order.
    pub fn failed_records(&self) -> impl Iterator<Item = RecordFailure> + '_ {
        self.records.iter().filter_map(|r| r.validate().err())
    }

    /// `Ok` only when every record passes.
    pub fn validate(&self) -> Result<(), ReportFailure> {
        let records: Vec<RecordFailure> = self.failed_records().collect();
        if records.is_empty() {
            return Ok(());
        }
        Err(ReportFailure { records })
    }
}
