//! CSV output formatter for duplicate-removal reports.
//!
//! One row is generated for each message of each duplicate group.
//!
//! # Columns
//!
//! - `store`: Store holding the group
//! - `folder_path`: Slash-separated folder path
//! - `fingerprint`: Group fingerprint (hexadecimal)
//! - `entry_id`: Message entry id
//! - `role`: `survivor`, `removed`, `would_remove` or `failed`
//! - `reason`: Failure reason, empty unless `role` is `failed`
//!
//! # Example
//!
//! ```no_run
//! use maildupe::output::csv::CsvOutput;
//! use maildupe::report::RunReport;
//! use maildupe::scanner::{HashAlgorithm, KeyPolicy};
//!
//! let report = RunReport::new(false, HashAlgorithm::Blake3, &KeyPolicy::default());
//! CsvOutput::new(&report).write_to(std::io::stdout()).unwrap();
//! ```

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::report::RunReport;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// What happened to a message of a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Kept
    Survivor,
    /// Deleted
    Removed,
    /// Left in place by a dry run
    WouldRemove,
    /// Deletion failed
    Failed,
}

/// A single row in the CSV output.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    store: &'a str,
    folder_path: &'a str,
    fingerprint: &'a str,
    entry_id: &'a str,
    role: Role,
    reason: &'a str,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    report: &'a RunReport,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(report: &'a RunReport) -> Self {
        Self { report }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Arguments
    ///
    /// * `writer` - The writer to output to
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut rows = 0usize;

        for store in &self.report.stores {
            for entry in store.root.flatten_audit() {
                let fingerprint = entry.fingerprint.to_hex();
                let mut members: Vec<(&str, Role, &str)> =
                    vec![(entry.survivor.as_str(), Role::Survivor, "")];
                members.extend(entry.removed.iter().map(|id| (id.as_str(), Role::Removed, "")));
                members.extend(
                    entry
                        .would_remove
                        .iter()
                        .map(|id| (id.as_str(), Role::WouldRemove, "")),
                );
                members.extend(
                    entry
                        .failed
                        .iter()
                        .map(|f| (f.entry_id.as_str(), Role::Failed, f.reason.as_str())),
                );

                for (entry_id, role, reason) in members {
                    csv_writer.serialize(CsvRow {
                        store: &store.store,
                        folder_path: &entry.folder_path,
                        fingerprint: &fingerprint,
                        entry_id,
                        role,
                        reason,
                    })?;
                    rows += 1;
                }
            }
        }

        // An empty report still gets a header line.
        if rows == 0 {
            csv_writer.write_record([
                "store",
                "folder_path",
                "fingerprint",
                "entry_id",
                "role",
                "reason",
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}
