//! JSON output formatter for duplicate-removal reports.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "summary": {
//!     "dry_run": false,
//!     "algorithm": "blake3",
//!     "key_fields": ["message_class", "subject"],
//!     "stores": 1,
//!     "folders": 3,
//!     "messages_scanned": 12,
//!     "duplicate_groups": 2,
//!     "candidates": 3,
//!     "removed": 3,
//!     "errors": 0,
//!     "duration_ms": 40,
//!     "exit_code": 0,
//!     "exit_code_name": "MD000"
//!   },
//!   "stores": [ { "store": "Personal", "root": { "name": "...", "child_results": [] } } ],
//!   "audit": [
//!     {
//!       "store": "Personal",
//!       "folder_path": "Personal/Inbox",
//!       "fingerprint": "ab12...",
//!       "survivor": "m1",
//!       "removed": ["m2"],
//!       "would_remove": [],
//!       "failed": []
//!     }
//!   ]
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::error::ExitCode;
use crate::report::{AuditEntry, RunReport, StoreReport};
use crate::scanner::HashAlgorithm;
use crate::store::FieldId;

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Whether deletions were suppressed
    pub dry_run: bool,
    /// Fingerprint digest
    pub algorithm: HashAlgorithm,
    /// Fields that identify a message
    pub key_fields: Vec<FieldId>,
    /// Number of stores processed
    pub stores: usize,
    /// Number of folders processed
    pub folders: usize,
    /// Messages fingerprinted
    pub messages_scanned: usize,
    /// Messages skipped (unopenable or filtered out)
    pub messages_skipped: usize,
    /// Fields that fell back to the empty string
    pub degraded_fields: usize,
    /// Groups with two or more messages
    pub duplicate_groups: usize,
    /// Removal candidates (group members other than the survivor)
    pub candidates: usize,
    /// Messages actually removed
    pub removed: usize,
    /// Recoverable errors recorded
    pub errors: usize,
    /// Run duration in milliseconds
    pub duration_ms: u64,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "MD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Summarize a run report.
    #[must_use]
    pub fn from_report(report: &RunReport, exit_code: ExitCode) -> Self {
        let totals = report.totals();
        Self {
            dry_run: report.dry_run,
            algorithm: report.algorithm,
            key_fields: report.key_fields.clone(),
            stores: report.stores.len(),
            folders: totals.folders,
            messages_scanned: totals.messages_scanned,
            messages_skipped: totals.messages_skipped,
            degraded_fields: totals.degraded_fields,
            duplicate_groups: totals.groups,
            candidates: totals.candidates,
            removed: totals.removed,
            errors: totals.errors,
            duration_ms: report
                .duration()
                .and_then(|d| u64::try_from(d.num_milliseconds()).ok())
                .unwrap_or(0),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// One audit line with its store.
#[derive(Debug, Clone, Serialize)]
pub struct JsonAuditEntry {
    /// Store holding the group
    pub store: String,
    /// Group details
    #[serde(flatten)]
    pub entry: AuditEntry,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Run summary
    pub summary: JsonSummary,
    /// Per-store folder trees
    pub stores: &'a [StoreReport],
    /// Every duplicate group, flattened
    pub audit: Vec<JsonAuditEntry>,
}

impl<'a> JsonOutput<'a> {
    /// Create JSON output for a finished run.
    ///
    /// # Arguments
    ///
    /// * `report` - The run report
    /// * `exit_code` - The exit code for this run
    #[must_use]
    pub fn new(report: &'a RunReport, exit_code: ExitCode) -> Self {
        let audit = report
            .stores
            .iter()
            .flat_map(|store| {
                store
                    .root
                    .flatten_audit()
                    .into_iter()
                    .map(move |entry| JsonAuditEntry {
                        store: store.store.clone(),
                        entry,
                    })
            })
            .collect();
        Self {
            summary: JsonSummary::from_report(report, exit_code),
            stores: &report.stores,
            audit,
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer.
    ///
    /// # Arguments
    ///
    /// * `writer` - The writer to output to (e.g., stdout)
    /// * `pretty` - Whether to pretty-print the output
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
