//! Structured error handling and exit codes.

use serde::Serialize;

use crate::report::RunReport;

/// Exit codes for the maildupe application.
///
/// - 0: Success (duplicates removed, or found in a dry run)
/// - 1: General error (unexpected failure, bad configuration, unreadable store)
/// - 2: No duplicates found
/// - 3: Partial success (completed with recoverable errors recorded)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: duplicates were found.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: every folder was processed and nothing matched.
    NoDuplicates = 2,
    /// Partial success: the run completed but recorded recoverable errors.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "MD000",
            Self::GeneralError => "MD001",
            Self::NoDuplicates => "MD002",
            Self::PartialSuccess => "MD003",
        }
    }

    /// Exit code for a finished run.
    ///
    /// Recorded errors take precedence over the duplicate count.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        let totals = report.totals();
        if totals.errors > 0 {
            Self::PartialSuccess
        } else if totals.candidates == 0 {
            Self::NoDuplicates
        } else {
            Self::Success
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "MD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Underlying causes, outermost first
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}
