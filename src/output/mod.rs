//! Output formatters for duplicate-removal reports.
//!
//! This module renders a [`RunReport`] in different formats:
//! - Text for people at a terminal (folder tree with counts)
//! - JSON for automation and scripting
//! - CSV for spreadsheet import (one row per message in a duplicate group)
//!
//! # Example
//!
//! ```no_run
//! use maildupe::output::json::JsonOutput;
//! use maildupe::report::RunReport;
//! use maildupe::scanner::{HashAlgorithm, KeyPolicy};
//!
//! let report = RunReport::new(true, HashAlgorithm::Blake3, &KeyPolicy::default());
//! let output = JsonOutput::new(&report, maildupe::error::ExitCode::NoDuplicates);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```
//!
//! [`RunReport`]: crate::report::RunReport

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;
