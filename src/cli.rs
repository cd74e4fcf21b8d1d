//! Command-line interface definitions for maildupe.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! The CLI follows standard conventions with global options (verbosity, color) and
//! subcommands for different operations.
//!
//! # Example
//!
//! ```bash
//! # Remove duplicates from two Maildir stores
//! maildupe dedupe ~/Maildir ~/Archive
//!
//! # See what would be removed, as JSON
//! maildupe dedupe ~/Maildir --dry-run --output json
//!
//! # Match on subject and sender only, meeting requests only
//! maildupe dedupe ~/Maildir --key subject,sender_email --class IPM.Schedule.Meeting
//!
//! # Also deduplicate Sent and Trash, which are skipped by default
//! maildupe dedupe ~/Maildir --all-folders
//!
//! # Print the fingerprint of single message files
//! maildupe fingerprint ~/Maildir/cur/1700000000.123.host:2,S
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::actions::DeleteMode;
use crate::config::ConfigOverrides;
use crate::scanner::HashAlgorithm;
use crate::store::maildir::FolderLayout;
use crate::store::FieldId;

/// Remove duplicate messages from mail stores.
///
/// maildupe walks every folder of each store, groups the messages of a
/// folder by a fingerprint of their identifying fields, and keeps the first
/// message of each group.
#[derive(Debug, Parser)]
#[command(name = "maildupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (overrides the platform config file)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for maildupe.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Remove duplicate messages from one or more stores
    Dedupe(DedupeArgs),
    /// Print the fingerprint of message files
    Fingerprint(FingerprintArgs),
}

/// Settings shared by both subcommands.
#[derive(Debug, Args, Default)]
pub struct KeyArgs {
    /// Fields that identify a message, comma-separated, in hashing order
    ///
    /// Known fields: message_class, subject, normalized_subject, sender_name,
    /// sender_email, recipients, delivery_time, internet_message_id, body
    #[arg(short, long = "key", value_name = "FIELDS", value_delimiter = ',')]
    pub key_fields: Vec<FieldId>,

    /// Fingerprint digest
    #[arg(long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Maildir folder layout
    #[arg(long, value_enum)]
    pub layout: Option<FolderLayout>,
}

/// Arguments for the dedupe subcommand.
#[derive(Debug, Args)]
pub struct DedupeArgs {
    /// Store roots to process, each independently
    #[arg(value_name = "STORE", required = true)]
    pub stores: Vec<PathBuf>,

    /// Output format for the report
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    #[command(flatten)]
    pub key: KeyArgs,

    /// How duplicates are deleted
    #[arg(long, value_enum)]
    pub delete_mode: Option<DeleteMode>,

    /// Report duplicates without deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Only deduplicate messages of this class (repeatable)
    ///
    /// A class also matches its dotted subclasses: `IPM.Note` matches
    /// `IPM.Note.SMIME`.
    #[arg(long = "class", value_name = "CLASS")]
    pub classes: Vec<String>,

    /// Leave folders with this name alone (repeatable, comma-separated)
    ///
    /// Replaces the configured list, which defaults to Drafts, Junk,
    /// Outbox, Sent, Spam and Trash.
    #[arg(long = "skip-folder", value_name = "NAME", value_delimiter = ',')]
    pub skip_folders: Vec<String>,

    /// Deduplicate every folder, reserved ones included
    #[arg(long, conflicts_with = "skip_folders")]
    pub all_folders: bool,

    /// Write the effective configuration to a TOML file
    #[arg(long, value_name = "FILE")]
    pub save_config: Option<PathBuf>,
}

/// Arguments for the fingerprint subcommand.
#[derive(Debug, Args)]
pub struct FingerprintArgs {
    /// Message files
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub key: KeyArgs,
}

impl KeyArgs {
    fn apply(&self, overrides: &mut ConfigOverrides) {
        if !self.key_fields.is_empty() {
            overrides.key_fields = Some(self.key_fields.clone());
        }
        overrides.hash_algorithm = self.algorithm;
        overrides.layout = self.layout;
    }
}

impl DedupeArgs {
    /// Configuration values given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::default();
        self.key.apply(&mut overrides);
        overrides.delete_mode = self.delete_mode;
        if self.dry_run {
            overrides.dry_run = Some(true);
        }
        if !self.classes.is_empty() {
            overrides.message_classes = Some(self.classes.clone());
        }
        if self.all_folders {
            overrides.skip_folders = Some(Vec::new());
        } else if !self.skip_folders.is_empty() {
            overrides.skip_folders = Some(self.skip_folders.clone());
        }
        overrides
    }
}

impl FingerprintArgs {
    /// Configuration values given on the command line.
    #[must_use]
    pub fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::default();
        self.key.apply(&mut overrides);
        overrides
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Folder tree for the terminal
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
