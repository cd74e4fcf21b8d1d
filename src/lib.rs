//! maildupe - Duplicate Message Remover
//!
//! Walks hierarchical mail stores and, inside every folder, removes messages
//! that share a fingerprint of their identifying fields, keeping the first
//! message of each group in store order.
//!
//! # Architecture
//!
//! - [`store`]: the mail store capability ([`store::MailStore`]), scoped
//!   handle guards, a Maildir adapter and an in-memory store
//! - [`scanner`]: key policy, field accessor, fingerprint function and the
//!   recursive [`scanner::TreeWalker`]
//! - [`duplicates`]: grouping and the per-folder deduplicator
//! - [`report`]: the result tree and audit trail
//! - [`output`]: text, JSON and CSV rendering
//! - [`actions`]: file-level delete primitives used by the Maildir store
//! - [`config`], [`cli`], [`logging`], [`error`]: the application shell

pub mod actions;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod report;
pub mod scanner;
pub mod store;

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::{Cli, Commands, DedupeArgs, FingerprintArgs, OutputFormat};
use crate::config::Config;
use crate::error::ExitCode;
use crate::logging::{init_logging, LogFacade};
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::report::{RunReport, StoreReport};
use crate::scanner::{Fingerprinter, MessageAccessor, TreeWalker};
use crate::store::maildir::MaildirStore;
use crate::store::{guard, MailStore};

/// Run the application for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unreadable store root or
/// a failure writing the report.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    init_logging(cli.verbose, cli.quiet);
    log::debug!("Log level: {}", logging::current_level_name());

    let color = !cli.no_color && io::stdout().is_terminal();
    match &cli.command {
        Commands::Dedupe(args) => run_dedupe(args, cli.config.as_deref(), color),
        Commands::Fingerprint(args) => run_fingerprint(args, cli.config.as_deref()),
    }
}

/// Deduplicate every store named in `args` and print the report.
///
/// Every store root is opened before any folder is processed, so a bad path
/// fails the run without touching the other stores.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unreadable store root or
/// a failure writing the report.
pub fn run_dedupe(args: &DedupeArgs, config_path: Option<&Path>, color: bool) -> Result<ExitCode> {
    let config = Config::load(config_path, &args.overrides())?;
    if let Some(path) = &args.save_config {
        config
            .save(path)
            .with_context(|| format!("Cannot save config to {}", path.display()))?;
        log::info!("Saved configuration to {}", path.display());
    }
    let policy = config.key_policy()?;
    log::debug!(
        "Key policy: {policy}; digest {}; dry run {}",
        config.hash_algorithm,
        config.dry_run
    );

    let stores = args
        .stores
        .iter()
        .map(|path| {
            MaildirStore::open(path, config.maildir_options())
                .with_context(|| format!("Cannot open store {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let logger = LogFacade::default();
    let mut report = RunReport::new(config.dry_run, config.hash_algorithm, &policy);
    for store in &stores {
        let walker = TreeWalker::new(store, &policy, config.dedup_options(), &logger);
        let root = walker.walk_root();
        log::info!(
            "Store {}: {} duplicates {}",
            store.store_name(),
            if config.dry_run {
                root.totals().candidates
            } else {
                root.total_removed()
            },
            if config.dry_run { "found" } else { "removed" }
        );
        report.push(StoreReport::new(store.store_name(), root));
    }
    report.finish();

    let exit_code = ExitCode::from_report(&report);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(&report, color).write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(&report, exit_code).write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(&report).write_to(&mut out)?,
    }
    out.flush()?;

    Ok(exit_code)
}

/// Print the fingerprint of each message file in `args`.
///
/// A file that cannot be opened is reported and skipped.
///
/// # Errors
///
/// Returns an error for invalid configuration or a failure writing output.
pub fn run_fingerprint(args: &FingerprintArgs, config_path: Option<&Path>) -> Result<ExitCode> {
    let config = Config::load(config_path, &args.overrides())?;
    let policy = config.key_policy()?;
    let logger = LogFacade::default();
    let accessor = MessageAccessor::new(&policy, &logger);
    let fingerprinter = Fingerprinter::new(config.hash_algorithm);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut failures = 0usize;

    for file in &args.files {
        match fingerprint_file(file, &config, &accessor, &fingerprinter) {
            Ok(hex) => writeln!(out, "{hex}  {}", file.display())?,
            Err(e) => {
                log::error!("{:#}", e);
                failures += 1;
            }
        }
    }
    out.flush()?;

    Ok(if failures > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    })
}

fn fingerprint_file(
    file: &Path,
    config: &Config,
    accessor: &MessageAccessor<'_>,
    fingerprinter: &Fingerprinter,
) -> Result<String> {
    let folder = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let store = MaildirStore::open(&folder, config.maildir_options())
        .with_context(|| format!("Cannot open {}", file.display()))?;
    let message_ref = MaildirStore::message_ref(file)
        .with_context(|| format!("Not a message file: {}", file.display()))?;
    let message = guard::open_message(&store, &message_ref)
        .with_context(|| format!("Cannot open {}", file.display()))?;

    let (values, report) = accessor.read_fields(&store, &message);
    if report.degraded() > 0 {
        log::debug!("{} degraded field(s) in {}", report.degraded(), file.display());
    }
    Ok(fingerprinter.fingerprint(&values).to_hex())
}
