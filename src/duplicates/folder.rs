//! Per-folder duplicate removal.
//!
//! # Overview
//!
//! [`FolderDeduplicator::process_folder`] runs one pass over a single folder:
//!
//! 1. List the folder's messages. The listing is fully materialized before
//!    anything is deleted.
//! 2. Open each message, fingerprint it and release it again. Only its
//!    [`MessageRef`] and [`Synopsis`] are kept. Unopenable messages are skipped.
//! 3. In every group of two or more, keep the first message. Each other
//!    member is reopened by reference and deleted, in enumeration order. A
//!    failed reopen or deletion affects only that candidate.
//!
//! At most one message handle is open at any time. Each is held by a
//! [`MessageGuard`] and released when the guard drops.
//!
//! [`MessageGuard`]: crate::store::MessageGuard

use std::fmt;

use crate::logging::Logger;
use crate::report::{FolderError, FolderResult, GroupRecord, MessageFailure};
use crate::scanner::{
    value_to_text, Fingerprint, Fingerprinter, HashAlgorithm, KeyPolicy, MessageAccessor,
};
use crate::store::{guard, FieldId, FolderHandle, MailStore, MessageHandle, MessageRef};

use super::groups::group_by_fingerprint;

/// Options shared by every folder pass of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupOptions {
    /// Report candidates without deleting them
    pub dry_run: bool,
    /// Only consider messages of these classes (empty means all)
    pub message_classes: Vec<String>,
    /// Fingerprint digest
    pub algorithm: HashAlgorithm,
    /// Child folders that are never visited (case-insensitive names)
    pub skip_folders: Vec<String>,
}

impl DedupOptions {
    /// Set dry-run mode.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Restrict processing to the given message classes.
    #[must_use]
    pub fn message_classes(mut self, classes: Vec<String>) -> Self {
        self.message_classes = classes;
        self
    }

    /// Set the fingerprint digest.
    #[must_use]
    pub fn algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Never descend into child folders with these names.
    #[must_use]
    pub fn skip_folders(mut self, names: Vec<String>) -> Self {
        self.skip_folders = names;
        self
    }

    /// Whether a child folder named `name` is left alone.
    #[must_use]
    pub fn skips_folder(&self, name: &str) -> bool {
        self.skip_folders
            .iter()
            .any(|skipped| skipped.eq_ignore_ascii_case(name))
    }

    /// Whether a message of class `class` is processed.
    ///
    /// Matching is case-insensitive. A configured class also matches its
    /// dotted subclasses, so `IPM.Note` accepts `IPM.Note.SMIME`.
    #[must_use]
    pub fn accepts_class(&self, class: &str) -> bool {
        if self.message_classes.is_empty() {
            return true;
        }
        let class = class.to_ascii_lowercase();
        self.message_classes.iter().any(|wanted| {
            let wanted = wanted.to_ascii_lowercase();
            class == wanted
                || class
                    .strip_prefix(&wanted)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Outcome of one folder pass, before child folders are attached.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderPass {
    /// Candidates whose deletion the store confirmed
    pub removed: usize,
    /// Removal candidates found
    pub candidates: usize,
    /// Messages fingerprinted
    pub messages_scanned: usize,
    /// Messages skipped
    pub messages_skipped: usize,
    /// Fields that fell back to the empty string
    pub degraded_fields: usize,
    /// Audit records for groups of 2+
    pub groups: Vec<GroupRecord>,
    /// Recoverable errors
    pub errors: Vec<FolderError>,
}

impl FolderPass {
    /// Turn the pass into a [`FolderResult`] with the given children.
    #[must_use]
    pub fn into_result(
        self,
        name: impl Into<String>,
        path: impl Into<String>,
        child_results: Vec<FolderResult>,
    ) -> FolderResult {
        FolderResult {
            name: name.into(),
            path: path.into(),
            duplicates_removed: self.removed,
            candidates: self.candidates,
            messages_scanned: self.messages_scanned,
            messages_skipped: self.messages_skipped,
            degraded_fields: self.degraded_fields,
            groups: self.groups,
            errors: self.errors,
            child_results,
        }
    }
}

/// Sent time, sender and subject of a message.
///
/// A kept message and each of its duplicates are expected to agree on these
/// even when the key policy ignores some of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Synopsis {
    /// Delivery time as canonical text
    pub delivery_time: Option<String>,
    /// Sender email address
    pub sender: Option<String>,
    /// Subject line
    pub subject: Option<String>,
}

impl Synopsis {
    /// Read the synopsis of an open message. Unreadable fields are `None`.
    #[must_use]
    pub fn read<S: MailStore + ?Sized>(store: &S, message: &MessageHandle) -> Self {
        let text = |field: FieldId| {
            store
                .get_property(message, field)
                .and_then(value_to_text)
                .ok()
        };
        Self {
            delivery_time: text(FieldId::DeliveryTime),
            sender: text(FieldId::SenderEmail),
            subject: text(FieldId::Subject),
        }
    }
}

impl fmt::Display for Synopsis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "sent {}, from {}, \"{}\"",
            show(&self.delivery_time),
            show(&self.sender),
            show(&self.subject)
        )
    }
}

/// A fingerprinted message waiting for its group to be resolved.
///
/// Holds no handle: candidates are reopened by reference when removed.
struct Member {
    message: MessageRef,
    entry_id: String,
    synopsis: Synopsis,
}

impl Member {
    fn subject(&self) -> &str {
        self.synopsis.subject.as_deref().unwrap_or_default()
    }
}

/// Removes duplicates inside single folders.
pub struct FolderDeduplicator<'a, S: MailStore + ?Sized> {
    store: &'a S,
    policy: &'a KeyPolicy,
    options: DedupOptions,
    logger: &'a dyn Logger,
    fingerprinter: Fingerprinter,
}

impl<'a, S: MailStore + ?Sized> FolderDeduplicator<'a, S> {
    /// Create a deduplicator.
    ///
    /// # Arguments
    ///
    /// * `store` - Store holding the folders to process
    /// * `policy` - Fields that identify a message
    /// * `options` - Dry run, class filter, digest and skipped folders
    /// * `logger` - Diagnostic sink
    #[must_use]
    pub fn new(
        store: &'a S,
        policy: &'a KeyPolicy,
        options: DedupOptions,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            store,
            policy,
            fingerprinter: Fingerprinter::new(options.algorithm),
            options,
            logger,
        }
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &DedupOptions {
        &self.options
    }

    /// Remove duplicates among the messages of `folder`.
    ///
    /// Never fails: listing, open and delete failures are logged and recorded
    /// on the returned pass.
    pub fn process_folder(&self, folder: &FolderHandle, path: &str) -> FolderPass {
        let mut pass = FolderPass::default();

        let listing = match self.store.list_messages(folder) {
            Ok(listing) => listing,
            Err(e) => {
                self.logger
                    .error(&format!("Cannot list messages of {path}: {e}"));
                pass.errors.push(FolderError::MessageListing {
                    folder: path.to_string(),
                    reason: e.to_string(),
                });
                return pass;
            }
        };

        if listing.is_empty() {
            self.logger.debug(&format!("{path}: no messages"));
            return pass;
        }

        let accessor = MessageAccessor::new(self.policy, self.logger);
        let mut fingerprinted = Vec::with_capacity(listing.len());

        for message_ref in listing {
            let message = match guard::open_message(self.store, &message_ref) {
                Ok(message) => message,
                Err(e) => {
                    self.logger.warn(&format!(
                        "Skipping message {} in {path}: {e}",
                        message_ref.entry_id
                    ));
                    pass.errors.push(FolderError::HandleAcquisition {
                        target: message_ref.entry_id.clone(),
                        reason: e.to_string(),
                    });
                    pass.messages_skipped += 1;
                    continue;
                }
            };

            if !self.options.message_classes.is_empty() {
                let class = accessor
                    .read_one(self.store, &message, FieldId::MessageClass)
                    .unwrap_or_default();
                if !self.options.accepts_class(&class) {
                    self.logger.debug(&format!(
                        "Ignoring message {} of class '{class}'",
                        message_ref.entry_id
                    ));
                    pass.messages_skipped += 1;
                    continue;
                }
            }

            let (values, field_report) = accessor.read_fields(self.store, &message);
            pass.degraded_fields += field_report.degraded();
            pass.messages_scanned += 1;

            let fingerprint = self.fingerprinter.fingerprint(&values);
            let member = Member {
                entry_id: self.store.entry_id(&message),
                synopsis: Synopsis::read(self.store, &message),
                message: message_ref,
            };
            drop(message);
            fingerprinted.push((fingerprint, member));
        }

        let (groups, stats) = group_by_fingerprint(fingerprinted);
        pass.candidates = stats.candidates;

        for group in groups {
            let fingerprint = group.fingerprint;
            let Some((survivor, candidates)) = group.into_parts() else {
                continue;
            };
            if candidates.is_empty() {
                continue;
            }
            let record = self.resolve_group(fingerprint, &survivor, candidates, path, &mut pass);
            pass.groups.push(record);
        }

        if pass.candidates > 0 {
            self.logger.info(&format!(
                "{path}: {} duplicate(s) {}, {} message(s) scanned",
                if self.options.dry_run {
                    pass.candidates
                } else {
                    pass.removed
                },
                if self.options.dry_run {
                    "would be removed"
                } else {
                    "removed"
                },
                pass.messages_scanned
            ));
        }

        pass
    }

    fn resolve_group(
        &self,
        fingerprint: Fingerprint,
        survivor: &Member,
        candidates: Vec<Member>,
        path: &str,
        pass: &mut FolderPass,
    ) -> GroupRecord {
        let mut record = GroupRecord::new(fingerprint, survivor.entry_id.clone());
        self.logger.info(&format!(
            "Keeping {} \"{}\" in {path}",
            survivor.entry_id,
            survivor.subject()
        ));

        for candidate in candidates {
            if candidate.synopsis != survivor.synopsis {
                self.logger.error(&format!(
                    "Duplicate messages don't seem to match: kept {} ({}), duplicate {} ({})",
                    survivor.entry_id, survivor.synopsis, candidate.entry_id, candidate.synopsis
                ));
            }

            if self.options.dry_run {
                self.logger.info(&format!(
                    "WOULD remove {} \"{}\"",
                    candidate.entry_id,
                    candidate.subject()
                ));
                record.would_remove.push(candidate.entry_id);
                continue;
            }

            let message = match guard::open_message(self.store, &candidate.message) {
                Ok(message) => message,
                Err(e) => {
                    self.logger.error(&format!(
                        "Cannot reopen {} for removal: {e}",
                        candidate.entry_id
                    ));
                    pass.errors.push(FolderError::HandleAcquisition {
                        target: candidate.entry_id.clone(),
                        reason: e.to_string(),
                    });
                    record.failed.push(MessageFailure {
                        entry_id: candidate.entry_id,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match self.store.delete_message(&message) {
                Ok(()) => {
                    self.logger.info(&format!(
                        "Removing {} \"{}\"",
                        candidate.entry_id,
                        candidate.subject()
                    ));
                    pass.removed += 1;
                    record.removed.push(candidate.entry_id);
                }
                Err(e) => {
                    self.logger
                        .error(&format!("Failed to remove {}: {e}", candidate.entry_id));
                    pass.errors.push(FolderError::Deletion {
                        entry_id: candidate.entry_id.clone(),
                        reason: e.to_string(),
                    });
                    record.failed.push(MessageFailure {
                        entry_id: candidate.entry_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        record
    }
}
