//! Duplicate-removal report.
//!
//! A walk produces one [`FolderResult`] tree per store. The tree is built
//! bottom-up by the walker and is never modified afterwards. Each node carries
//! the folder's own counts, an audit record per duplicate group and the
//! recoverable errors met while processing it.
//!
//! [`RunReport`] collects one [`StoreReport`] per top-level store and is what
//! the output formatters consume.

use std::ops::{Add, AddAssign};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::scanner::{Fingerprint, HashAlgorithm, KeyPolicy};
use crate::store::FieldId;

/// A recoverable error recorded on a folder.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FolderError {
    /// The folder's messages could not be listed.
    #[error("Cannot list messages of {folder}: {reason}")]
    MessageListing {
        /// Folder path
        folder: String,
        /// Store-provided reason
        reason: String,
    },

    /// The folder's children could not be listed.
    #[error("Cannot list child folders of {folder}: {reason}")]
    ChildListing {
        /// Folder path
        folder: String,
        /// Store-provided reason
        reason: String,
    },

    /// A folder or message handle could not be acquired.
    #[error("Cannot open {target}: {reason}")]
    HandleAcquisition {
        /// Folder path or message entry id
        target: String,
        /// Store-provided reason
        reason: String,
    },

    /// A removal candidate could not be deleted.
    #[error("Cannot delete {entry_id}: {reason}")]
    Deletion {
        /// Entry id of the candidate
        entry_id: String,
        /// Store-provided reason
        reason: String,
    },
}

/// A candidate whose deletion failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageFailure {
    /// Entry id of the candidate
    pub entry_id: String,
    /// Why the deletion failed
    pub reason: String,
}

/// Audit record for one group of 2+ duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    /// Shared fingerprint
    pub fingerprint: Fingerprint,
    /// Entry id of the kept message
    pub survivor: String,
    /// Candidates the store confirmed deleted
    pub removed: Vec<String>,
    /// Candidates left in place by a dry run
    pub would_remove: Vec<String>,
    /// Candidates whose deletion failed
    pub failed: Vec<MessageFailure>,
}

impl GroupRecord {
    /// Create a record with no candidates yet.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, survivor: impl Into<String>) -> Self {
        Self {
            fingerprint,
            survivor: survivor.into(),
            removed: Vec::new(),
            would_remove: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of removal candidates in this group.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.removed.len() + self.would_remove.len() + self.failed.len()
    }
}

/// Outcome of processing one folder and its subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FolderResult {
    /// Display name of the folder
    pub name: String,
    /// Slash-separated path from the store root
    pub path: String,
    /// Messages removed from this folder (not including children)
    pub duplicates_removed: usize,
    /// Removal candidates found in this folder
    pub candidates: usize,
    /// Messages fingerprinted in this folder
    pub messages_scanned: usize,
    /// Messages skipped (unopenable or filtered out by class)
    pub messages_skipped: usize,
    /// Fields that fell back to the empty string
    pub degraded_fields: usize,
    /// One record per duplicate group
    pub groups: Vec<GroupRecord>,
    /// Recoverable errors met in this folder
    pub errors: Vec<FolderError>,
    /// Results for child folders, in listing order
    pub child_results: Vec<FolderResult>,
}

/// One flattened audit line: a duplicate group and the folder it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    /// Path of the folder holding the group
    pub folder_path: String,
    /// Shared fingerprint
    pub fingerprint: Fingerprint,
    /// Entry id of the kept message
    pub survivor: String,
    /// Candidates deleted
    pub removed: Vec<String>,
    /// Candidates a dry run would delete
    pub would_remove: Vec<String>,
    /// Candidates whose deletion failed
    pub failed: Vec<MessageFailure>,
}

impl FolderResult {
    /// An empty result for a folder with no messages and no children.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Messages removed in the whole subtree.
    #[must_use]
    pub fn total_removed(&self) -> usize {
        self.duplicates_removed
            + self
                .child_results
                .iter()
                .map(FolderResult::total_removed)
                .sum::<usize>()
    }

    /// Aggregate counts over the subtree.
    #[must_use]
    pub fn totals(&self) -> Totals {
        let own = Totals {
            removed: self.duplicates_removed,
            candidates: self.candidates,
            folders: 1,
            groups: self.groups.len(),
            messages_scanned: self.messages_scanned,
            messages_skipped: self.messages_skipped,
            degraded_fields: self.degraded_fields,
            errors: self.errors.len(),
        };
        self.child_results
            .iter()
            .fold(own, |acc, child| acc + child.totals())
    }

    /// Every folder of the subtree with its depth, in pre-order.
    #[must_use]
    pub fn descendants(&self) -> Vec<(usize, &FolderResult)> {
        let mut out = Vec::new();
        self.collect_descendants(0, &mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a FolderResult)>) {
        out.push((depth, self));
        for child in &self.child_results {
            child.collect_descendants(depth + 1, out);
        }
    }

    /// Every duplicate group of the subtree, in pre-order.
    #[must_use]
    pub fn flatten_audit(&self) -> Vec<AuditEntry> {
        self.descendants()
            .into_iter()
            .flat_map(|(_, folder)| {
                folder.groups.iter().map(move |group| AuditEntry {
                    folder_path: folder.path.clone(),
                    fingerprint: group.fingerprint,
                    survivor: group.survivor.clone(),
                    removed: group.removed.clone(),
                    would_remove: group.would_remove.clone(),
                    failed: group.failed.clone(),
                })
            })
            .collect()
    }

    /// Every recorded error of the subtree with the path of its folder.
    #[must_use]
    pub fn all_errors(&self) -> Vec<(&str, &FolderError)> {
        self.descendants()
            .into_iter()
            .flat_map(|(_, folder)| folder.errors.iter().map(move |e| (folder.path.as_str(), e)))
            .collect()
    }
}

/// Summed counts. Addition is associative and [`Totals::default`] is its identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Messages removed
    pub removed: usize,
    /// Removal candidates
    pub candidates: usize,
    /// Folders processed
    pub folders: usize,
    /// Duplicate groups
    pub groups: usize,
    /// Messages fingerprinted
    pub messages_scanned: usize,
    /// Messages skipped
    pub messages_skipped: usize,
    /// Degraded fields
    pub degraded_fields: usize,
    /// Recoverable errors
    pub errors: usize,
}

impl Totals {
    /// Combine two totals.
    #[must_use]
    pub fn merge(self, other: Totals) -> Totals {
        Totals {
            removed: self.removed + other.removed,
            candidates: self.candidates + other.candidates,
            folders: self.folders + other.folders,
            groups: self.groups + other.groups,
            messages_scanned: self.messages_scanned + other.messages_scanned,
            messages_skipped: self.messages_skipped + other.messages_skipped,
            degraded_fields: self.degraded_fields + other.degraded_fields,
            errors: self.errors + other.errors,
        }
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, other: Totals) -> Totals {
        self.merge(other)
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, other: Totals) {
        *self = self.merge(other);
    }
}

/// Result of walking one top-level store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreReport {
    /// Store name
    pub store: String,
    /// Folder tree, rooted at the store's root folder
    pub root: FolderResult,
}

impl StoreReport {
    /// Wrap a walk result.
    #[must_use]
    pub fn new(store: impl Into<String>, root: FolderResult) -> Self {
        Self {
            store: store.into(),
            root,
        }
    }

    /// Totals over the whole store.
    #[must_use]
    pub fn totals(&self) -> Totals {
        self.root.totals()
    }
}

/// Report for a whole run over one or more stores.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: Option<DateTime<Utc>>,
    /// Whether deletions were suppressed
    pub dry_run: bool,
    /// Fingerprint digest
    pub algorithm: HashAlgorithm,
    /// Fields that identify a message
    pub key_fields: Vec<FieldId>,
    /// Per-store results, in processing order
    pub stores: Vec<StoreReport>,
}

impl RunReport {
    /// Start a report now.
    #[must_use]
    pub fn new(dry_run: bool, algorithm: HashAlgorithm, policy: &KeyPolicy) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            algorithm,
            key_fields: policy.fields().to_vec(),
            stores: Vec::new(),
        }
    }

    /// Append a store's result.
    pub fn push(&mut self, store: StoreReport) {
        self.stores.push(store);
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Totals over every store.
    #[must_use]
    pub fn totals(&self) -> Totals {
        self.stores
            .iter()
            .map(StoreReport::totals)
            .fold(Totals::default(), |acc, totals| acc + totals)
    }

    /// Wall-clock duration, once finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.finished_at.map(|end| end - self.started_at)
    }
}
