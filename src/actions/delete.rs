//! Deletion of message files.
//!
//! # Overview
//!
//! A Maildir message is one file. This module removes such files in one of
//! three ways, selected by [`DeleteMode`]:
//!
//! - **flag** (default): soft delete. The file is moved into the folder's
//!   `cur/` directory with the Maildir `T` (trashed) flag added. Mail clients
//!   hide trashed messages and expunge them later.
//! - **trash**: move the file to the system trash (recoverable).
//! - **permanent**: remove the file.
//!
//! # Safety
//!
//! Callers can take a [`FileSnapshot`] when a message is opened and verify it
//! before deleting, so a file that changed in between is left alone.
//!
//! # Example
//!
//! ```no_run
//! use maildupe::actions::delete::{delete_message_file, DeleteMode};
//! use std::path::Path;
//!
//! let path = Path::new("/home/me/Maildir/cur/1700000000.M1P2.host:2,S");
//! match delete_message_file(path, DeleteMode::Flag) {
//!     Ok(result) => println!("Flagged: {:?}", result.destination),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::maildir::{split_file_name, INFO_SEPARATOR};

/// How a message file is deleted.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Add the Maildir `T` flag (soft delete)
    #[default]
    Flag,
    /// Move to the system trash
    Trash,
    /// Remove the file
    Permanent,
}

impl fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteMode::Flag => write!(f, "flag"),
            DeleteMode::Trash => write!(f, "trash"),
            DeleteMode::Permanent => write!(f, "permanent"),
        }
    }
}

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since the message was opened.
    #[error("file modified since it was opened: {0}")]
    Modified(PathBuf),

    /// The path is not inside a Maildir `cur/` or `new/` directory.
    #[error("not a maildir message file: {0}")]
    NotInMaildir(PathBuf),

    /// Renaming to the trashed name failed.
    #[error("flagging as trashed failed for {path}: {message}")]
    FlagFailed { path: PathBuf, message: String },

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {message}")]
    PermanentDeleteFailed { path: PathBuf, message: String },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::NotInMaildir(p)
            | Self::FlagFailed { path: p, .. }
            | Self::TrashFailed { path: p, .. }
            | Self::PermanentDeleteFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }

    fn from_metadata(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => DeleteError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => DeleteError::PermissionDenied(path.to_path_buf()),
            _ => DeleteError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Result of a successful deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the file in bytes.
    pub size: u64,
    /// How it was deleted.
    pub mode: DeleteMode,
    /// New location, for [`DeleteMode::Flag`].
    pub destination: Option<PathBuf>,
}

/// File metadata snapshot for change detection.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Capture a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if the file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, DeleteError> {
        let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if the file was modified, deleted, or can't be accessed.
    pub fn verify(&self) -> Result<(), DeleteError> {
        let current = Self::capture(&self.path)?;

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "Message file modified since opened: {} (mtime changed)",
                    self.path.display()
                );
                return Err(DeleteError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "Message file modified since opened: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(DeleteError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Delete a message file with the given mode.
///
/// # Errors
///
/// Returns the error of the selected primitive.
pub fn delete_message_file(path: &Path, mode: DeleteMode) -> Result<DeleteResult, DeleteError> {
    match mode {
        DeleteMode::Flag => flag_as_trashed(path),
        DeleteMode::Trash => delete_to_trash(path),
        DeleteMode::Permanent => permanent_delete(path),
    }
}

/// Delete a message file after checking it against a snapshot.
///
/// # Errors
///
/// Returns `Modified` if the file changed since `snapshot` was taken,
/// otherwise the error of the selected primitive.
pub fn delete_verified(
    snapshot: &FileSnapshot,
    mode: DeleteMode,
) -> Result<DeleteResult, DeleteError> {
    snapshot.verify()?;
    delete_message_file(&snapshot.path, mode)
}

/// Name of a message file once the `T` flag is added.
///
/// Existing flags are kept; the result lists flags in ASCII order as the
/// Maildir convention requires.
#[must_use]
pub fn trashed_file_name(file_name: &str) -> String {
    let (unique, flags) = split_file_name(file_name);
    let mut flags: Vec<char> = flags.unwrap_or("").chars().collect();
    if !flags.contains(&'T') {
        flags.push('T');
    }
    flags.sort_unstable();
    flags.dedup();
    let flags: String = flags.into_iter().collect();
    format!("{unique}{INFO_SEPARATOR}2,{flags}")
}

/// Soft-delete a message file by adding the Maildir `T` flag.
///
/// The file is renamed into the `cur/` directory of its Maildir folder.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `NotInMaildir` if the file is not in a `cur/` or `new/` directory
/// - `FlagFailed` if the rename fails
pub fn flag_as_trashed(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata(path, e))?;

    let not_in_maildir = || DeleteError::NotInMaildir(path.to_path_buf());
    let parent = path.parent().ok_or_else(not_in_maildir)?;
    let subdir = parent
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(not_in_maildir)?;
    if subdir != "cur" && subdir != "new" {
        return Err(not_in_maildir());
    }
    let folder = parent.parent().ok_or_else(not_in_maildir)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(not_in_maildir)?;

    let destination = folder.join("cur").join(trashed_file_name(file_name));
    fs::rename(path, &destination).map_err(|e| {
        log::error!("Flagging as trashed failed for {}: {}", path.display(), e);
        DeleteError::FlagFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::debug!(
        "Flagged as trashed: {} -> {}",
        path.display(),
        destination.display()
    );

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size: metadata.len(),
        mode: DeleteMode::Flag,
        destination: Some(destination),
    })
}

/// Move a message file to the system trash.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata(path, e))?;

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::debug!("Moved to trash: {}", path.display());

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size: metadata.len(),
        mode: DeleteMode::Trash,
        destination: None,
    })
}

/// Permanently delete a message file.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `PermanentDeleteFailed` if the delete operation fails
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata(path, e))?;

    fs::remove_file(path).map_err(|e| {
        log::error!("Permanent delete failed for {}: {}", path.display(), e);
        DeleteError::PermanentDeleteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::debug!("Permanently deleted: {}", path.display());

    Ok(DeleteResult {
        path: path.to_path_buf(),
        size: metadata.len(),
        mode: DeleteMode::Permanent,
        destination: None,
    })
}
