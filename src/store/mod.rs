//! Mail store access layer.
//!
//! This module defines the [`MailStore`] trait the deduplication engine talks
//! to, along with the opaque handle types it hands out and the property model
//! used for fingerprinting.
//!
//! # Architecture
//!
//! * [`guard`]: Scoped handle wrappers that release on drop.
//! * [`maildir`]: A store backed by a tree of Maildir folders on disk.
//! * [`memory`]: An in-memory store with fault injection and handle accounting.
//!
//! # Handles
//!
//! Every [`FolderHandle`] and [`MessageHandle`] returned by a store must be
//! passed back to [`MailStore::release`] exactly once. The engine never calls
//! `release` directly; it wraps each handle in a [`Scoped`] guard as soon as it
//! is acquired.
//!
//! # Example
//!
//! ```
//! use maildupe::store::memory::{MemoryMessage, MemoryStore};
//! use maildupe::store::{guard, FieldId, MailStore};
//!
//! let mut store = MemoryStore::new("Personal");
//! let inbox = store.add_folder(store.root(), "Inbox");
//! store.add_message(inbox, MemoryMessage::new("m1").with_text(FieldId::Subject, "Hello"));
//!
//! {
//!     let root = guard::root(&store).unwrap();
//!     let children = store.list_child_folders(&root).unwrap();
//!     assert_eq!(children[0].name, "Inbox");
//! }
//! assert_eq!(store.outstanding_handles(), 0);
//! ```

pub mod guard;
pub mod maildir;
pub mod memory;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use guard::{FolderGuard, MessageGuard, Scoped};

/// Opaque reference to an open folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderHandle(u64);

impl FolderHandle {
    /// Wrap a store-assigned identifier.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The store-assigned identifier.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Opaque reference to an open message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(u64);

impl MessageHandle {
    /// Wrap a store-assigned identifier.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The store-assigned identifier.
    #[must_use]
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Any handle that can be released back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    /// An open folder.
    Folder(FolderHandle),
    /// An open message.
    Message(MessageHandle),
}

impl From<FolderHandle> for Handle {
    fn from(handle: FolderHandle) -> Self {
        Handle::Folder(handle)
    }
}

impl From<MessageHandle> for Handle {
    fn from(handle: MessageHandle) -> Self {
        Handle::Message(handle)
    }
}

/// Unopened reference to a child folder, as returned by a hierarchy listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    /// Display name of the folder.
    pub name: String,
    /// Store-specific locator used by [`MailStore::open_folder`].
    pub key: String,
}

impl FolderRef {
    /// Create a folder reference.
    #[must_use]
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

/// Unopened reference to a message, as returned by a contents listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    /// Identifying key of the message (entry id).
    pub entry_id: String,
    /// Store-specific locator used by [`MailStore::open_message`].
    pub key: String,
}

impl MessageRef {
    /// Create a message reference.
    #[must_use]
    pub fn new(entry_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            key: key.into(),
        }
    }
}

/// Message properties that can feed a fingerprint.
///
/// The names returned by [`FieldId::as_str`] are stable: they are part of the
/// canonical fingerprint encoding and of the configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    /// Item class, e.g. `IPM.Note`.
    MessageClass,
    /// Subject line as stored.
    Subject,
    /// Subject with reply/forward prefixes removed.
    NormalizedSubject,
    /// Display name of the sender.
    SenderName,
    /// Email address of the sender.
    SenderEmail,
    /// Sorted recipient list (To, then Cc).
    Recipients,
    /// Delivery or sent time.
    DeliveryTime,
    /// RFC 5322 Message-ID.
    InternetMessageId,
    /// Plain text body.
    Body,
}

impl FieldId {
    /// Every known field, in declaration order.
    pub const ALL: [FieldId; 9] = [
        FieldId::MessageClass,
        FieldId::Subject,
        FieldId::NormalizedSubject,
        FieldId::SenderName,
        FieldId::SenderEmail,
        FieldId::Recipients,
        FieldId::DeliveryTime,
        FieldId::InternetMessageId,
        FieldId::Body,
    ];

    /// Stable snake_case name of the field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FieldId::MessageClass => "message_class",
            FieldId::Subject => "subject",
            FieldId::NormalizedSubject => "normalized_subject",
            FieldId::SenderName => "sender_name",
            FieldId::SenderEmail => "sender_email",
            FieldId::Recipients => "recipients",
            FieldId::DeliveryTime => "delivery_time",
            FieldId::InternetMessageId => "internet_message_id",
            FieldId::Body => "body",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldId {
    type Err = String;

    /// Parse a field name. Accepts snake_case or kebab-case, case-insensitive,
    /// plus the short aliases `class`, `from`, `to`, `date` and `message_id`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        let field = match normalized.as_str() {
            "message_class" | "class" => FieldId::MessageClass,
            "subject" => FieldId::Subject,
            "normalized_subject" => FieldId::NormalizedSubject,
            "sender_name" => FieldId::SenderName,
            "sender_email" | "from" => FieldId::SenderEmail,
            "recipients" | "to" => FieldId::Recipients,
            "delivery_time" | "date" => FieldId::DeliveryTime,
            "internet_message_id" | "message_id" => FieldId::InternetMessageId,
            "body" => FieldId::Body,
            _ => {
                let known: Vec<&str> = FieldId::ALL.iter().map(|f| f.as_str()).collect();
                return Err(format!(
                    "unknown field '{}' (expected one of: {})",
                    s,
                    known.join(", ")
                ));
            }
        };
        Ok(field)
    }
}

/// A raw property value as the store returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// UTF-8 text.
    Text(String),
    /// UTF-16 text (wide strings from stores that keep them).
    Utf16(Vec<u16>),
    /// Point in time.
    Time(DateTime<Utc>),
    /// Integer property.
    Integer(i64),
    /// Opaque binary property.
    Binary(Vec<u8>),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

/// Why a property could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    /// The message has no such property.
    #[error("property missing")]
    Missing,

    /// The property exists but the store marked it erroneous or it cannot be decoded.
    #[error("property malformed: {0}")]
    Malformed(String),
}

/// Errors reported by a mail store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The contents or hierarchy of a folder could not be enumerated.
    #[error("cannot list {target}: {reason}")]
    Listing {
        /// Folder being listed.
        target: String,
        /// Store-provided reason.
        reason: String,
    },

    /// A folder or message could not be opened.
    #[error("cannot open {target}: {reason}")]
    Open {
        /// Item being opened.
        target: String,
        /// Store-provided reason.
        reason: String,
    },

    /// The store refused to delete a message.
    #[error("cannot delete {entry_id}: {reason}")]
    Delete {
        /// Entry id of the message.
        entry_id: String,
        /// Store-provided reason.
        reason: String,
    },

    /// A handle was not issued by this store or was already released.
    #[error("unknown handle {0}")]
    UnknownHandle(u64),

    /// I/O error at the store root.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Access to one top-level mail store.
///
/// All operations block. Handles are acquired by [`root_folder`],
/// [`open_folder`] and [`open_message`]; each must be released exactly once
/// through [`release`], which must itself tolerate repeated calls.
///
/// Methods take `&self` so that scoped guards can hold a shared borrow of the
/// store while the engine keeps calling into it. Implementations keep their
/// handle tables behind interior mutability.
///
/// [`root_folder`]: MailStore::root_folder
/// [`open_folder`]: MailStore::open_folder
/// [`open_message`]: MailStore::open_message
/// [`release`]: MailStore::release
pub trait MailStore {
    /// Human-readable name of the store, used as the root of folder paths.
    fn store_name(&self) -> String;

    /// Acquire a handle on the root folder.
    fn root_folder(&self) -> Result<FolderHandle, StoreError>;

    /// Display name of an open folder.
    fn display_name(&self, folder: &FolderHandle) -> String;

    /// List direct child folders in store order. Empty when there are none.
    fn list_child_folders(&self, folder: &FolderHandle) -> Result<Vec<FolderRef>, StoreError>;

    /// Acquire a handle on a child folder.
    fn open_folder(&self, folder: &FolderRef) -> Result<FolderHandle, StoreError>;

    /// List the messages of a folder in store-native order. Empty when there are none.
    fn list_messages(&self, folder: &FolderHandle) -> Result<Vec<MessageRef>, StoreError>;

    /// Acquire a handle on a message.
    fn open_message(&self, message: &MessageRef) -> Result<MessageHandle, StoreError>;

    /// Identifying key of an open message.
    fn entry_id(&self, message: &MessageHandle) -> String;

    /// Read one property of an open message.
    fn get_property(
        &self,
        message: &MessageHandle,
        field: FieldId,
    ) -> Result<PropertyValue, PropertyError>;

    /// Delete a message according to the store's own deletion policy.
    fn delete_message(&self, message: &MessageHandle) -> Result<(), StoreError>;

    /// Release a handle. Releasing an unknown or already released handle is a no-op.
    fn release(&self, handle: Handle);
}
