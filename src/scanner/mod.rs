//! Scanner module for store traversal and message fingerprinting.
//!
//! This module provides functionality for:
//! - Reading the identifying fields of a message
//! - Content fingerprinting with BLAKE3 or SHA-256
//! - Depth-first traversal of a store's folder tree
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`accessor`]: Field extraction with graceful degradation
//! - [`fingerprint`]: Canonical encoding and digest
//! - [`walker`]: Recursive folder walk
//!
//! # Example
//!
//! ```
//! use maildupe::logging::RecordingLogger;
//! use maildupe::duplicates::DedupOptions;
//! use maildupe::scanner::{KeyPolicy, TreeWalker};
//! use maildupe::store::memory::{MemoryMessage, MemoryStore};
//! use maildupe::store::FieldId;
//!
//! let mut store = MemoryStore::new("Personal");
//! let inbox = store.add_folder(store.root(), "Inbox");
//! for id in ["a", "b"] {
//!     store.add_message(inbox, MemoryMessage::new(id).with_text(FieldId::Subject, "Hello"));
//! }
//!
//! let policy = KeyPolicy::class_and_subject();
//! let logger = RecordingLogger::new();
//! let walker = TreeWalker::new(&store, &policy, DedupOptions::default(), &logger);
//! let result = walker.walk_root();
//!
//! assert_eq!(result.total_removed(), 1);
//! assert_eq!(store.message_ids(inbox), vec!["a".to_string()]);
//! ```

pub mod accessor;
pub mod fingerprint;
pub mod walker;

use crate::store::FieldId;

// Re-export main types
pub use accessor::{value_to_text, FieldReport, FieldStatus, MessageAccessor};
pub use fingerprint::{
    fingerprint, hash_to_hex, normalize_text, FieldValues, Fingerprint,
    Fingerprinter, Hash, HashAlgorithm,
};
pub use walker::TreeWalker;

/// Ordered, de-duplicated list of fields that identify a message.
///
/// The order is significant: it is the order in which fields are fed to the
/// fingerprint digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPolicy {
    fields: Vec<FieldId>,
}

impl KeyPolicy {
    /// Create a policy from a list of fields.
    ///
    /// Repeated fields are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Empty`] if no field is given.
    pub fn new(fields: impl IntoIterator<Item = FieldId>) -> Result<Self, PolicyError> {
        let mut unique = Vec::new();
        for field in fields {
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        if unique.is_empty() {
            return Err(PolicyError::Empty);
        }
        Ok(Self { fields: unique })
    }

    /// Message class and subject only.
    #[must_use]
    pub fn class_and_subject() -> Self {
        Self {
            fields: vec![FieldId::MessageClass, FieldId::Subject],
        }
    }

    /// Fields in hashing order.
    #[must_use]
    pub fn fields(&self) -> &[FieldId] {
        &self.fields
    }

    /// Whether the policy includes `field`.
    #[must_use]
    pub fn contains(&self, field: FieldId) -> bool {
        self.fields.contains(&field)
    }
}

impl Default for KeyPolicy {
    /// Class, subject, sender address, delivery time and body.
    fn default() -> Self {
        Self {
            fields: vec![
                FieldId::MessageClass,
                FieldId::Subject,
                FieldId::SenderEmail,
                FieldId::DeliveryTime,
                FieldId::Body,
            ],
        }
    }
}

impl std::fmt::Display for KeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|field| field.as_str()).collect();
        write!(f, "{}", names.join(","))
    }
}

/// Errors building a [`KeyPolicy`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// The policy names no field at all.
    #[error("Key policy must name at least one field")]
    Empty,
}
