//! File actions module.
//!
//! The delete module provides the file-level primitives behind the Maildir
//! store's deletion policies:
//! - Soft delete by adding the Maildir `T` flag (default)
//! - Move to system trash (recoverable)
//! - Permanent deletion
//! - Snapshot verification to leave modified files alone
//!
//! ```no_run
//! use maildupe::actions::delete::{delete_message_file, DeleteMode};
//! use std::path::Path;
//!
//! let result = delete_message_file(Path::new("Maildir/cur/123.host:2,S"), DeleteMode::Trash);
//! ```

pub mod delete;

// Re-export commonly used types
pub use delete::{
    delete_message_file, delete_to_trash, delete_verified, flag_as_trashed, permanent_delete,
    trashed_file_name, DeleteError, DeleteMode, DeleteResult, FileSnapshot,
};
