//! Duplicate detection and removal.
//!
//! This module provides functionality for:
//! - Grouping messages by fingerprint in first-seen order
//! - Selecting one survivor per group
//! - Removing the other members of a folder's groups

pub mod folder;
pub mod groups;

pub use folder::{DedupOptions, FolderDeduplicator, FolderPass, Synopsis};
pub use groups::{group_by_fingerprint, DuplicateGroup, FingerprintGroups, GroupingStats};
