//! Recursive folder traversal.
//!
//! # Overview
//!
//! [`TreeWalker`] visits a store's folder tree depth-first. Each folder's own
//! messages are deduplicated before its children are visited (pre-order),
//! and children are visited in the order the store lists them.
//!
//! Failures stay local: a folder whose children cannot be listed is treated
//! as a leaf, and a child that cannot be opened is skipped. Both are logged
//! and recorded on the parent's [`FolderResult`]. Every folder handle is held
//! by a [`FolderGuard`] and released before the next sibling is opened.
//!
//! Folders named in [`DedupOptions::skip_folders`] are never opened, so
//! neither they nor anything below them is deduplicated.
//!
//! [`FolderGuard`]: crate::store::FolderGuard

use crate::duplicates::{DedupOptions, FolderDeduplicator};
use crate::logging::Logger;
use crate::report::{FolderError, FolderResult};
use crate::store::{guard, FolderHandle, MailStore};

use super::KeyPolicy;

/// Depth-first walker over one store.
pub struct TreeWalker<'a, S: MailStore + ?Sized> {
    store: &'a S,
    logger: &'a dyn Logger,
    dedup: FolderDeduplicator<'a, S>,
}

impl<'a, S: MailStore + ?Sized> TreeWalker<'a, S> {
    /// Create a walker.
    ///
    /// # Arguments
    ///
    /// * `store` - Store to walk
    /// * `policy` - Fields that identify a message
    /// * `options` - Dry run, class filter and digest
    /// * `logger` - Diagnostic sink shared with the deduplicator
    #[must_use]
    pub fn new(
        store: &'a S,
        policy: &'a KeyPolicy,
        options: DedupOptions,
        logger: &'a dyn Logger,
    ) -> Self {
        Self {
            store,
            logger,
            dedup: FolderDeduplicator::new(store, policy, options, logger),
        }
    }

    /// Walk the whole store, starting at its root folder.
    ///
    /// If the root cannot be opened the result is an empty folder carrying
    /// the error.
    pub fn walk_root(&self) -> FolderResult {
        let store_name = self.store.store_name();
        match guard::root(self.store) {
            Ok(root) => {
                let display = self.store.display_name(&root);
                let path = if display.is_empty() {
                    store_name
                } else {
                    display
                };
                self.walk(&root, &path)
            }
            Err(e) => {
                self.logger
                    .error(&format!("Cannot open root of store {store_name}: {e}"));
                let mut result = FolderResult::new(store_name.clone(), store_name.clone());
                result.errors.push(FolderError::HandleAcquisition {
                    target: store_name,
                    reason: e.to_string(),
                });
                result
            }
        }
    }

    /// Process `folder` and, recursively, all of its children.
    ///
    /// # Arguments
    ///
    /// * `folder` - Open handle on the folder; the caller keeps ownership
    /// * `path` - Slash-separated path used in diagnostics and the audit
    pub fn walk(&self, folder: &FolderHandle, path: &str) -> FolderResult {
        self.logger.info(&format!("Folder: {path}"));
        let name = self.store.display_name(folder);

        let mut pass = self.dedup.process_folder(folder, path);
        let mut child_results = Vec::new();

        match self.store.list_child_folders(folder) {
            Ok(children) => {
                for child in children {
                    let child_path = format!("{path}/{}", child.name);
                    if self.dedup.options().skips_folder(&child.name) {
                        self.logger
                            .info(&format!("Skipping reserved folder {child_path}"));
                        continue;
                    }
                    match guard::open_folder(self.store, &child) {
                        Ok(handle) => child_results.push(self.walk(&handle, &child_path)),
                        Err(e) => {
                            self.logger
                                .warn(&format!("Skipping folder {child_path}: {e}"));
                            pass.errors.push(FolderError::HandleAcquisition {
                                target: child_path,
                                reason: e.to_string(),
                            });
                        }
                    }
                }
            }
            Err(e) => {
                self.logger
                    .warn(&format!("Cannot list child folders of {path}: {e}"));
                pass.errors.push(FolderError::ChildListing {
                    folder: path.to_string(),
                    reason: e.to_string(),
                });
            }
        }

        pass.into_result(name, path, child_results)
    }
}
