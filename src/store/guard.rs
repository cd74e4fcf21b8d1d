//! Scoped handle acquisition.
//!
//! A [`Scoped`] guard owns one store handle and releases it when dropped, so
//! every exit path (normal return, early return, `?` propagation, panic
//! unwinding) gives the handle back exactly once.

use std::fmt;
use std::ops::Deref;

use super::{
    FolderHandle, FolderRef, Handle, MailStore, MessageHandle, MessageRef, StoreError,
};

/// Guard that releases a store handle on drop.
pub struct Scoped<'s, S, H>
where
    S: MailStore + ?Sized,
    H: Into<Handle> + Copy,
{
    store: &'s S,
    handle: H,
}

/// Scoped folder handle.
pub type FolderGuard<'s, S> = Scoped<'s, S, FolderHandle>;

/// Scoped message handle.
pub type MessageGuard<'s, S> = Scoped<'s, S, MessageHandle>;

impl<'s, S, H> Scoped<'s, S, H>
where
    S: MailStore + ?Sized,
    H: Into<Handle> + Copy,
{
    /// Take ownership of an already acquired handle.
    #[must_use]
    pub fn new(store: &'s S, handle: H) -> Self {
        Self { store, handle }
    }

    /// The wrapped handle.
    #[must_use]
    pub fn handle(&self) -> H {
        self.handle
    }
}

impl<S, H> Deref for Scoped<'_, S, H>
where
    S: MailStore + ?Sized,
    H: Into<Handle> + Copy,
{
    type Target = H;

    fn deref(&self) -> &H {
        &self.handle
    }
}

impl<S, H> Drop for Scoped<'_, S, H>
where
    S: MailStore + ?Sized,
    H: Into<Handle> + Copy,
{
    fn drop(&mut self) {
        self.store.release(self.handle.into());
    }
}

impl<S, H> fmt::Debug for Scoped<'_, S, H>
where
    S: MailStore + ?Sized,
    H: Into<Handle> + Copy + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoped").field("handle", &self.handle).finish()
    }
}

/// Acquire the root folder of a store.
///
/// # Errors
///
/// Propagates the store's error if the root cannot be opened.
pub fn root<S: MailStore + ?Sized>(store: &S) -> Result<FolderGuard<'_, S>, StoreError> {
    store.root_folder().map(|handle| Scoped::new(store, handle))
}

/// Acquire a child folder.
///
/// # Errors
///
/// Propagates the store's error if the folder cannot be opened.
pub fn open_folder<'s, S: MailStore + ?Sized>(
    store: &'s S,
    folder: &FolderRef,
) -> Result<FolderGuard<'s, S>, StoreError> {
    store.open_folder(folder).map(|handle| Scoped::new(store, handle))
}

/// Acquire a message.
///
/// # Errors
///
/// Propagates the store's error if the message cannot be opened.
pub fn open_message<'s, S: MailStore + ?Sized>(
    store: &'s S,
    message: &MessageRef,
) -> Result<MessageGuard<'s, S>, StoreError> {
    store
        .open_message(message)
        .map(|handle| Scoped::new(store, handle))
}
