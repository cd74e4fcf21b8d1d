//! In-memory mail store.
//!
//! [`MemoryStore`] keeps a folder tree in memory and implements [`MailStore`]
//! on top of it. Besides being a convenient store for embedding and tests, it
//! can inject failures at every store operation and it keeps count of every
//! handle it hands out, so callers can assert that acquisition and release
//! stay balanced.
//!
//! Folders are addressed by [`FolderId`] while the tree is being built.
//! Deleted messages are removed from their folder, so a second pass over the
//! same store observes the result of the first.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use super::{
    FieldId, FolderHandle, FolderRef, Handle, MailStore, MessageHandle, MessageRef,
    PropertyError, PropertyValue, StoreError,
};

/// Index of a folder inside a [`MemoryStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FolderId(usize);

/// A message held by a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryMessage {
    entry_id: String,
    properties: HashMap<FieldId, Result<PropertyValue, PropertyError>>,
}

impl MemoryMessage {
    /// Create a message with no properties.
    #[must_use]
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            properties: HashMap::new(),
        }
    }

    /// Set a property to a value.
    #[must_use]
    pub fn with(mut self, field: FieldId, value: PropertyValue) -> Self {
        self.properties.insert(field, Ok(value));
        self
    }

    /// Set a text property.
    #[must_use]
    pub fn with_text(self, field: FieldId, value: &str) -> Self {
        self.with(field, PropertyValue::Text(value.to_string()))
    }

    /// Mark a property as present but erroneous.
    #[must_use]
    pub fn with_malformed(mut self, field: FieldId, reason: &str) -> Self {
        self.properties
            .insert(field, Err(PropertyError::Malformed(reason.to_string())));
        self
    }

    /// Entry id of this message.
    #[must_use]
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }
}

#[derive(Debug)]
struct MemoryFolder {
    name: String,
    children: Vec<usize>,
    messages: Vec<MemoryMessage>,
}

#[derive(Debug, Clone)]
enum OpenItem {
    Folder(usize),
    Message { folder: usize, entry_id: String },
}

#[derive(Debug, Default)]
struct Faults {
    list_children: HashSet<usize>,
    list_messages: HashSet<usize>,
    open_folder: HashSet<usize>,
    open_message: HashSet<String>,
    reopen_message: HashSet<String>,
    delete: HashSet<String>,
    root: bool,
}

/// In-memory store with fault injection and handle accounting.
///
/// # Example
///
/// ```
/// use maildupe::store::memory::{MemoryMessage, MemoryStore};
/// use maildupe::store::FieldId;
///
/// let mut store = MemoryStore::new("Archive");
/// let inbox = store.add_folder(store.root(), "Inbox");
/// store.add_message(inbox, MemoryMessage::new("a").with_text(FieldId::Subject, "Hi"));
/// store.fail_delete("a");
///
/// assert_eq!(store.message_ids(inbox), vec!["a".to_string()]);
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    folders: RefCell<Vec<MemoryFolder>>,
    faults: Faults,
    next_handle: Cell<u64>,
    open: RefCell<HashMap<u64, OpenItem>>,
    released_ids: RefCell<HashSet<u64>>,
    opened_messages: RefCell<HashSet<String>>,
    acquired: Cell<usize>,
    peak: Cell<usize>,
    released: Cell<usize>,
    double_releases: Cell<usize>,
    deleted: RefCell<Vec<String>>,
}

impl MemoryStore {
    /// Create a store whose root folder carries the store name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let root = MemoryFolder {
            name: name.clone(),
            children: Vec::new(),
            messages: Vec::new(),
        };
        Self {
            name,
            folders: RefCell::new(vec![root]),
            faults: Faults::default(),
            next_handle: Cell::new(1),
            open: RefCell::new(HashMap::new()),
            released_ids: RefCell::new(HashSet::new()),
            opened_messages: RefCell::new(HashSet::new()),
            acquired: Cell::new(0),
            peak: Cell::new(0),
            released: Cell::new(0),
            double_releases: Cell::new(0),
            deleted: RefCell::new(Vec::new()),
        }
    }

    /// The root folder.
    #[must_use]
    pub fn root(&self) -> FolderId {
        FolderId(0)
    }

    /// Add a child folder and return its id.
    pub fn add_folder(&mut self, parent: FolderId, name: &str) -> FolderId {
        let folders = self.folders.get_mut();
        let id = folders.len();
        folders.push(MemoryFolder {
            name: name.to_string(),
            children: Vec::new(),
            messages: Vec::new(),
        });
        folders[parent.0].children.push(id);
        FolderId(id)
    }

    /// Append a message to a folder. Listing order is insertion order.
    pub fn add_message(&mut self, folder: FolderId, message: MemoryMessage) {
        self.folders.get_mut()[folder.0].messages.push(message);
    }

    /// Make `root_folder` fail.
    pub fn fail_root(&mut self) {
        self.faults.root = true;
    }

    /// Make the hierarchy listing of a folder fail.
    pub fn fail_list_children(&mut self, folder: FolderId) {
        self.faults.list_children.insert(folder.0);
    }

    /// Make the contents listing of a folder fail.
    pub fn fail_list_messages(&mut self, folder: FolderId) {
        self.faults.list_messages.insert(folder.0);
    }

    /// Make opening a folder fail.
    pub fn fail_open_folder(&mut self, folder: FolderId) {
        self.faults.open_folder.insert(folder.0);
    }

    /// Make opening a message fail.
    pub fn fail_open_message(&mut self, entry_id: &str) {
        self.faults.open_message.insert(entry_id.to_string());
    }

    /// Let the first open of a message succeed and every later one fail.
    pub fn fail_reopen(&mut self, entry_id: &str) {
        self.faults.reopen_message.insert(entry_id.to_string());
    }

    /// Make deleting a message fail.
    pub fn fail_delete(&mut self, entry_id: &str) {
        self.faults.delete.insert(entry_id.to_string());
    }

    /// Entry ids currently in a folder, in listing order.
    #[must_use]
    pub fn message_ids(&self, folder: FolderId) -> Vec<String> {
        self.folders.borrow()[folder.0]
            .messages
            .iter()
            .map(|m| m.entry_id.clone())
            .collect()
    }

    /// Entry ids deleted so far, in deletion order.
    #[must_use]
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted.borrow().clone()
    }

    /// Handles acquired and not yet released.
    #[must_use]
    pub fn outstanding_handles(&self) -> usize {
        self.open.borrow().len()
    }

    /// Total handles acquired.
    #[must_use]
    pub fn acquired_count(&self) -> usize {
        self.acquired.get()
    }

    /// Most handles ever outstanding at once.
    #[must_use]
    pub fn peak_outstanding_handles(&self) -> usize {
        self.peak.get()
    }

    /// Total handles released (first release only).
    #[must_use]
    pub fn released_count(&self) -> usize {
        self.released.get()
    }

    /// Releases of handles that had already been released.
    #[must_use]
    pub fn double_releases(&self) -> usize {
        self.double_releases.get()
    }

    fn issue(&self, item: OpenItem) -> u64 {
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        let outstanding = {
            let mut open = self.open.borrow_mut();
            open.insert(id, item);
            open.len()
        };
        self.acquired.set(self.acquired.get() + 1);
        self.peak.set(self.peak.get().max(outstanding));
        id
    }

    fn folder_index(&self, folder: &FolderHandle) -> Option<usize> {
        match self.open.borrow().get(&folder.id()) {
            Some(OpenItem::Folder(index)) => Some(*index),
            _ => None,
        }
    }

    fn message_location(&self, message: &MessageHandle) -> Option<(usize, String)> {
        match self.open.borrow().get(&message.id()) {
            Some(OpenItem::Message { folder, entry_id }) => Some((*folder, entry_id.clone())),
            _ => None,
        }
    }
}

impl MailStore for MemoryStore {
    fn store_name(&self) -> String {
        self.name.clone()
    }

    fn root_folder(&self) -> Result<FolderHandle, StoreError> {
        if self.faults.root {
            return Err(StoreError::Open {
                target: self.name.clone(),
                reason: "injected root failure".to_string(),
            });
        }
        Ok(FolderHandle::new(self.issue(OpenItem::Folder(0))))
    }

    fn display_name(&self, folder: &FolderHandle) -> String {
        self.folder_index(folder)
            .map(|index| self.folders.borrow()[index].name.clone())
            .unwrap_or_default()
    }

    fn list_child_folders(&self, folder: &FolderHandle) -> Result<Vec<FolderRef>, StoreError> {
        let index = self
            .folder_index(folder)
            .ok_or(StoreError::UnknownHandle(folder.id()))?;
        if self.faults.list_children.contains(&index) {
            return Err(StoreError::Listing {
                target: self.display_name(folder),
                reason: "injected hierarchy failure".to_string(),
            });
        }
        let folders = self.folders.borrow();
        Ok(folders[index]
            .children
            .iter()
            .map(|&child| FolderRef::new(folders[child].name.clone(), child.to_string()))
            .collect())
    }

    fn open_folder(&self, folder: &FolderRef) -> Result<FolderHandle, StoreError> {
        let open_error = |reason: &str| StoreError::Open {
            target: folder.name.clone(),
            reason: reason.to_string(),
        };
        let index: usize = folder
            .key
            .parse()
            .map_err(|_| open_error("malformed folder key"))?;
        if index >= self.folders.borrow().len() {
            return Err(open_error("no such folder"));
        }
        if self.faults.open_folder.contains(&index) {
            return Err(open_error("injected open failure"));
        }
        Ok(FolderHandle::new(self.issue(OpenItem::Folder(index))))
    }

    fn list_messages(&self, folder: &FolderHandle) -> Result<Vec<MessageRef>, StoreError> {
        let index = self
            .folder_index(folder)
            .ok_or(StoreError::UnknownHandle(folder.id()))?;
        if self.faults.list_messages.contains(&index) {
            return Err(StoreError::Listing {
                target: self.display_name(folder),
                reason: "injected contents failure".to_string(),
            });
        }
        Ok(self.folders.borrow()[index]
            .messages
            .iter()
            .map(|m| MessageRef::new(m.entry_id.clone(), index.to_string()))
            .collect())
    }

    fn open_message(&self, message: &MessageRef) -> Result<MessageHandle, StoreError> {
        let open_error = |reason: &str| StoreError::Open {
            target: message.entry_id.clone(),
            reason: reason.to_string(),
        };
        if self.faults.open_message.contains(&message.entry_id) {
            return Err(open_error("injected open failure"));
        }
        let folder: usize = message
            .key
            .parse()
            .map_err(|_| open_error("malformed message key"))?;
        let exists = self
            .folders
            .borrow()
            .get(folder)
            .is_some_and(|f| f.messages.iter().any(|m| m.entry_id == message.entry_id));
        if !exists {
            return Err(open_error("no such message"));
        }
        let first_open = self
            .opened_messages
            .borrow_mut()
            .insert(message.entry_id.clone());
        if !first_open && self.faults.reopen_message.contains(&message.entry_id) {
            return Err(open_error("injected reopen failure"));
        }
        let id = self.issue(OpenItem::Message {
            folder,
            entry_id: message.entry_id.clone(),
        });
        Ok(MessageHandle::new(id))
    }

    fn entry_id(&self, message: &MessageHandle) -> String {
        self.message_location(message)
            .map(|(_, entry_id)| entry_id)
            .unwrap_or_default()
    }

    fn get_property(
        &self,
        message: &MessageHandle,
        field: FieldId,
    ) -> Result<PropertyValue, PropertyError> {
        let (folder, entry_id) = self
            .message_location(message)
            .ok_or_else(|| PropertyError::Malformed("unknown message handle".to_string()))?;
        let folders = self.folders.borrow();
        let stored = folders[folder]
            .messages
            .iter()
            .find(|m| m.entry_id == entry_id)
            .ok_or_else(|| PropertyError::Malformed("message no longer exists".to_string()))?;
        stored
            .properties
            .get(&field)
            .cloned()
            .unwrap_or(Err(PropertyError::Missing))
    }

    fn delete_message(&self, message: &MessageHandle) -> Result<(), StoreError> {
        let (folder, entry_id) = self
            .message_location(message)
            .ok_or(StoreError::UnknownHandle(message.id()))?;
        if self.faults.delete.contains(&entry_id) {
            return Err(StoreError::Delete {
                entry_id,
                reason: "injected delete failure".to_string(),
            });
        }
        let mut folders = self.folders.borrow_mut();
        let messages = &mut folders[folder].messages;
        let position = messages
            .iter()
            .position(|m| m.entry_id == entry_id)
            .ok_or_else(|| StoreError::Delete {
                entry_id: entry_id.clone(),
                reason: "message no longer exists".to_string(),
            })?;
        messages.remove(position);
        self.deleted.borrow_mut().push(entry_id);
        Ok(())
    }

    fn release(&self, handle: Handle) {
        let id = match handle {
            Handle::Folder(h) => h.id(),
            Handle::Message(h) => h.id(),
        };
        if self.open.borrow_mut().remove(&id).is_some() {
            self.released_ids.borrow_mut().insert(id);
            self.released.set(self.released.get() + 1);
        } else if self.released_ids.borrow().contains(&id) {
            self.double_releases.set(self.double_releases.get() + 1);
        }
    }
}
