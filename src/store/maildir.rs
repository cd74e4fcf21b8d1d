//! Maildir-tree mail store.
//!
//! [`MaildirStore`] exposes a directory of Maildir folders through
//! [`MailStore`]. A folder is a directory; its messages are the files in its
//! `cur/` and `new/` subdirectories.
//!
//! # Layouts
//!
//! * [`FolderLayout::Nested`]: child folders are plain subdirectories
//!   (other than `cur`, `new` and `tmp`).
//! * [`FolderLayout::Maildirpp`]: all folders live in the store root as
//!   dot-prefixed directories. `.Work` is a child of the root and
//!   `.Work.Clients` is a child of `.Work`.
//!
//! # Messages
//!
//! Messages are listed `cur/` first, then `new/`, each sorted by file name.
//! Hidden files and files already carrying the `T` (trashed) flag are not
//! listed. A message's entry id is its Maildir unique name, the part of the
//! file name before the `:2,` info suffix.
//!
//! Opening a message reads and parses it with `mail-parser`; the extracted
//! properties stay cached until the handle is released.
//!
//! # Example
//!
//! ```no_run
//! use maildupe::store::maildir::{MaildirOptions, MaildirStore};
//! use maildupe::store::{guard, MailStore};
//! use std::path::Path;
//!
//! let store = MaildirStore::open(Path::new("/home/me/Maildir"), MaildirOptions::default())?;
//! let root = guard::root(&store)?;
//! for child in store.list_child_folders(&root)? {
//!     println!("{}", child.name);
//! }
//! # Ok::<(), maildupe::store::StoreError>(())
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, TimeZone, Utc};
use mail_parser::{Address, ContentType, HeaderName, Message, MessageParser, MimeHeaders};
use serde::{Deserialize, Serialize};

use super::{
    FieldId, FolderHandle, FolderRef, Handle, MailStore, MessageHandle, MessageRef,
    PropertyError, PropertyValue, StoreError,
};
use crate::actions::delete::{delete_message_file, delete_verified, DeleteMode, FileSnapshot};

/// Separator between a message's unique name and its info suffix.
#[cfg(unix)]
pub const INFO_SEPARATOR: &str = ":";
/// Separator between a message's unique name and its info suffix.
#[cfg(not(unix))]
pub const INFO_SEPARATOR: &str = ";";

/// Message class of ordinary mail.
pub const CLASS_NOTE: &str = "IPM.Note";
/// Message class of meeting requests (`text/calendar`).
pub const CLASS_MEETING_REQUEST: &str = "IPM.Schedule.Meeting.Request";
/// Message class of delivery and read reports (`multipart/report`).
pub const CLASS_REPORT: &str = "REPORT.IPM.Note";

/// How folders are arranged on disk.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FolderLayout {
    /// Child folders are subdirectories
    #[default]
    Nested,
    /// Dot-separated folders in the store root (Maildir++)
    Maildirpp,
}

impl fmt::Display for FolderLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderLayout::Nested => write!(f, "nested"),
            FolderLayout::Maildirpp => write!(f, "maildirpp"),
        }
    }
}

/// Options for a [`MaildirStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaildirOptions {
    /// How duplicates are deleted
    pub delete_mode: DeleteMode,
    /// How folders are arranged
    pub layout: FolderLayout,
    /// Refuse to delete a file that changed since it was opened
    pub verify_before_delete: bool,
}

impl Default for MaildirOptions {
    fn default() -> Self {
        Self {
            delete_mode: DeleteMode::default(),
            layout: FolderLayout::default(),
            verify_before_delete: true,
        }
    }
}

/// Split a message file name into its unique name and its flags.
///
/// Returns `None` for the flags when the name has no `2,` info suffix.
#[must_use]
pub fn split_file_name(file_name: &str) -> (&str, Option<&str>) {
    if let Some(index) = file_name.rfind(INFO_SEPARATOR) {
        let info = &file_name[index + INFO_SEPARATOR.len()..];
        if let Some(flags) = info.strip_prefix("2,") {
            return (&file_name[..index], Some(flags));
        }
    }
    (file_name, None)
}

/// Remove leading reply and forward prefixes (`Re:`, `Fw:`, `Fwd:`).
#[must_use]
pub fn normalize_subject(subject: &str) -> &str {
    const PREFIXES: [&str; 3] = ["re:", "fw:", "fwd:"];
    let mut rest = subject.trim_start();
    while let Some(len) = PREFIXES
        .iter()
        .find(|p| rest.get(..p.len()).is_some_and(|head| head.eq_ignore_ascii_case(p)))
        .map(|p| p.len())
    {
        rest = rest[len..].trim_start();
    }
    rest
}

type PropertyTable = HashMap<FieldId, Result<PropertyValue, PropertyError>>;

#[derive(Debug, Clone)]
struct OpenFolder {
    path: PathBuf,
    name: String,
    /// Maildir++ folder name including the leading dot, empty for the root.
    dotted: String,
}

#[derive(Debug)]
struct OpenMessage {
    entry_id: String,
    snapshot: Option<FileSnapshot>,
    path: PathBuf,
    properties: PropertyTable,
}

/// A mail store backed by Maildir folders on disk.
#[derive(Debug)]
pub struct MaildirStore {
    root: PathBuf,
    name: String,
    options: MaildirOptions,
    next_handle: Cell<u64>,
    folders: RefCell<HashMap<u64, OpenFolder>>,
    messages: RefCell<HashMap<u64, OpenMessage>>,
    /// Snapshot taken the first time each file was opened. A reopened
    /// message is verified against this one, not a fresh capture.
    first_seen: RefCell<HashMap<PathBuf, FileSnapshot>>,
}

impl MaildirStore {
    /// Open a store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if `root` is not a readable directory.
    pub fn open(root: &Path, options: MaildirOptions) -> Result<Self, StoreError> {
        let metadata = fs::metadata(root).map_err(|source| StoreError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        if !metadata.is_dir() {
            return Err(StoreError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "not a directory",
                ),
            });
        }

        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        log::debug!(
            "Opened maildir store {} ({} layout, {} delete)",
            root.display(),
            options.layout,
            options.delete_mode
        );

        Ok(Self {
            root: root.to_path_buf(),
            name,
            options,
            next_handle: Cell::new(1),
            folders: RefCell::new(HashMap::new()),
            messages: RefCell::new(HashMap::new()),
            first_seen: RefCell::new(HashMap::new()),
        })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &MaildirOptions {
        &self.options
    }

    /// Number of handles currently open.
    #[must_use]
    pub fn open_handles(&self) -> usize {
        self.folders.borrow().len() + self.messages.borrow().len()
    }

    /// Build a reference to a message file for [`MailStore::open_message`].
    ///
    /// Returns `None` if the path has no file name.
    #[must_use]
    pub fn message_ref(path: &Path) -> Option<MessageRef> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let (unique, _) = split_file_name(&file_name);
        Some(MessageRef::new(unique, path.to_string_lossy().into_owned()))
    }

    fn snapshot(&self, path: &Path) -> Option<FileSnapshot> {
        if let Some(seen) = self.first_seen.borrow().get(path) {
            return Some(seen.clone());
        }
        let snapshot = FileSnapshot::capture(path).ok()?;
        self.first_seen
            .borrow_mut()
            .insert(path.to_path_buf(), snapshot.clone());
        Some(snapshot)
    }

    fn next_id(&self) -> u64 {
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        id
    }

    fn folder(&self, handle: &FolderHandle) -> Result<OpenFolder, StoreError> {
        self.folders
            .borrow()
            .get(&handle.id())
            .cloned()
            .ok_or(StoreError::UnknownHandle(handle.id()))
    }

    fn issue_folder(&self, folder: OpenFolder) -> FolderHandle {
        let id = self.next_id();
        self.folders.borrow_mut().insert(id, folder);
        FolderHandle::new(id)
    }

    fn read_dir_sorted(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>, std::io::Error> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entries.push((name, entry.path(), is_dir));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    fn nested_children(&self, folder: &OpenFolder) -> Result<Vec<FolderRef>, std::io::Error> {
        Ok(Self::read_dir_sorted(&folder.path)?
            .into_iter()
            .filter(|(name, _, is_dir)| {
                *is_dir && !name.starts_with('.') && !matches!(name.as_str(), "cur" | "new" | "tmp")
            })
            .map(|(name, path, _)| FolderRef::new(name, path.to_string_lossy().into_owned()))
            .collect())
    }

    fn maildirpp_children(&self, folder: &OpenFolder) -> Result<Vec<FolderRef>, std::io::Error> {
        let prefix = format!("{}.", folder.dotted);
        Ok(Self::read_dir_sorted(&self.root)?
            .into_iter()
            .filter(|(name, _, is_dir)| *is_dir && !name.starts_with(".."))
            .filter_map(|(name, path, _)| {
                let rest = name.strip_prefix(&prefix)?;
                if rest.is_empty() || rest.contains('.') {
                    return None;
                }
                Some(FolderRef::new(rest, path.to_string_lossy().into_owned()))
            })
            .collect())
    }

    fn extract_properties(path: &Path) -> PropertyTable {
        let malformed_all = |reason: String| -> PropertyTable {
            FieldId::ALL
                .iter()
                .map(|&field| (field, Err(PropertyError::Malformed(reason.clone()))))
                .collect()
        };

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => return malformed_all(format!("unreadable message file: {e}")),
        };
        match MessageParser::new().parse(&bytes) {
            Some(message) => message_properties(&message),
            None => malformed_all("unparsable message".to_string()),
        }
    }
}

fn has_header(message: &Message<'_>, wanted: fn(&HeaderName<'_>) -> bool) -> bool {
    message.headers().iter().any(|header| wanted(&header.name))
}

fn presence<T>(
    value: Option<T>,
    header_present: bool,
    what: &str,
) -> Result<T, PropertyError> {
    match value {
        Some(value) => Ok(value),
        None if header_present => Err(PropertyError::Malformed(format!("unparsable {what} header"))),
        None => Err(PropertyError::Missing),
    }
}

/// A blank `Subject:` is an empty subject. Any other value the parser
/// cannot decode is malformed.
fn subject_property(
    parsed: Option<&str>,
    raw: Option<&str>,
    header_present: bool,
) -> Result<String, PropertyError> {
    match (parsed, raw) {
        (Some(subject), _) => Ok(subject.to_string()),
        (None, Some(raw)) if raw.trim().is_empty() => Ok(String::new()),
        (None, _) => presence(None, header_present, "Subject"),
    }
}

fn format_addresses(address: Option<&Address<'_>>) -> Vec<String> {
    let mut out: Vec<String> = address
        .map(|address| {
            address
                .iter()
                .filter_map(|addr| {
                    let email = addr.address.as_deref()?;
                    Some(match addr.name.as_deref() {
                        Some(name) if !name.is_empty() => format!("{name} <{email}>"),
                        _ => format!("<{email}>"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    out.sort();
    out
}

fn is_content_type(ct: Option<&ContentType<'_>>, ctype: &str, subtype: &str) -> bool {
    ct.is_some_and(|ct| {
        ct.ctype().eq_ignore_ascii_case(ctype)
            && ct
                .subtype()
                .is_some_and(|s| s.eq_ignore_ascii_case(subtype))
    })
}

fn message_class(message: &Message<'_>) -> &'static str {
    if is_content_type(message.content_type(), "multipart", "report") {
        return CLASS_REPORT;
    }
    if is_content_type(message.content_type(), "text", "calendar")
        || message
            .parts
            .iter()
            .any(|part| is_content_type(part.content_type(), "text", "calendar"))
    {
        return CLASS_MEETING_REQUEST;
    }
    CLASS_NOTE
}

fn message_properties(message: &Message<'_>) -> PropertyTable {
    let mut properties = HashMap::new();

    properties.insert(
        FieldId::MessageClass,
        Ok(PropertyValue::from(message_class(message))),
    );

    let subject = subject_property(
        message.subject(),
        message.header_raw(HeaderName::Subject),
        has_header(message, |h| matches!(h, HeaderName::Subject)),
    );
    properties.insert(
        FieldId::NormalizedSubject,
        subject
            .clone()
            .map(|s| PropertyValue::Text(normalize_subject(&s).to_string())),
    );
    properties.insert(FieldId::Subject, subject.map(PropertyValue::Text));

    let from_present = has_header(message, |h| matches!(h, HeaderName::From));
    let sender = message.from().and_then(|from| from.first());
    properties.insert(
        FieldId::SenderEmail,
        presence(
            sender.and_then(|addr| addr.address.as_deref().map(str::to_string)),
            from_present,
            "From",
        )
        .map(PropertyValue::Text),
    );
    properties.insert(
        FieldId::SenderName,
        match sender {
            Some(addr) => Ok(PropertyValue::Text(
                addr.name.as_deref().unwrap_or_default().to_string(),
            )),
            None => presence(None::<PropertyValue>, from_present, "From"),
        },
    );

    let to_present = has_header(message, |h| matches!(h, HeaderName::To));
    let cc_present = has_header(message, |h| matches!(h, HeaderName::Cc));
    let recipients = if to_present || cc_present {
        let mut all = format_addresses(message.to());
        all.extend(format_addresses(message.cc()));
        Ok(PropertyValue::Text(
            all.iter().map(|r| format!("{r}; ")).collect(),
        ))
    } else {
        Err(PropertyError::Missing)
    };
    properties.insert(FieldId::Recipients, recipients);

    let date_present = has_header(message, |h| matches!(h, HeaderName::Date));
    let delivery = message.date().and_then(|date| {
        let tz_secs = (date.tz_hour as i32) * 3600 + (date.tz_minute as i32) * 60;
        let tz_sign = if date.tz_before_gmt { -1 } else { 1 };
        FixedOffset::east_opt(tz_sign * tz_secs)?
            .with_ymd_and_hms(
                date.year as i32,
                date.month as u32,
                date.day as u32,
                date.hour as u32,
                date.minute as u32,
                date.second as u32,
            )
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    });
    properties.insert(
        FieldId::DeliveryTime,
        presence(delivery, date_present, "Date").map(PropertyValue::Time),
    );

    let id_present = has_header(message, |h| matches!(h, HeaderName::MessageId));
    properties.insert(
        FieldId::InternetMessageId,
        presence(
            message.message_id().map(str::to_string),
            id_present,
            "Message-ID",
        )
        .map(PropertyValue::Text),
    );

    properties.insert(
        FieldId::Body,
        message
            .body_text(0)
            .map(|body| PropertyValue::Text(body.into_owned()))
            .ok_or(PropertyError::Missing),
    );

    properties
}

impl MailStore for MaildirStore {
    fn store_name(&self) -> String {
        self.name.clone()
    }

    fn root_folder(&self) -> Result<FolderHandle, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Open {
                target: self.root.display().to_string(),
                reason: "store root is not a directory".to_string(),
            });
        }
        Ok(self.issue_folder(OpenFolder {
            path: self.root.clone(),
            name: self.name.clone(),
            dotted: String::new(),
        }))
    }

    fn display_name(&self, folder: &FolderHandle) -> String {
        self.folder(folder).map(|f| f.name).unwrap_or_default()
    }

    fn list_child_folders(&self, folder: &FolderHandle) -> Result<Vec<FolderRef>, StoreError> {
        let open = self.folder(folder)?;
        let children = match self.options.layout {
            FolderLayout::Nested => self.nested_children(&open),
            FolderLayout::Maildirpp => self.maildirpp_children(&open),
        };
        children.map_err(|e| StoreError::Listing {
            target: open.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn open_folder(&self, folder: &FolderRef) -> Result<FolderHandle, StoreError> {
        let path = PathBuf::from(&folder.key);
        if !path.is_dir() {
            return Err(StoreError::Open {
                target: folder.key.clone(),
                reason: "not a directory".to_string(),
            });
        }
        let dotted = match self.options.layout {
            FolderLayout::Nested => String::new(),
            FolderLayout::Maildirpp => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        Ok(self.issue_folder(OpenFolder {
            path,
            name: folder.name.clone(),
            dotted,
        }))
    }

    fn list_messages(&self, folder: &FolderHandle) -> Result<Vec<MessageRef>, StoreError> {
        let open = self.folder(folder)?;
        let mut refs = Vec::new();
        for sub in ["cur", "new"] {
            let dir = open.path.join(sub);
            if !dir.is_dir() {
                continue;
            }
            let entries = Self::read_dir_sorted(&dir).map_err(|e| StoreError::Listing {
                target: dir.display().to_string(),
                reason: e.to_string(),
            })?;
            for (name, path, is_dir) in entries {
                if is_dir || name.starts_with('.') {
                    continue;
                }
                let (unique, flags) = split_file_name(&name);
                if flags.is_some_and(|f| f.contains('T')) {
                    continue;
                }
                refs.push(MessageRef::new(unique, path.to_string_lossy().into_owned()));
            }
        }
        Ok(refs)
    }

    fn open_message(&self, message: &MessageRef) -> Result<MessageHandle, StoreError> {
        let path = PathBuf::from(&message.key);
        if !path.is_file() {
            return Err(StoreError::Open {
                target: message.entry_id.clone(),
                reason: format!("no message file at {}", path.display()),
            });
        }
        let snapshot = if self.options.verify_before_delete {
            self.snapshot(&path)
        } else {
            None
        };
        let properties = Self::extract_properties(&path);
        let id = self.next_id();
        self.messages.borrow_mut().insert(
            id,
            OpenMessage {
                entry_id: message.entry_id.clone(),
                snapshot,
                path,
                properties,
            },
        );
        Ok(MessageHandle::new(id))
    }

    fn entry_id(&self, message: &MessageHandle) -> String {
        self.messages
            .borrow()
            .get(&message.id())
            .map(|m| m.entry_id.clone())
            .unwrap_or_default()
    }

    fn get_property(
        &self,
        message: &MessageHandle,
        field: FieldId,
    ) -> Result<PropertyValue, PropertyError> {
        let messages = self.messages.borrow();
        let open = messages
            .get(&message.id())
            .ok_or_else(|| PropertyError::Malformed("unknown message handle".to_string()))?;
        open.properties
            .get(&field)
            .cloned()
            .unwrap_or(Err(PropertyError::Missing))
    }

    fn delete_message(&self, message: &MessageHandle) -> Result<(), StoreError> {
        let (entry_id, path, snapshot) = {
            let messages = self.messages.borrow();
            let open = messages
                .get(&message.id())
                .ok_or(StoreError::UnknownHandle(message.id()))?;
            (open.entry_id.clone(), open.path.clone(), open.snapshot.clone())
        };

        let mode = self.options.delete_mode;
        let result = match snapshot {
            Some(snapshot) => delete_verified(&snapshot, mode),
            None => delete_message_file(&path, mode),
        };
        result
            .map(|_| {
                self.first_seen.borrow_mut().remove(&path);
            })
            .map_err(|e| StoreError::Delete {
                entry_id,
                reason: e.to_string(),
            })
    }

    fn release(&self, handle: Handle) {
        match handle {
            Handle::Folder(h) => {
                self.folders.borrow_mut().remove(&h.id());
            }
            Handle::Message(h) => {
                self.messages.borrow_mut().remove(&h.id());
            }
        }
    }
}
