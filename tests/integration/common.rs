//! Shared fixtures for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use maildupe::duplicates::DedupOptions;
use maildupe::logging::RecordingLogger;
use maildupe::report::FolderResult;
use maildupe::scanner::{KeyPolicy, TreeWalker};
use maildupe::store::memory::MemoryMessage;
use maildupe::store::{FieldId, MailStore};

/// A plain note with a subject.
pub fn note(id: &str, subject: &str) -> MemoryMessage {
    MemoryMessage::new(id)
        .with_text(FieldId::MessageClass, "IPM.Note")
        .with_text(FieldId::Subject, subject)
}

/// Walk `store` with the (class, subject) policy.
pub fn walk<S: MailStore>(store: &S, options: DedupOptions) -> (FolderResult, RecordingLogger) {
    let logger = RecordingLogger::new();
    let policy = KeyPolicy::class_and_subject();
    let result = TreeWalker::new(store, &policy, options, &logger).walk_root();
    (result, logger)
}

/// Create `cur`, `new` and `tmp` under `dir`.
pub fn make_maildir(dir: &Path) {
    for sub in ["cur", "new", "tmp"] {
        fs::create_dir_all(dir.join(sub)).unwrap();
    }
}

/// A minimal RFC 5322 message.
pub fn rfc822(subject: &str, from: &str, body: &str) -> String {
    format!(
        "From: {from}\r\nTo: team@example.com\r\nSubject: {subject}\r\n\
Date: Mon, 4 Mar 2024 09:30:00 +0000\r\nMessage-ID: <{subject}@example.com>\r\n\r\n{body}\r\n"
    )
}

/// Write a message into `dir/new`.
pub fn deliver(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join("new").join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Names of the files in `dir/sub`, sorted.
pub fn file_names(dir: &Path, sub: &str) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir.join(sub))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
