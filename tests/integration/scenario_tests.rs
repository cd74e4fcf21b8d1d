use log::Level;
use maildupe::duplicates::DedupOptions;
use maildupe::store::memory::{MemoryMessage, MemoryStore};
use maildupe::store::FieldId;

use super::common::{note, walk};

#[test]
fn test_hello_world_inbox() {
    let mut store = MemoryStore::new("Personal");
    let inbox = store.add_folder(store.root(), "Inbox");
    for (id, subject) in [("m1", "Hello"), ("m2", "Hello"), ("m3", "World"), ("m4", "World")] {
        store.add_message(inbox, note(id, subject));
    }

    let (result, logger) = walk(&store, DedupOptions::default());
    let inbox_result = &result.child_results[0];

    assert_eq!(inbox_result.duplicates_removed, 2);
    assert_eq!(store.message_ids(inbox), vec!["m1", "m3"]);
    assert_eq!(inbox_result.groups.len(), 2);
    assert_eq!(inbox_result.groups[0].survivor, "m1");
    assert_eq!(inbox_result.groups[1].survivor, "m3");
    assert!(logger.contains(Level::Info, "Removing m2"));
    assert_eq!(store.outstanding_handles(), 0);
    assert_eq!(store.double_releases(), 0);
}

#[test]
fn test_empty_folder() {
    let mut store = MemoryStore::new("Personal");
    store.add_folder(store.root(), "Empty");

    let (result, _) = walk(&store, DedupOptions::default());
    let empty = &result.child_results[0];

    assert_eq!(empty.name, "Empty");
    assert_eq!(empty.duplicates_removed, 0);
    assert!(empty.child_results.is_empty());
    assert!(empty.groups.is_empty());
}

#[test]
fn test_per_folder_scope() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    let archive = store.add_folder(store.root(), "Archive");
    store.add_message(inbox, note("i1", "Same"));
    store.add_message(archive, note("a1", "Same"));

    let (result, _) = walk(&store, DedupOptions::default());

    assert_eq!(result.total_removed(), 0);
    assert_eq!(store.message_ids(inbox), vec!["i1"]);
    assert_eq!(store.message_ids(archive), vec!["a1"]);
}

#[test]
fn test_malformed_subject_forms_own_group() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    store.add_message(inbox, note("m1", "Report"));
    store.add_message(
        inbox,
        MemoryMessage::new("m2")
            .with_text(FieldId::MessageClass, "IPM.Note")
            .with_malformed(FieldId::Subject, "bad encoding"),
    );
    store.add_message(inbox, note("m3", "Report"));

    let (result, logger) = walk(&store, DedupOptions::default());
    let inbox_result = &result.child_results[0];

    assert_eq!(inbox_result.duplicates_removed, 1);
    assert_eq!(inbox_result.degraded_fields, 1);
    assert_eq!(store.message_ids(inbox), vec!["m1", "m2"]);
    assert!(logger.contains(Level::Warn, "m2"));
}

#[test]
fn test_dry_run_deletes_nothing() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    for id in ["a", "b", "c"] {
        store.add_message(inbox, note(id, "Same"));
    }

    let (result, logger) = walk(&store, DedupOptions::default().dry_run(true));
    let inbox_result = &result.child_results[0];

    assert_eq!(inbox_result.duplicates_removed, 0);
    assert_eq!(inbox_result.candidates, 2);
    assert_eq!(inbox_result.groups[0].would_remove, vec!["b", "c"]);
    assert_eq!(store.message_ids(inbox).len(), 3);
    assert!(logger.contains(Level::Info, "WOULD remove"));
}

#[test]
fn test_class_filter_skips_other_classes() {
    let mut store = MemoryStore::new("S");
    let calendar = store.add_folder(store.root(), "Calendar");
    for id in ["n1", "n2"] {
        store.add_message(calendar, note(id, "Standup"));
    }
    for id in ["r1", "r2"] {
        store.add_message(
            calendar,
            MemoryMessage::new(id)
                .with_text(FieldId::MessageClass, "IPM.Schedule.Meeting.Request")
                .with_text(FieldId::Subject, "Standup"),
        );
    }

    let options = DedupOptions::default().message_classes(vec!["IPM.Schedule.Meeting".to_string()]);
    let (result, _) = walk(&store, options);
    let folder = &result.child_results[0];

    assert_eq!(folder.duplicates_removed, 1);
    assert_eq!(folder.messages_skipped, 2);
    assert_eq!(store.message_ids(calendar), vec!["n1", "n2", "r1"]);
}

#[test]
fn test_second_run_removes_nothing() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    let nested = store.add_folder(inbox, "Nested");
    for (i, subject) in ["x", "y", "x", "x", "y"].iter().enumerate() {
        store.add_message(inbox, note(&format!("i{i}"), subject));
        store.add_message(nested, note(&format!("n{i}"), subject));
    }

    let (first, _) = walk(&store, DedupOptions::default());
    assert_eq!(first.total_removed(), 6);

    let (second, _) = walk(&store, DedupOptions::default());
    for (_, folder) in second.descendants() {
        assert_eq!(folder.duplicates_removed, 0, "{}", folder.path);
    }
    assert_eq!(store.outstanding_handles(), 0);
}

#[test]
fn test_audit_paths() {
    let mut store = MemoryStore::new("Work");
    let inbox = store.add_folder(store.root(), "Inbox");
    let clients = store.add_folder(inbox, "Clients");
    store.add_message(clients, note("c1", "Invoice"));
    store.add_message(clients, note("c2", "Invoice"));

    let (result, _) = walk(&store, DedupOptions::default());
    let audit = result.flatten_audit();

    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].folder_path, "Work/Inbox/Clients");
    assert_eq!(audit[0].survivor, "c1");
    assert_eq!(audit[0].removed, vec!["c2"]);
}
