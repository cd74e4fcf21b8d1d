use log::Level;
use maildupe::duplicates::DedupOptions;
use maildupe::report::FolderError;
use maildupe::store::memory::MemoryStore;

use super::common::{note, walk};

#[test]
fn test_delete_failure_in_group_of_three() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    let after = store.add_folder(store.root(), "After");
    for id in ["m1", "m2", "m3"] {
        store.add_message(inbox, note(id, "Same"));
    }
    store.add_message(after, note("a1", "Dup"));
    store.add_message(after, note("a2", "Dup"));
    store.fail_delete("m2");

    let (result, logger) = walk(&store, DedupOptions::default());
    let inbox_result = &result.child_results[0];

    assert_eq!(inbox_result.duplicates_removed, 1);
    assert_eq!(store.message_ids(inbox), vec!["m1", "m2"]);
    assert_eq!(inbox_result.groups[0].failed[0].entry_id, "m2");
    assert!(matches!(
        inbox_result.errors[0],
        FolderError::Deletion { ref entry_id, .. } if entry_id == "m2"
    ));
    assert!(logger.contains(Level::Error, "Failed to remove m2"));

    assert_eq!(result.child_results[1].duplicates_removed, 1);
    assert_eq!(store.outstanding_handles(), 0);
    assert_eq!(store.double_releases(), 0);
}

#[test]
fn test_message_listing_failure() {
    let mut store = MemoryStore::new("S");
    let broken = store.add_folder(store.root(), "Broken");
    let child = store.add_folder(broken, "Child");
    store.add_message(broken, note("b1", "X"));
    store.add_message(broken, note("b2", "X"));
    store.add_message(child, note("c1", "Y"));
    store.add_message(child, note("c2", "Y"));
    store.fail_list_messages(broken);

    let (result, _) = walk(&store, DedupOptions::default());
    let broken_result = &result.child_results[0];

    assert_eq!(broken_result.duplicates_removed, 0);
    assert!(matches!(broken_result.errors[0], FolderError::MessageListing { .. }));
    assert_eq!(broken_result.child_results[0].duplicates_removed, 1);
    assert_eq!(store.outstanding_handles(), 0);
}

#[test]
fn test_unopenable_message_is_skipped() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    for id in ["m1", "m2", "m3"] {
        store.add_message(inbox, note(id, "Same"));
    }
    store.fail_open_message("m1");

    let (result, _) = walk(&store, DedupOptions::default());
    let inbox_result = &result.child_results[0];

    assert_eq!(inbox_result.messages_skipped, 1);
    assert_eq!(inbox_result.groups[0].survivor, "m2");
    assert_eq!(store.message_ids(inbox), vec!["m1", "m2"]);
    assert_eq!(store.outstanding_handles(), 0);
}

#[test]
fn test_sibling_survives_child_failures() {
    let mut store = MemoryStore::new("S");
    let a = store.add_folder(store.root(), "A");
    let b = store.add_folder(store.root(), "B");
    let c = store.add_folder(store.root(), "C");
    for folder in [a, b, c] {
        store.add_message(folder, note("x1", "Dup"));
        store.add_message(folder, note("x2", "Dup"));
    }
    store.fail_open_folder(a);
    store.fail_list_children(b);

    let (result, _) = walk(&store, DedupOptions::default());

    assert_eq!(result.child_results.len(), 2);
    assert_eq!(result.child_results[0].name, "B");
    assert_eq!(result.child_results[1].name, "C");
    assert_eq!(result.total_removed(), 2);
    assert_eq!(result.all_errors().len(), 2);
    assert_eq!(store.outstanding_handles(), 0);
    assert_eq!(store.double_releases(), 0);
}

#[test]
fn test_root_failure_returns_empty_result() {
    let mut store = MemoryStore::new("Offline");
    store.fail_root();

    let (result, logger) = walk(&store, DedupOptions::default());

    assert_eq!(result.name, "Offline");
    assert_eq!(result.total_removed(), 0);
    assert!(matches!(
        result.errors[0],
        FolderError::HandleAcquisition { ref target, .. } if target == "Offline"
    ));
    assert_eq!(logger.count(Level::Error), 1);
    assert_eq!(store.outstanding_handles(), 0);
}

#[test]
fn test_release_balance_after_mixed_faults() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    let deep = store.add_folder(inbox, "Deep");
    for id in ["m1", "m2", "m3", "m4"] {
        store.add_message(inbox, note(id, "Same"));
        store.add_message(deep, note(&format!("d{id}"), "Same"));
    }
    store.fail_open_message("m2");
    store.fail_delete("m3");
    store.fail_delete("dm4");

    let (result, _) = walk(&store, DedupOptions::default());

    assert_eq!(result.total_removed(), 3);
    assert_eq!(store.outstanding_handles(), 0);
    assert_eq!(store.acquired_count(), store.released_count());
    assert_eq!(store.double_releases(), 0);
}

#[test]
fn test_large_folder_holds_one_message_handle() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    let archive = store.add_folder(inbox, "Archive");
    for i in 0..500 {
        store.add_message(inbox, note(&format!("i{i}"), &format!("Subject {i}")));
    }
    store.add_message(inbox, note("dup-a", "Subject 7"));
    store.add_message(inbox, note("dup-b", "Subject 42"));
    store.add_message(archive, note("a1", "Old"));
    store.add_message(archive, note("a2", "Old"));

    let (result, _) = walk(&store, DedupOptions::default());

    assert_eq!(result.total_removed(), 3);
    assert_eq!(store.message_ids(inbox).len(), 500);
    // Root, Inbox and Archive plus one message.
    assert_eq!(store.peak_outstanding_handles(), 4);
    assert_eq!(store.outstanding_handles(), 0);
    assert_eq!(store.double_releases(), 0);
}

#[test]
fn test_reopen_failure_spares_rest_of_group() {
    let mut store = MemoryStore::new("S");
    let inbox = store.add_folder(store.root(), "Inbox");
    for id in ["m1", "m2", "m3", "m4"] {
        store.add_message(inbox, note(id, "Same"));
    }
    store.fail_reopen("m3");

    let (result, logger) = walk(&store, DedupOptions::default());
    let inbox_result = &result.child_results[0];

    assert_eq!(inbox_result.duplicates_removed, 2);
    assert_eq!(store.message_ids(inbox), vec!["m1", "m3"]);
    assert_eq!(inbox_result.groups[0].removed, vec!["m2", "m4"]);
    assert_eq!(inbox_result.groups[0].failed[0].entry_id, "m3");
    assert!(matches!(
        inbox_result.errors[0],
        FolderError::HandleAcquisition { ref target, .. } if target == "m3"
    ));
    assert!(logger.contains(Level::Error, "Cannot reopen m3"));
    assert_eq!(store.outstanding_handles(), 0);
}
