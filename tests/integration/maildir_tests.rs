use std::fs;

use maildupe::actions::DeleteMode;
use maildupe::cli::{Cli, Commands};
use maildupe::duplicates::DedupOptions;
use maildupe::error::ExitCode;
use maildupe::report::FolderError;
use maildupe::store::maildir::{FolderLayout, MaildirOptions, MaildirStore, INFO_SEPARATOR};
use maildupe::store::{guard, FieldId, MailStore, PropertyError, PropertyValue};
use tempfile::TempDir;

use clap::Parser;

use super::common::{deliver, file_names, make_maildir, rfc822, walk};

fn store_with(dir: &TempDir, options: MaildirOptions) -> MaildirStore {
    MaildirStore::open(dir.path(), options).unwrap()
}

#[test]
fn test_nested_layout_walk() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    make_maildir(root);
    make_maildir(&root.join("Work"));
    make_maildir(&root.join("Work").join("Clients"));

    deliver(root, "1.a", &rfc822("Hello", "a@example.com", "x"));
    deliver(root, "2.b", &rfc822("Hello", "a@example.com", "x"));
    let clients = root.join("Work").join("Clients");
    deliver(&clients, "3.c", &rfc822("Invoice", "b@example.com", "y"));
    deliver(&clients, "4.d", &rfc822("Invoice", "b@example.com", "y"));
    deliver(&clients, "5.e", &rfc822("Other", "b@example.com", "y"));

    let store = store_with(&dir, MaildirOptions::default());
    let (result, _) = walk(&store, DedupOptions::default());

    assert_eq!(result.total_removed(), 2);
    let clients_result = &result.child_results[0].child_results[0];
    assert!(clients_result.path.ends_with("/Work/Clients"));
    assert_eq!(clients_result.groups[0].survivor, "3.c");
    assert_eq!(clients_result.groups[0].removed, vec!["4.d"]);
    assert_eq!(store.open_handles(), 0);

    // Flag mode keeps the file under cur/ with the T flag.
    assert_eq!(file_names(&clients, "new"), vec!["3.c", "5.e"]);
    assert_eq!(
        file_names(&clients, "cur"),
        vec![format!("4.d{INFO_SEPARATOR}2,T")]
    );
}

#[test]
fn test_maildirpp_layout_walk() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    make_maildir(root);
    make_maildir(&root.join(".Work"));
    make_maildir(&root.join(".Work.Clients"));

    let clients = root.join(".Work.Clients");
    deliver(&clients, "1.a", &rfc822("Quote", "c@example.com", "z"));
    deliver(&clients, "2.b", &rfc822("Quote", "c@example.com", "z"));

    let options = MaildirOptions {
        layout: FolderLayout::Maildirpp,
        ..MaildirOptions::default()
    };
    let store = store_with(&dir, options);
    let (result, _) = walk(&store, DedupOptions::default());

    assert_eq!(result.child_results.len(), 1);
    let work = &result.child_results[0];
    assert_eq!(work.name, "Work");
    assert_eq!(work.child_results[0].name, "Clients");
    assert_eq!(work.child_results[0].duplicates_removed, 1);
}

#[test]
fn test_second_run_sees_trashed_files_as_gone() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    for name in ["1.a", "2.b", "3.c"] {
        deliver(dir.path(), name, &rfc822("Same", "a@example.com", "x"));
    }

    let store = store_with(&dir, MaildirOptions::default());
    let (first, _) = walk(&store, DedupOptions::default());
    assert_eq!(first.total_removed(), 2);

    let (second, _) = walk(&store, DedupOptions::default());
    assert_eq!(second.total_removed(), 0);
    assert_eq!(second.messages_scanned, 1);
}

#[test]
fn test_permanent_delete_mode() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    deliver(dir.path(), "1.a", &rfc822("Same", "a@example.com", "x"));
    deliver(dir.path(), "2.b", &rfc822("Same", "a@example.com", "x"));

    let options = MaildirOptions {
        delete_mode: DeleteMode::Permanent,
        ..MaildirOptions::default()
    };
    let store = store_with(&dir, options);
    let (result, _) = walk(&store, DedupOptions::default());

    assert_eq!(result.total_removed(), 1);
    assert_eq!(file_names(dir.path(), "new"), vec!["1.a"]);
    assert!(file_names(dir.path(), "cur").is_empty());
}

#[test]
fn test_dry_run_leaves_files() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    deliver(dir.path(), "1.a", &rfc822("Same", "a@example.com", "x"));
    deliver(dir.path(), "2.b", &rfc822("Same", "a@example.com", "x"));

    let store = store_with(&dir, MaildirOptions::default());
    let (result, _) = walk(&store, DedupOptions::default().dry_run(true));

    assert_eq!(result.duplicates_removed, 0);
    assert_eq!(result.groups[0].would_remove, vec!["2.b"]);
    assert_eq!(file_names(dir.path(), "new"), vec!["1.a", "2.b"]);
}

#[test]
fn test_modified_file_is_not_deleted() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    deliver(dir.path(), "1.a", &rfc822("Same", "a@example.com", "x"));
    let second = deliver(dir.path(), "2.b", &rfc822("Same", "a@example.com", "x"));

    let store = store_with(&dir, MaildirOptions::default());
    let root = guard::root(&store).unwrap();
    let refs = store.list_messages(&root).unwrap();
    let message = guard::open_message(&store, &refs[1]).unwrap();

    fs::write(&second, "Subject: Same\r\n\r\nedited after open, now longer\r\n").unwrap();
    let err = store.delete_message(&message).unwrap_err();

    assert!(err.to_string().contains("2.b"));
    assert!(second.exists());
}

#[test]
fn test_file_changed_before_reopen_is_not_deleted() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    let path = deliver(dir.path(), "1.a", &rfc822("Same", "a@example.com", "x"));

    let store = store_with(&dir, MaildirOptions::default());
    let root = guard::root(&store).unwrap();
    let refs = store.list_messages(&root).unwrap();
    drop(guard::open_message(&store, &refs[0]).unwrap());

    fs::write(&path, "Subject: Same\r\n\r\nrewritten between reads, and longer\r\n").unwrap();
    let reopened = guard::open_message(&store, &refs[0]).unwrap();

    assert!(store.delete_message(&reopened).is_err());
    assert!(path.exists());
}

#[test]
fn test_unparsable_date_is_malformed() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    let path = deliver(
        dir.path(),
        "1.a",
        "Subject: Hi\r\nDate: yesterday-ish\r\n\r\nbody\r\n",
    );

    let store = store_with(&dir, MaildirOptions::default());
    let message_ref = MaildirStore::message_ref(&path).unwrap();
    let message = guard::open_message(&store, &message_ref).unwrap();

    assert_eq!(
        store.get_property(&message, FieldId::Subject),
        Ok(PropertyValue::Text("Hi".to_string()))
    );
    assert!(matches!(
        store.get_property(&message, FieldId::DeliveryTime),
        Err(PropertyError::Malformed(_))
    ));
    assert_eq!(
        store.get_property(&message, FieldId::Recipients),
        Err(PropertyError::Missing)
    );
}

#[test]
fn test_open_failure_on_removed_child() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    make_maildir(&dir.path().join("Gone"));

    let store = store_with(&dir, MaildirOptions::default());
    let root = guard::root(&store).unwrap();
    let children = store.list_child_folders(&root).unwrap();
    fs::remove_dir_all(dir.path().join("Gone")).unwrap();

    assert!(guard::open_folder(&store, &children[0]).is_err());
    drop(root);
    assert_eq!(store.open_handles(), 0);
}

#[test]
fn test_root_removed_after_open() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("mail");
    make_maildir(&root);
    let store = MaildirStore::open(&root, MaildirOptions::default()).unwrap();
    fs::remove_dir_all(&root).unwrap();

    let (result, _) = walk(&store, DedupOptions::default());
    assert!(matches!(
        result.errors[0],
        FolderError::HandleAcquisition { ref target, .. } if target == "mail"
    ));
}

#[test]
fn test_run_dedupe_exit_codes() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    deliver(dir.path(), "1.a", &rfc822("Same", "a@example.com", "x"));
    deliver(dir.path(), "2.b", &rfc822("Same", "a@example.com", "x"));
    let store_path = dir.path().to_string_lossy().into_owned();

    let parse = |extra: &[&str]| {
        let mut args = vec!["maildupe", "dedupe", store_path.as_str(), "--output", "json"];
        args.extend_from_slice(extra);
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Dedupe(args) => args,
            _ => panic!("Expected Dedupe command"),
        }
    };

    let dry = parse(&["--dry-run", "--key", "class,subject"]);
    assert_eq!(
        maildupe::run_dedupe(&dry, None, false).unwrap(),
        ExitCode::Success
    );
    assert_eq!(file_names(dir.path(), "new").len(), 2);

    let real = parse(&["--key", "class,subject"]);
    assert_eq!(
        maildupe::run_dedupe(&real, None, false).unwrap(),
        ExitCode::Success
    );
    assert_eq!(
        maildupe::run_dedupe(&real, None, false).unwrap(),
        ExitCode::NoDuplicates
    );
}

#[test]
fn test_run_dedupe_rejects_missing_store() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope").to_string_lossy().into_owned();
    let cli = Cli::try_parse_from(["maildupe", "dedupe", missing.as_str()]).unwrap();
    let Commands::Dedupe(args) = cli.command else {
        panic!("Expected Dedupe command");
    };
    assert!(maildupe::run_dedupe(&args, None, false).is_err());
}

#[test]
fn test_run_dedupe_saves_effective_config() {
    let dir = TempDir::new().unwrap();
    make_maildir(dir.path());
    deliver(dir.path(), "1.a", &rfc822("Solo", "a@example.com", "x"));
    let store_path = dir.path().to_string_lossy().into_owned();
    let saved = dir.path().join("settings").join("effective.toml");
    let saved_path = saved.to_string_lossy().into_owned();

    let cli = Cli::try_parse_from([
        "maildupe",
        "dedupe",
        store_path.as_str(),
        "--output",
        "json",
        "--dry-run",
        "--skip-folder",
        "Archive",
        "--save-config",
        saved_path.as_str(),
    ])
    .unwrap();
    let Commands::Dedupe(args) = cli.command else {
        panic!("Expected Dedupe command");
    };
    assert_eq!(
        maildupe::run_dedupe(&args, None, false).unwrap(),
        ExitCode::NoDuplicates
    );

    let text = fs::read_to_string(&saved).unwrap();
    assert!(text.contains("dry_run = true"));
    assert!(text.contains("\"Archive\""));
    assert!(!text.contains("\"Trash\""));
}

#[test]
fn test_reserved_maildir_folders_untouched() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    make_maildir(root);
    make_maildir(&root.join("Trash"));
    make_maildir(&root.join("Work"));

    let trash = root.join("Trash");
    deliver(&trash, "1.a", &rfc822("Gone", "a@example.com", "x"));
    deliver(&trash, "2.b", &rfc822("Gone", "a@example.com", "x"));
    let work = root.join("Work");
    deliver(&work, "3.c", &rfc822("Kept", "a@example.com", "x"));
    deliver(&work, "4.d", &rfc822("Kept", "a@example.com", "x"));

    let store = store_with(&dir, MaildirOptions::default());
    let options = DedupOptions::default().skip_folders(vec!["trash".to_string()]);
    let (result, _) = walk(&store, options);

    assert_eq!(result.total_removed(), 1);
    assert_eq!(result.child_results.len(), 1);
    assert!(result.child_results[0].path.ends_with("/Work"));
    assert_eq!(file_names(&trash, "new"), vec!["1.a", "2.b"]);
    assert!(file_names(&trash, "cur").is_empty());
}
