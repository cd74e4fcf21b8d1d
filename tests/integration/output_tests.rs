use maildupe::duplicates::DedupOptions;
use maildupe::error::ExitCode;
use maildupe::output::{CsvOutput, JsonOutput, TextOutput};
use maildupe::report::{RunReport, StoreReport};
use maildupe::scanner::{HashAlgorithm, KeyPolicy};
use maildupe::store::memory::MemoryStore;
use maildupe::store::MailStore;

use super::common::{note, walk};

fn run(dry_run: bool) -> RunReport {
    let mut personal = MemoryStore::new("Personal");
    let inbox = personal.add_folder(personal.root(), "Inbox");
    for (id, subject) in [("m1", "Hello"), ("m2", "Hello"), ("m3", "World"), ("m4", "World")] {
        personal.add_message(inbox, note(id, subject));
    }
    personal.fail_delete("m4");

    let mut work = MemoryStore::new("Work");
    work.add_folder(work.root(), "Empty");

    let mut report = RunReport::new(dry_run, HashAlgorithm::Blake3, &KeyPolicy::class_and_subject());
    for store in [&personal, &work] {
        let (root, _) = walk(store, DedupOptions::default().dry_run(dry_run));
        report.push(StoreReport::new(store.store_name(), root));
    }
    report.finish();
    report
}

#[test]
fn test_exit_code_reflects_errors() {
    assert_eq!(ExitCode::from_report(&run(false)), ExitCode::PartialSuccess);
    assert_eq!(ExitCode::from_report(&run(true)), ExitCode::Success);
}

#[test]
fn test_json_export() {
    let report = run(false);
    let json = JsonOutput::new(&report, ExitCode::from_report(&report))
        .to_json()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["summary"]["stores"], 2);
    assert_eq!(value["summary"]["removed"], 1);
    assert_eq!(value["summary"]["candidates"], 2);
    assert_eq!(value["summary"]["exit_code_name"], "MD003");
    assert_eq!(value["audit"].as_array().unwrap().len(), 2);
    assert_eq!(value["audit"][1]["failed"][0]["entry_id"], "m4");
    assert_eq!(value["stores"][1]["store"], "Work");
}

#[test]
fn test_csv_export() {
    let report = run(true);
    let csv = CsvOutput::new(&report).to_string().unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 5);
    assert!(lines[1].starts_with("Personal,Personal/Inbox,"));
    assert!(lines[1].ends_with(",m1,survivor,"));
    assert!(lines[2].ends_with(",m2,would_remove,"));
}

#[test]
fn test_text_export() {
    let report = run(false);
    let text = TextOutput::new(&report, false).render();

    assert!(text.contains("  Inbox: 1 removed (4 scanned)"));
    assert!(text.contains("Work: 0 removed"));
    assert!(text.contains("1 duplicates removed in 4 folders across 2 stores"));
    assert!(text.contains("Cannot delete m4"));
}
