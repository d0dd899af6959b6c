//! Persistence of the feedback log through the public API

use std::collections::BTreeSet;

use docqa::feedback::{store, FeedbackBatch, FeedbackLog, FeedbackStore};
use docqa::{ConflictPolicy, DocumentId, Error};
use tempfile::TempDir;

fn id(s: &str) -> DocumentId {
    s.parse().unwrap()
}

fn batch(query: &str, accepted: &[&str], rejected: &[&str]) -> FeedbackBatch {
    FeedbackBatch {
        query: query.to_string(),
        accepted: accepted.iter().map(|s| id(s)).collect(),
        rejected: rejected.iter().map(|s| id(s)).collect(),
    }
}

#[test]
fn test_empty_log_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feedback_log.json");

    store::save(&FeedbackLog::new(), &path).unwrap();
    assert_eq!(store::load(&path).unwrap(), FeedbackLog::new());
}

#[test]
fn test_large_log_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feedback_log.json");

    let mut log = FeedbackLog::new();
    for q in 0..1000 {
        let ids: BTreeSet<DocumentId> = (0..50)
            .map(|i| DocumentId::new(format!("docs/file-{}.pdf", i % 7), q * 50 + i))
            .collect();
        let (accepted, rejected): (BTreeSet<_>, BTreeSet<_>) =
            ids.into_iter().partition(|d| d.index() % 2 == 0);
        log.merge(
            &FeedbackBatch {
                query: format!("question number {}", q),
                accepted,
                rejected,
            },
            ConflictPolicy::Retain,
        );
    }
    assert_eq!(log.len(), 1000);

    store::save(&log, &path).unwrap();
    let loaded = store::load(&path).unwrap();
    assert_eq!(loaded, log);
    assert_eq!(loaded.stats().accepted + loaded.stats().rejected, 50_000);
}

#[test]
fn test_paths_with_separator_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feedback_log.json");

    let mut log = FeedbackLog::new();
    log.merge(&batch("odd names", &[], &["reports/a::b.pdf::7"]), ConflictPolicy::Retain);
    store::save(&log, &path).unwrap();

    let loaded = store::load(&path).unwrap();
    let rejected = loaded.rejected("odd names").unwrap();
    let only = rejected.iter().next().unwrap();
    assert_eq!(only.source(), "reports/a::b.pdf");
    assert_eq!(only.index(), 7);
}

#[test]
fn test_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let log = store::load(&dir.path().join("never-written.json")).unwrap();
    assert!(log.is_empty());
}

#[test]
fn test_malformed_file_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feedback_log.json");
    std::fs::write(&path, "{ \"q\": [1, 2").unwrap();

    assert!(matches!(
        store::load(&path),
        Err(Error::MalformedFeedbackLog { .. })
    ));
    assert!(matches!(
        FeedbackStore::open_file(&path, ConflictPolicy::Retain),
        Err(Error::MalformedFeedbackLog { .. })
    ));
}

#[test]
fn test_legacy_keys_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feedback_log.json");
    std::fs::write(
        &path,
        r#"{"budget 2023": {"yes": ["finance.pdf::4"], "no": ["finance.pdf::3"]}}"#,
    )
    .unwrap();

    let log = store::load(&path).unwrap();
    assert!(log.is_rejected("budget 2023", &id("finance.pdf::3")));
    assert!(log.get("budget 2023").unwrap().accepted.contains(&id("finance.pdf::4")));
}

#[test]
fn test_repeated_submit_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feedback_log.json");
    let mut store = FeedbackStore::open_file(&path, ConflictPolicy::Retain).unwrap();
    let feedback = batch("budget 2023", &["finance.pdf::4"], &["finance.pdf::3"]);

    store.submit(&feedback).unwrap();
    let first = std::fs::read(&path).unwrap();

    let outcome = store.submit(&feedback).unwrap();
    assert_eq!(outcome.newly_accepted + outcome.newly_rejected, 0);
    assert_eq!(std::fs::read(&path).unwrap(), first);

    // Saving the reloaded log again produces the same bytes
    store::save(&store::load(&path).unwrap(), &path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), first);
}

#[test]
fn test_two_writers_keep_both_submissions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feedback_log.json");
    let mut first = FeedbackStore::open_file(&path, ConflictPolicy::Retain).unwrap();
    let mut second = FeedbackStore::open_file(&path, ConflictPolicy::Retain).unwrap();

    first.submit(&batch("q1", &[], &["a.pdf::0"])).unwrap();
    second.submit(&batch("q2", &[], &["b.pdf::2"])).unwrap();

    let on_disk = store::load(&path).unwrap();
    assert!(on_disk.is_rejected("q1", &id("a.pdf::0")));
    assert!(on_disk.is_rejected("q2", &id("b.pdf::2")));
    assert_eq!(second.log(), &on_disk);
}
