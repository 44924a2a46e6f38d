// src/tests/loader_tests.rs
use crate::batch::BatchWriter;
use crate::db::connection::init_db;
use crate::db::flats::{count_flats, query_flats};
use crate::domain::filters::FlatFilter;
use crate::errors::StoreError;
use crate::ingest::{load, LoadFileError};
use crate::tests::utils::{record, temp_db, temp_dir};
use std::path::PathBuf;

fn write_batch(dir: &std::path::Path, month: &str, urls: &[&str]) -> PathBuf {
    let writer = BatchWriter::for_month(dir, month);
    let records: Vec<_> = urls
        .iter()
        .map(|url| record("wola", url, 600_000.0, 50.0))
        .collect();
    writer.append(&records).unwrap();
    writer.path().to_path_buf()
}

fn stored(db: &crate::db::Database) -> i64 {
    db.with_conn(|conn| count_flats(conn)).unwrap()
}

#[test]
fn second_load_of_same_files_inserts_nothing() {
    let dir = temp_dir("load_twice");
    let db = temp_db("load_twice");
    let files = vec![
        write_batch(&dir, "2025-01", &["https://x.pl/a", "https://x.pl/b"]),
        write_batch(&dir, "2025-02", &["https://x.pl/c"]),
    ];

    let first = load(&db, &files).unwrap();
    assert_eq!(first.accepted(), 3);
    assert_eq!(first.skipped(), 0);

    let second = load(&db, &files).unwrap();
    assert_eq!(second.accepted(), 0);
    assert_eq!(second.skipped(), 3);
    assert_eq!(stored(&db), 3);
}

#[test]
fn earliest_file_wins_across_files() {
    let dir = temp_dir("load_cross_file");
    let db = temp_db("load_cross_file");
    let jan = write_batch(&dir, "2025-01", &["https://x.pl/a"]);
    let feb = write_batch(&dir, "2025-02", &["https://x.pl/a/", "https://x.pl/b"]);

    // Order of the argument list does not matter, files go in filename order.
    let summary = load(&db, &[feb, jan]).unwrap();
    assert_eq!(summary.accepted(), 2);
    assert_eq!(summary.skipped(), 1);

    let flats = db
        .with_conn(|conn| query_flats(conn, &FlatFilter::default()))
        .unwrap();
    let a = flats.iter().find(|f| f.url == "https://x.pl/a").unwrap();
    assert_eq!(a.date_scraped.as_deref(), Some("2025-01"));
}

#[test]
fn duplicates_inside_one_file_are_skipped() {
    let dir = temp_dir("load_in_file_dup");
    let db = temp_db("load_in_file_dup");
    let file = write_batch(
        &dir,
        "2025-03",
        &["https://x.pl/a", "https://x.pl/a?utm=1", "https://x.pl/b"],
    );

    let summary = load(&db, &[file]).unwrap();
    assert_eq!(summary.accepted(), 2);
    assert_eq!(summary.skipped(), 1);
}

#[test]
fn unreadable_file_is_reported_and_run_continues() {
    let dir = temp_dir("load_bad_file");
    let db = temp_db("load_bad_file");
    let bad = dir.join("flats_2025-01.csv");
    std::fs::write(&bad, "price;area\n1;2\n").unwrap();
    let good = write_batch(&dir, "2025-02", &["https://x.pl/a"]);
    let missing = dir.join("flats_2024-12.csv");

    let summary = load(&db, &[bad.clone(), good, missing.clone()]).unwrap();
    assert_eq!(summary.failed_files(), 2);
    // Filename order: December before January.
    assert_eq!(summary.failed_paths(), vec![missing.as_path(), bad.as_path()]);
    assert_eq!(summary.accepted(), 1);
    assert!(summary
        .files
        .iter()
        .filter_map(|f| f.result.as_ref().err())
        .all(|e| matches!(e, LoadFileError::Read(_))));
}

#[test]
fn failed_insert_rolls_back_the_whole_file() {
    let dir = temp_dir("load_rollback");
    let db = temp_db("load_rollback");
    init_db(&db).unwrap();
    db.with_conn(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER reject_poison BEFORE INSERT ON flats
             WHEN NEW.url = 'https://x.pl/poison'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .map_err(StoreError::from)
    })
    .unwrap();

    let jan = write_batch(&dir, "2025-01", &["https://x.pl/a", "https://x.pl/poison"]);
    let feb = write_batch(&dir, "2025-02", &["https://x.pl/a"]);

    let summary = load(&db, &[jan, feb]).unwrap();
    assert!(matches!(
        summary.files[0].result,
        Err(LoadFileError::Insert(_))
    ));
    // Nothing from the failed file was admitted, so February can take it.
    assert_eq!(summary.files[1].result.as_ref().unwrap().accepted, 1);
    assert_eq!(stored(&db), 1);
}

#[test]
fn unopenable_store_aborts_the_load() {
    let dir = temp_dir("load_no_store");
    let file = write_batch(&dir, "2025-01", &["https://x.pl/a"]);
    let db = crate::db::Database::new(
        dir.join("missing_dir").join("store.sqlite").to_string_lossy().into_owned(),
    );

    let err = load(&db, &[file]).unwrap_err();
    assert!(matches!(err, StoreError::Open { .. }));
}
