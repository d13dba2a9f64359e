//! Loading workbooks written by earlier schema versions or by other tools.

use std::fs;

use chrono::{TimeZone, Utc};
use postbook_core::{Fullname, SourceId};
use postbook_store::{LedgerStore, SchemaVersion, StoreError, XlsxStore};
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn write_sheet(path: &std::path::Path, rows: &[&[&str]]) {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, text) in row.iter().enumerate() {
            if !text.is_empty() {
                worksheet
                    .write_string(r as u32, c as u16, *text)
                    .expect("write cell");
            }
        }
    }
    workbook.save(path).expect("save workbook");
}

fn store_at(tmp: &TempDir) -> XlsxStore {
    XlsxStore::new(tmp.path().join("rust.xlsx"), &SourceId::from("rust"))
}

#[test]
fn legacy_five_column_sheet_loads_without_fullnames() {
    let tmp = TempDir::new().unwrap();
    let store = store_at(&tmp);
    write_sheet(
        store.path(),
        &[
            &["Id", "Title of Post", "Body of Post", "Author", "Time of creation"],
            &["a1", "First", "", "alice", "2024-05-01T12:01:00Z"],
            &["b2", "Second", "text", "bob", "2024-05-01T12:02:00Z"],
        ],
    );

    let loaded = store.load().expect("load").expect("present");
    assert_eq!(loaded.schema, SchemaVersion::V1);
    assert_eq!(loaded.records.len(), 2);
    assert!(loaded.records.iter().all(|r| r.fullname.is_none()));
    assert_eq!(loaded.records[0].author, "alice");
    assert_eq!(
        loaded.records[1].created_at,
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 2, 0).unwrap()
    );
}

#[test]
fn legacy_sheet_is_upgraded_on_flush() {
    let tmp = TempDir::new().unwrap();
    let store = store_at(&tmp);
    write_sheet(
        store.path(),
        &[
            &["Id", "Title of Post", "Body of Post", "Author", "Time of creation"],
            &["a1", "First", "", "alice", "2024-05-01T12:01:00Z"],
        ],
    );

    let mut records = store.load().unwrap().unwrap().records;
    let mut newer = records[0].clone();
    newer.id = "c3".into();
    newer.fullname = Some(Fullname::from("t3_c3"));
    records.push(newer);
    store.flush(&records).expect("flush");

    let reloaded = store.load().unwrap().unwrap();
    assert_eq!(reloaded.schema, SchemaVersion::V2);
    assert_eq!(reloaded.records, records);
}

#[test]
fn blank_rows_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let store = store_at(&tmp);
    write_sheet(
        store.path(),
        &[
            &["Id", "Title of Post", "Body of Post", "Author", "Time of creation", "Fullname"],
            &["a1", "First", "", "alice", "2024-05-01T12:01:00Z", "t3_a1"],
            &[],
            &["b2", "Second", "", "bob", "2024-05-01T12:02:00Z", "t3_b2"],
        ],
    );
    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded.records.len(), 2);
}

#[test]
fn garbage_file_is_a_read_error() {
    let tmp = TempDir::new().unwrap();
    let store = store_at(&tmp);
    fs::write(store.path(), b"this is not a zip archive").unwrap();

    let err = store.load().expect_err("garbage must not load");
    assert!(matches!(err, StoreError::Read { .. }), "got: {err}");
    assert!(err.is_corruption());
    assert!(err.to_string().contains("rust.xlsx"));
}

#[test]
fn unknown_header_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    let store = store_at(&tmp);
    write_sheet(store.path(), &[&["name", "value"], &["x", "1"]]);

    let err = store.load().expect_err("unknown header");
    assert!(matches!(err, StoreError::Corrupt { row: 1, .. }), "got: {err}");
}

#[test]
fn unreadable_timestamp_is_corrupt_with_row_number() {
    let tmp = TempDir::new().unwrap();
    let store = store_at(&tmp);
    write_sheet(
        store.path(),
        &[
            &["Id", "Title of Post", "Body of Post", "Author", "Time of creation", "Fullname"],
            &["a1", "First", "", "alice", "2024-05-01T12:01:00Z", "t3_a1"],
            &["b2", "Second", "", "bob", "not a time", "t3_b2"],
        ],
    );

    let err = store.load().expect_err("bad timestamp");
    match err {
        StoreError::Corrupt { row, reason, .. } => {
            assert_eq!(row, 3);
            assert!(reason.contains("not a time"), "reason: {reason}");
        }
        other => panic!("expected Corrupt, got {other}"),
    }
}

#[test]
fn row_without_id_is_corrupt() {
    let tmp = TempDir::new().unwrap();
    let store = store_at(&tmp);
    write_sheet(
        store.path(),
        &[
            &["Id", "Title of Post", "Body of Post", "Author", "Time of creation", "Fullname"],
            &["", "Orphan", "", "alice", "2024-05-01T12:01:00Z", "t3_a1"],
        ],
    );
    let err = store.load().expect_err("missing id");
    assert!(matches!(err, StoreError::Corrupt { row: 2, .. }), "got: {err}");
}
