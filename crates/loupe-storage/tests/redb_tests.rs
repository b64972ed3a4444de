//! Integration tests for the Redb backend: durability and table isolation.

use loupe_storage::backends::redb::tables::names;
use loupe_storage::backends::{RedbConfig, RedbEngine};
use loupe_storage::{Cursor, StorageEngine, Transaction};

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.redb");

    {
        let engine = RedbEngine::open(&path).unwrap();
        let mut tx = engine.begin_write().unwrap();
        tx.put(names::CATALOG_ENTRIES, b"a", b"1").unwrap();
        tx.put(names::CATALOG_META, b"dimension", &4u32.to_le_bytes()).unwrap();
        tx.commit().unwrap();
    }

    let engine = RedbEngine::open_with_config(&path, RedbConfig::new().cache_size(1 << 20)).unwrap();
    let tx = engine.begin_read().unwrap();
    assert_eq!(tx.get(names::CATALOG_ENTRIES, b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(
        tx.get(names::CATALOG_META, b"dimension").unwrap(),
        Some(4u32.to_le_bytes().to_vec())
    );
}

#[test]
fn uncommitted_writes_are_lost() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.redb");

    {
        let engine = RedbEngine::open(&path).unwrap();
        let mut tx = engine.begin_write().unwrap();
        tx.put(names::CATALOG_ENTRIES, b"a", b"1").unwrap();
        drop(tx);
    }

    let engine = RedbEngine::open(&path).unwrap();
    let tx = engine.begin_read().unwrap();
    assert_eq!(tx.get(names::CATALOG_ENTRIES, b"a").unwrap(), None);
}

#[test]
fn logical_tables_do_not_overlap() {
    let engine = RedbEngine::in_memory().unwrap();
    let mut tx = engine.begin_write().unwrap();
    tx.put(names::CATALOG_ENTRIES, b"x", b"entry").unwrap();
    tx.put(names::CATALOG_META, b"x", b"meta").unwrap();
    tx.commit().unwrap();

    let tx = engine.begin_read().unwrap();
    let mut cursor = tx.cursor(names::CATALOG_ENTRIES).unwrap();
    assert_eq!(cursor.next().unwrap(), Some((b"x".to_vec(), b"entry".to_vec())));
    assert_eq!(cursor.next().unwrap(), None);
}

#[test]
fn write_transaction_reads_its_own_writes() {
    let engine = RedbEngine::in_memory().unwrap();
    let mut tx = engine.begin_write().unwrap();
    tx.put(names::CATALOG_ENTRIES, b"a", b"1").unwrap();
    assert_eq!(tx.get(names::CATALOG_ENTRIES, b"a").unwrap(), Some(b"1".to_vec()));

    let mut cursor = tx.cursor(names::CATALOG_ENTRIES).unwrap();
    assert!(cursor.seek_first().unwrap().is_some());
    drop(cursor);
    tx.commit().unwrap();
}

#[test]
fn shared_engine_through_arc() {
    let engine = std::sync::Arc::new(RedbEngine::in_memory().unwrap());
    let mut tx = engine.begin_write().unwrap();
    tx.put(names::CATALOG_META, b"next", &1u64.to_le_bytes()).unwrap();
    tx.commit().unwrap();

    let tx = engine.begin_read().unwrap();
    assert_eq!(tx.get(names::CATALOG_META, b"next").unwrap(), Some(1u64.to_le_bytes().to_vec()));
}
