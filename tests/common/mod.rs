#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use stockledger::adapters::sqlite_adapter::SqliteAdapter;
use stockledger::ports::ledger_port::LedgerStore;
use tempfile::TempDir;

pub fn memory_store() -> SqliteAdapter {
    let store = SqliteAdapter::in_memory().unwrap();
    store.initialize_schema().unwrap();
    store
}

/// File-backed store so several pooled connections share one database.
pub fn file_store(dir: &TempDir, pool_size: u32) -> (SqliteAdapter, PathBuf) {
    let path = dir.path().join("ledger.db");
    let store = SqliteAdapter::open(&path, pool_size, Duration::from_secs(10)).unwrap();
    store.initialize_schema().unwrap();
    (store, path)
}

/// Side connection for inspecting or sabotaging the database directly.
pub fn raw_connection(path: &Path) -> rusqlite::Connection {
    rusqlite::Connection::open(path).unwrap()
}

pub fn count_sales(path: &Path) -> i64 {
    raw_connection(path)
        .query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))
        .unwrap()
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
