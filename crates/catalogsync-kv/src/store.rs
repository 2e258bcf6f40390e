//! Persistent key-value store backed by redb.
//!
//! Every call is its own transaction: `set` and `remove` commit before
//! returning, so a value written as a whole is either fully visible after a
//! restart or not at all.

use crate::tables;
use crate::KvStore;
use async_trait::async_trait;
use redb::Database;
use std::path::Path;
use tracing::debug;

/// Error type for key-value store operations
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::DatabaseError),
    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),
    #[error("redb transaction error: {0}")]
    Transaction(Box<redb::TransactionError>),
    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<redb::TransactionError> for KvError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Transaction(Box::new(e))
    }
}

impl From<KvError> for catalogsync_common::Error {
    fn from(e: KvError) -> Self {
        Self::persistence(e.to_string())
    }
}

pub type KvResult<T> = Result<T, KvError>;

/// Persistent key-value store backed by redb.
pub struct RedbKvStore {
    db: Database,
}

impl RedbKvStore {
    /// Open (or create) the redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> KvResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Create the table eagerly so later read txns don't fail
        let write_txn = db.begin_write()?;
        {
            let _t = write_txn.open_table(tables::ENTRIES)?;
        }
        write_txn.commit()?;

        debug!("Opened key-value store at {}", path.display());
        Ok(Self { db })
    }

    fn get_sync(&self, key: &str) -> KvResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(tables::ENTRIES)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    fn set_sync(&self, key: &str, value: &str) -> KvResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::ENTRIES)?;
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove_sync(&self, key: &str) -> KvResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(tables::ENTRIES)?;
            table.remove(key)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for RedbKvStore {
    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.get_sync(key)
    }

    async fn set(&self, key: &str, value: &str) -> KvResult<()> {
        self.set_sync(key, value)
    }

    async fn remove(&self, key: &str) -> KvResult<()> {
        self.remove_sync(key)
    }
}
