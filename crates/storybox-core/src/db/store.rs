//! Shared store handle and scoped transactions

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::connection::Database;
use super::record::{Key, Record};
use super::schema::{Collection, Index};
use crate::error::{Error, Result};

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

/// Process-wide handle to the durable store.
///
/// Clones share one connection; every operation suspends on its lock.
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("path", &self.path).finish()
    }
}

impl Store {
    /// Open (or create) the store at `path`, applying pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(path)?;
        Ok(Self::from_database(db))
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        let path = db.path().map(Path::to_path_buf);
        Self {
            db: Arc::new(Mutex::new(db)),
            path,
        }
    }

    /// Location of the database file, `None` when in memory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn schema_version(&self) -> Result<i32> {
        self.db.lock().await.schema_version()
    }

    /// Rows modified through this handle since it was opened
    pub async fn total_changes(&self) -> Result<i64> {
        let db = self.db.lock().await;
        let changes = db
            .connection()
            .query_row("SELECT total_changes()", [], |row| row.get(0))?;
        Ok(changes)
    }

    /// Start a transaction over `scope`.
    ///
    /// The returned guard holds exclusive access to the store until it is
    /// committed, rolled back or dropped. Dropping it without committing
    /// discards every write made through it.
    pub async fn transaction(
        &self,
        scope: &[Collection],
        mode: TransactionMode,
    ) -> Result<Transaction> {
        let mut db = Arc::clone(&self.db).lock_owned().await;
        db.recover();

        let begin = match mode {
            TransactionMode::ReadOnly => "BEGIN DEFERRED",
            TransactionMode::ReadWrite => "BEGIN IMMEDIATE",
        };
        db.connection().execute_batch(begin)?;

        Ok(Transaction {
            db,
            scope: scope.to_vec(),
            mode,
            finished: false,
        })
    }

    /// Insert or replace a record, returning it with any generated key assigned
    pub async fn put<R: Record>(&self, record: &R) -> Result<R> {
        let mut tx = self
            .transaction(&[R::COLLECTION], TransactionMode::ReadWrite)
            .await?;
        let stored = tx.put(record)?;
        tx.commit()?;
        Ok(stored)
    }

    pub async fn get<R: Record>(&self, key: impl Into<Key>) -> Result<Option<R>> {
        let tx = self
            .transaction(&[R::COLLECTION], TransactionMode::ReadOnly)
            .await?;
        let record = tx.get(key)?;
        tx.commit()?;
        Ok(record)
    }

    /// All records of a collection, in primary key order
    pub async fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        let tx = self
            .transaction(&[R::COLLECTION], TransactionMode::ReadOnly)
            .await?;
        let records = tx.get_all()?;
        tx.commit()?;
        Ok(records)
    }

    /// All records of a collection, ordered by a secondary index
    pub async fn get_all_by_index<R: Record>(&self, index: Index) -> Result<Vec<R>> {
        let tx = self
            .transaction(&[R::COLLECTION], TransactionMode::ReadOnly)
            .await?;
        let records = tx.get_all_by_index(index)?;
        tx.commit()?;
        Ok(records)
    }

    /// Records whose secondary index equals `value`
    pub async fn get_all_matching<R: Record>(
        &self,
        index: Index,
        value: impl Into<Value>,
    ) -> Result<Vec<R>> {
        let tx = self
            .transaction(&[R::COLLECTION], TransactionMode::ReadOnly)
            .await?;
        let records = tx.get_all_matching(index, value)?;
        tx.commit()?;
        Ok(records)
    }

    /// Delete one record; returns whether it existed
    pub async fn delete(&self, collection: Collection, key: impl Into<Key>) -> Result<bool> {
        let mut tx = self
            .transaction(&[collection], TransactionMode::ReadWrite)
            .await?;
        let deleted = tx.delete(collection, key)?;
        tx.commit()?;
        Ok(deleted)
    }

    /// Remove every record of a collection; returns how many were removed
    pub async fn clear(&self, collection: Collection) -> Result<usize> {
        let mut tx = self
            .transaction(&[collection], TransactionMode::ReadWrite)
            .await?;
        let removed = tx.clear(collection)?;
        tx.commit()?;
        Ok(removed)
    }

    pub async fn count(&self, collection: Collection) -> Result<usize> {
        let tx = self
            .transaction(&[collection], TransactionMode::ReadOnly)
            .await?;
        let count = tx.count(collection)?;
        tx.commit()?;
        Ok(count)
    }
}

/// Exclusive, scoped unit of work over one or more collections.
///
/// Either every write made through it becomes durable on [`commit`], or
/// none does.
///
/// [`commit`]: Transaction::commit
pub struct Transaction {
    db: OwnedMutexGuard<Database>,
    scope: Vec<Collection>,
    mode: TransactionMode,
    finished: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("scope", &self.scope)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Transaction {
    pub const fn mode(&self) -> TransactionMode {
        self.mode
    }

    pub fn scope(&self) -> &[Collection] {
        &self.scope
    }

    fn check_scope(&self, collection: Collection) -> Result<()> {
        if self.scope.contains(&collection) {
            Ok(())
        } else {
            Err(Error::Transaction(format!(
                "collection '{collection}' is outside the transaction scope"
            )))
        }
    }

    fn check_writable(&self, collection: Collection) -> Result<()> {
        self.check_scope(collection)?;
        if self.mode == TransactionMode::ReadOnly {
            return Err(Error::Transaction(format!(
                "cannot write to '{collection}' in a read-only transaction"
            )));
        }
        Ok(())
    }

    /// Insert or replace a record.
    ///
    /// Records without a key are only accepted by auto-increment
    /// collections; the generated key is assigned to the returned copy.
    pub fn put<R: Record>(&mut self, record: &R) -> Result<R> {
        let collection = R::COLLECTION;
        self.check_writable(collection)?;

        let table = collection.table();
        let indices = collection.indices();
        let conn = self.db.connection();

        let mut columns = vec!["data"];
        columns.extend(indices.iter().map(|index| index.column()));
        let mut values = vec![Value::Text(serde_json::to_string(record)?)];
        values.extend(indices.iter().map(|index| record.index_value(*index)));

        if let Some(key) = record.key() {
            columns.insert(0, "key");
            values.insert(0, key_value(&key));
            let placeholders = placeholders(values.len());
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO {table} ({}) VALUES ({placeholders})",
                    columns.join(", ")
                ),
                params_from_iter(values.iter()),
            )?;
            return Ok(record.clone());
        }

        if !collection.auto_increment() {
            return Err(Error::InvalidInput(format!(
                "record for '{collection}' has no primary key"
            )));
        }

        conn.execute(
            &format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders(values.len())
            ),
            params_from_iter(values.iter()),
        )?;
        let generated = conn.last_insert_rowid();

        let mut stored = record.clone();
        stored.assign_generated_key(generated);
        conn.execute(
            &format!("UPDATE {table} SET data = ?1 WHERE key = ?2"),
            (serde_json::to_string(&stored)?, generated),
        )?;
        Ok(stored)
    }

    pub fn get<R: Record>(&self, key: impl Into<Key>) -> Result<Option<R>> {
        let collection = R::COLLECTION;
        self.check_scope(collection)?;

        let key = key.into();
        let data: Option<String> = self
            .db
            .connection()
            .query_row(
                &format!("SELECT data FROM {} WHERE key = ?1", collection.table()),
                [key_value(&key)],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|data| decode(&data)).transpose()
    }

    pub fn get_all<R: Record>(&self) -> Result<Vec<R>> {
        let collection = R::COLLECTION;
        self.check_scope(collection)?;
        self.query(
            &format!("SELECT data FROM {} ORDER BY key", collection.table()),
            Vec::new(),
        )
    }

    /// Ascending by index value, ties broken by primary key
    pub fn get_all_by_index<R: Record>(&self, index: Index) -> Result<Vec<R>> {
        let collection = R::COLLECTION;
        self.check_scope(collection)?;
        check_index(collection, index)?;
        self.query(
            &format!(
                "SELECT data FROM {} ORDER BY {column}, key",
                collection.table(),
                column = index.column()
            ),
            Vec::new(),
        )
    }

    pub fn get_all_matching<R: Record>(
        &self,
        index: Index,
        value: impl Into<Value>,
    ) -> Result<Vec<R>> {
        let collection = R::COLLECTION;
        self.check_scope(collection)?;
        check_index(collection, index)?;
        self.query(
            &format!(
                "SELECT data FROM {} WHERE {column} = ?1 ORDER BY key",
                collection.table(),
                column = index.column()
            ),
            vec![value.into()],
        )
    }

    pub fn delete(&mut self, collection: Collection, key: impl Into<Key>) -> Result<bool> {
        self.check_writable(collection)?;
        let key = key.into();
        let affected = self.db.connection().execute(
            &format!("DELETE FROM {} WHERE key = ?1", collection.table()),
            [key_value(&key)],
        )?;
        Ok(affected > 0)
    }

    pub fn clear(&mut self, collection: Collection) -> Result<usize> {
        self.check_writable(collection)?;
        let affected = self
            .db
            .connection()
            .execute(&format!("DELETE FROM {}", collection.table()), [])?;
        Ok(affected)
    }

    pub fn count(&self, collection: Collection) -> Result<usize> {
        self.check_scope(collection)?;
        let count: i64 = self.db.connection().query_row(
            &format!("SELECT COUNT(*) FROM {}", collection.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Make every write durable
    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        if let Err(error) = self.db.connection().execute_batch("COMMIT") {
            self.db.pending_rollback = true;
            return Err(error.into());
        }
        Ok(())
    }

    /// Discard every write
    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.db.connection().execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn query<R: Record>(&self, sql: &str, params: Vec<Value>) -> Result<Vec<R>> {
        let mut stmt = self.db.connection().prepare(sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
            row.get::<_, String>(0)
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode(&row?)?);
        }
        Ok(records)
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(error) = self.db.connection().execute_batch("ROLLBACK") {
            tracing::warn!("Failed to roll back abandoned transaction: {}", error);
            self.db.pending_rollback = true;
        }
    }
}

fn decode<R: Record>(data: &str) -> Result<R> {
    Ok(serde_json::from_str(data)?)
}

fn key_value(key: &Key) -> Value {
    match key {
        Key::Text(value) => Value::Text(value.clone()),
        Key::Integer(value) => Value::Integer(*value),
    }
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn check_index(collection: Collection, index: Index) -> Result<()> {
    if index.collection() == collection {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "index '{}' does not belong to '{collection}'",
            index.column()
        )))
    }
}
