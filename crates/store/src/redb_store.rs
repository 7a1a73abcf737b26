//! On-disk [`Store`] backed by [`redb`].
//!
//! # Tables
//!
//! | Name          | Key            | Value                            |
//! |---------------|----------------|----------------------------------|
//! | `sequences`   | table name     | last id handed out for the table |
//! | `plants`      | record id (u64)| JSON-encoded [`Plant`]           |
//! | `comments`    | record id (u64)| JSON-encoded [`Comment`]         |
//! | `plant_logs`  | record id (u64)| JSON-encoded [`PlantLogEntry`]   |
//!
//! Every operation runs in its own redb transaction, so `modify` is a single
//! atomic read-modify-write.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableError};
use tracing::debug;

use plantcare_core::{Comment, Plant, PlantLogEntry, RecordId};

use crate::{PersistenceError, Query, Record, Result, Scope, Store, creation_order};

/// `table name (str) → last assigned id (u64)`.
const SEQUENCES_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequences");

fn records_table<R: Record>() -> TableDefinition<'static, u64, &'static [u8]> {
    TableDefinition::new(R::TABLE)
}

/// Funnel every redb error type through [`redb::Error`] into the store error.
trait BackendResult<T> {
    fn backend(self) -> Result<T>;
}

impl<T, E: Into<redb::Error>> BackendResult<T> for std::result::Result<T, E> {
    fn backend(self) -> Result<T> {
        self.map_err(|err| PersistenceError::backend(err.into()))
    }
}

fn encode<R: Record>(record: &R) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(PersistenceError::serialization::<R>)
}

fn decode<R: Record>(bytes: &[u8]) -> Result<R> {
    serde_json::from_slice(bytes).map_err(PersistenceError::serialization::<R>)
}

pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open or create the database file at `path`, creating parent
    /// directories and the known tables as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    PersistenceError::backend(format!("creating {}: {err}", parent.display()))
                })?;
            }
        }
        let db = Database::create(&path).backend()?;

        {
            let tx = db.begin_write().backend()?;
            tx.open_table(SEQUENCES_TABLE).backend()?;
            tx.open_table(records_table::<Plant>()).backend()?;
            tx.open_table(records_table::<Comment>()).backend()?;
            tx.open_table(records_table::<PlantLogEntry>()).backend()?;
            tx.commit().backend()?;
        }

        debug!(path = %path.display(), "opened plantcare database");
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all<R: Record>(&self) -> Result<Vec<R>> {
        let tx = self.db.begin_read().backend()?;
        let table = match tx.open_table(records_table::<R>()) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(PersistenceError::backend(redb::Error::from(err))),
        };
        let mut records = Vec::new();
        for row in table.iter().backend()? {
            let (_, value) = row.backend()?;
            records.push(decode::<R>(value.value())?);
        }
        Ok(records)
    }
}

#[async_trait]
impl Store for RedbStore {
    async fn create<R: Record>(&self, mut record: R) -> Result<R> {
        let tx = self.db.begin_write().backend()?;
        {
            let mut sequences = tx.open_table(SEQUENCES_TABLE).backend()?;
            let last = sequences
                .get(R::TABLE)
                .backend()?
                .map(|v| v.value())
                .unwrap_or(0);
            let next = last + 1;
            sequences.insert(R::TABLE, next).backend()?;

            record.assign(next, Utc::now());
            let bytes = encode(&record)?;
            let mut table = tx.open_table(records_table::<R>()).backend()?;
            table.insert(next, bytes.as_slice()).backend()?;
        }
        tx.commit().backend()?;
        Ok(record)
    }

    async fn get<R: Record>(&self, id: RecordId) -> Result<Option<R>> {
        let tx = self.db.begin_read().backend()?;
        let table = match tx.open_table(records_table::<R>()) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(PersistenceError::backend(redb::Error::from(err))),
        };
        match table.get(id).backend()? {
            None => Ok(None),
            Some(value) => decode::<R>(value.value()).map(Some),
        }
    }

    async fn update<R: Record>(&self, record: &R) -> Result<()> {
        let tx = self.db.begin_write().backend()?;
        {
            let mut table = tx.open_table(records_table::<R>()).backend()?;
            let exists = table.get(record.id()).backend()?.is_some();
            if !exists {
                return Err(PersistenceError::not_found::<R>(record.id()));
            }
            let mut record = record.clone();
            record.touch(Utc::now());
            let bytes = encode(&record)?;
            table.insert(record.id(), bytes.as_slice()).backend()?;
        }
        tx.commit().backend()?;
        Ok(())
    }

    async fn modify<R, F>(&self, id: RecordId, change: F) -> Result<R>
    where
        R: Record,
        F: FnOnce(&mut R) + Send + 'static,
    {
        let tx = self.db.begin_write().backend()?;
        let record = {
            let mut table = tx.open_table(records_table::<R>()).backend()?;
            let stored = table.get(id).backend()?.map(|v| v.value().to_vec());
            let Some(stored) = stored else {
                return Err(PersistenceError::not_found::<R>(id));
            };
            let mut record = decode::<R>(&stored)?;
            change(&mut record);
            record.touch(Utc::now());
            let bytes = encode(&record)?;
            table.insert(id, bytes.as_slice()).backend()?;
            record
        };
        tx.commit().backend()?;
        Ok(record)
    }

    async fn find<R: Record>(&self, query: Query) -> Result<Vec<R>> {
        let mut records: Vec<R> = self
            .read_all::<R>()?
            .into_iter()
            .filter(|record| query.scope.contains(record))
            .collect();
        creation_order(&mut records);
        if let Some(limit) = query.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn count<R: Record>(&self, scope: Scope) -> Result<usize> {
        if scope == Scope::All {
            let tx = self.db.begin_read().backend()?;
            return match tx.open_table(records_table::<R>()) {
                Ok(table) => Ok(table.len().backend()? as usize),
                Err(TableError::TableDoesNotExist(_)) => Ok(0),
                Err(err) => Err(PersistenceError::backend(redb::Error::from(err))),
            };
        }
        Ok(self
            .read_all::<R>()?
            .iter()
            .filter(|record| scope.contains(*record))
            .count())
    }

    async fn delete<R: Record>(&self, ids: &[RecordId]) -> Result<usize> {
        let tx = self.db.begin_write().backend()?;
        let mut removed = 0;
        {
            let mut table = tx.open_table(records_table::<R>()).backend()?;
            for id in ids {
                if table.remove(*id).backend()?.is_some() {
                    removed += 1;
                }
            }
        }
        tx.commit().backend()?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use plantcare_core::{Owner, Plant, PlantCareState};
    use tempfile::TempDir;

    use super::*;
    use crate::conformance;

    fn open_in(dir: &TempDir) -> RedbStore {
        RedbStore::open(dir.path().join("db/plantcare.redb")).unwrap()
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let dir = TempDir::new().unwrap();
        conformance::create_assigns_increasing_ids(&open_in(&dir)).await;
    }

    #[tokio::test]
    async fn find_is_scoped_and_ordered() {
        let dir = TempDir::new().unwrap();
        conformance::find_is_scoped_and_ordered(&open_in(&dir)).await;
    }

    #[tokio::test]
    async fn update_and_modify_persist() {
        let dir = TempDir::new().unwrap();
        conformance::update_and_modify_persist(&open_in(&dir)).await;
    }

    #[tokio::test]
    async fn missing_records() {
        let dir = TempDir::new().unwrap();
        conformance::missing_records(&open_in(&dir)).await;
    }

    #[tokio::test]
    async fn delete_scope_removes_children_only() {
        let dir = TempDir::new().unwrap();
        conformance::delete_scope_removes_children_only(&open_in(&dir)).await;
    }

    #[tokio::test]
    async fn records_and_sequences_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let first_id = {
            let store = open_in(&dir);
            assert!(store.path().ends_with("db/plantcare.redb"));
            let plant = store
                .create(Plant::new(
                    Owner::new("ada@example.com", "ada"),
                    PlantCareState { name: "Fern".into(), ..Default::default() },
                ))
                .await
                .unwrap();
            plant.id
        };

        let store = open_in(&dir);
        let loaded: Plant = store.get(first_id).await.unwrap().unwrap();
        assert_eq!(loaded.care.name, "Fern");
        assert_eq!(loaded.owner.email, "ada@example.com");

        let second = store
            .create(Plant::new(Owner::default(), PlantCareState::default()))
            .await
            .unwrap();
        assert!(second.id > first_id);
    }
}
