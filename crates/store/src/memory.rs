use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;

use plantcare_core::RecordId;

use crate::{PersistenceError, Query, Record, Result, Scope, Store, creation_order};

#[derive(Debug, Default)]
struct Tables {
    rows: HashMap<&'static str, BTreeMap<RecordId, Value>>,
    sequences: HashMap<&'static str, RecordId>,
}

impl Tables {
    fn decode_all<R: Record>(&self) -> Result<Vec<R>> {
        let Some(rows) = self.rows.get(R::TABLE) else {
            return Ok(Vec::new());
        };
        rows.values()
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(PersistenceError::serialization::<R>)
            })
            .collect()
    }
}

/// Process-local store.  Records are held as JSON values so every record
/// kind shares one set of tables, exactly as the on-disk backend does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn encode<R: Record>(record: &R) -> Result<Value> {
    serde_json::to_value(record).map_err(PersistenceError::serialization::<R>)
}

#[async_trait]
impl Store for MemoryStore {
    async fn create<R: Record>(&self, mut record: R) -> Result<R> {
        let mut tables = self.tables.lock().await;
        let next = tables.sequences.get(R::TABLE).copied().unwrap_or(0) + 1;
        record.assign(next, Utc::now());
        let value = encode(&record)?;
        tables.sequences.insert(R::TABLE, next);
        tables.rows.entry(R::TABLE).or_default().insert(next, value);
        Ok(record)
    }

    async fn get<R: Record>(&self, id: RecordId) -> Result<Option<R>> {
        let tables = self.tables.lock().await;
        tables
            .rows
            .get(R::TABLE)
            .and_then(|rows| rows.get(&id))
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(PersistenceError::serialization::<R>)
            })
            .transpose()
    }

    async fn update<R: Record>(&self, record: &R) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let rows = tables.rows.entry(R::TABLE).or_default();
        let Some(slot) = rows.get_mut(&record.id()) else {
            return Err(PersistenceError::not_found::<R>(record.id()));
        };
        let mut record = record.clone();
        record.touch(Utc::now());
        *slot = encode(&record)?;
        Ok(())
    }

    async fn modify<R, F>(&self, id: RecordId, change: F) -> Result<R>
    where
        R: Record,
        F: FnOnce(&mut R) + Send + 'static,
    {
        let mut tables = self.tables.lock().await;
        let rows = tables.rows.entry(R::TABLE).or_default();
        let Some(slot) = rows.get_mut(&id) else {
            return Err(PersistenceError::not_found::<R>(id));
        };
        let mut record: R =
            serde_json::from_value(slot.clone()).map_err(PersistenceError::serialization::<R>)?;
        change(&mut record);
        record.touch(Utc::now());
        *slot = encode(&record)?;
        Ok(record)
    }

    async fn find<R: Record>(&self, query: Query) -> Result<Vec<R>> {
        let tables = self.tables.lock().await;
        let mut records: Vec<R> = tables
            .decode_all::<R>()?
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
        let tables = self.tables.lock().await;
        if scope == Scope::All {
            return Ok(tables.rows.get(R::TABLE).map(BTreeMap::len).unwrap_or(0));
        }
        Ok(tables
            .decode_all::<R>()?
            .iter()
            .filter(|record| scope.contains(*record))
            .count())
    }

    async fn delete<R: Record>(&self, ids: &[RecordId]) -> Result<usize> {
        let mut tables = self.tables.lock().await;
        let Some(rows) = tables.rows.get_mut(R::TABLE) else {
            return Ok(0);
        };
        Ok(ids.iter().filter(|id| rows.remove(*id).is_some()).count())
    }
}
