use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use plantcare_core::{Comment, Plant, PlantLogEntry, RecordId};

/// A kind of record the store can hold.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Table (or collection) name; also the key of the id sequence.
    const TABLE: &'static str;

    fn id(&self) -> RecordId;

    fn created_at(&self) -> DateTime<Utc>;

    /// Called once by the store on insert.
    fn assign(&mut self, id: RecordId, created_at: DateTime<Utc>);

    /// The plant this record belongs to, for child records.
    fn parent_id(&self) -> Option<RecordId> {
        None
    }

    /// Called by the store on every overwrite.
    fn touch(&mut self, _at: DateTime<Utc>) {}
}

impl Record for Plant {
    const TABLE: &'static str = "plants";

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn assign(&mut self, id: RecordId, created_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
        self.updated_at = created_at;
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl Record for Comment {
    const TABLE: &'static str = "comments";

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn assign(&mut self, id: RecordId, created_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.plant_id)
    }
}

impl Record for PlantLogEntry {
    const TABLE: &'static str = "plant_logs";

    fn id(&self) -> RecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn assign(&mut self, id: RecordId, created_at: DateTime<Utc>) {
        self.id = id;
        self.created_at = created_at;
    }

    fn parent_id(&self) -> Option<RecordId> {
        Some(self.plant_id)
    }
}

/// Which records of a kind a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    /// Children of one plant.
    Parent(RecordId),
}

impl Scope {
    pub fn contains<R: Record>(self, record: &R) -> bool {
        match self {
            Self::All => true,
            Self::Parent(id) => record.parent_id() == Some(id),
        }
    }
}

/// A scoped, creation-ordered read with an optional row limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub scope: Scope,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(scope: Scope) -> Self {
        Self { scope, limit: None }
    }

    pub fn all() -> Self {
        Self::new(Scope::All)
    }

    pub fn children_of(plant_id: RecordId) -> Self {
        Self::new(Scope::Parent(plant_id))
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
