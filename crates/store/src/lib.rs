//! Persistence collaborator for plants, comments and audit log entries.
//!
//! The [`Store`] trait is the whole contract the rest of the workspace relies
//! on: create / read / update / delete, counting and creation-ordered
//! retrieval, scoped either to a whole record kind or to the children of one
//! plant.  Two backends ship with the crate:
//!
//! | Backend         | Durability | Used by                      |
//! |-----------------|------------|------------------------------|
//! | [`RedbStore`]   | on disk    | the `plantcare` binary       |
//! | [`MemoryStore`] | process    | tests and throwaway sessions |
//!
//! Bounded collections are enforced by [`retention::make_room`], a FIFO
//! eviction that runs before each insert.

mod error;
mod memory;
mod record;
mod redb_store;
pub mod retention;

use async_trait::async_trait;
use plantcare_core::RecordId;

pub use error::PersistenceError;
pub use memory::MemoryStore;
pub use record::{Query, Record, Scope};
pub use redb_store::RedbStore;
pub use retention::{insert_bounded, make_room};

pub type Result<T, E = PersistenceError> = std::result::Result<T, E>;

/// Typed record storage with creation-ordered retrieval.
///
/// Identifiers and creation timestamps are assigned by the store on
/// [`create`](Store::create).  Every method is atomic with respect to the
/// records it touches; [`modify`](Store::modify) in particular is a single
/// read-modify-write so concurrent writers to the same record cannot lose
/// each other's changes.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create<R: Record>(&self, record: R) -> Result<R>;

    async fn get<R: Record>(&self, id: RecordId) -> Result<Option<R>>;

    /// Overwrite an existing record.  Fails with `NotFound` if it is gone.
    async fn update<R: Record>(&self, record: &R) -> Result<()>;

    /// Apply `change` to the stored record atomically and return the result.
    async fn modify<R, F>(&self, id: RecordId, change: F) -> Result<R>
    where
        R: Record,
        F: FnOnce(&mut R) + Send + 'static;

    /// Records in scope, oldest first.
    async fn find<R: Record>(&self, query: Query) -> Result<Vec<R>>;

    async fn count<R: Record>(&self, scope: Scope) -> Result<usize>;

    /// Delete by id; unknown ids are skipped.  Returns how many were removed.
    async fn delete<R: Record>(&self, ids: &[RecordId]) -> Result<usize>;

    async fn delete_scope<R: Record>(&self, scope: Scope) -> Result<usize> {
        let ids: Vec<RecordId> = self
            .find::<R>(Query::new(scope))
            .await?
            .iter()
            .map(Record::id)
            .collect();
        self.delete::<R>(&ids).await
    }
}

/// Sort oldest first; ids break ties between records created in the same instant.
pub(crate) fn creation_order<R: Record>(records: &mut [R]) {
    records.sort_by_key(|r| (r.created_at(), r.id()));
}
