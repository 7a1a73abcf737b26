//! FIFO retention ceilings.
//!
//! Eviction is by creation order only; reading or updating a record does not
//! protect it.

use plantcare_core::RecordId;
use tracing::{debug, info};

use crate::{Query, Record, Result, Scope, Store};

/// Evict the oldest records in `scope` so that one more insert leaves at most
/// `ceiling` of them.  Returns the evicted ids, oldest first, so
/// callers can cascade to dependent records.
///
/// A `ceiling` of zero is treated as one: the collection is never refused a
/// new record.
pub async fn make_room<R, S>(store: &S, scope: Scope, ceiling: usize) -> Result<Vec<RecordId>>
where
    R: Record,
    S: Store,
{
    let keep = ceiling.max(1) - 1;
    let count = store.count::<R>(scope).await?;
    if count <= keep {
        return Ok(Vec::new());
    }

    let excess = count - keep;
    let oldest: Vec<RecordId> = store
        .find::<R>(Query::new(scope).limit(excess))
        .await?
        .iter()
        .map(Record::id)
        .collect();
    let removed = store.delete::<R>(&oldest).await?;
    if removed > 0 {
        info!(table = R::TABLE, ?scope, removed, ceiling, "evicted oldest records");
    }
    Ok(oldest)
}

/// [`make_room`] then [`Store::create`].
pub async fn insert_bounded<R, S>(store: &S, record: R, scope: Scope, ceiling: usize) -> Result<R>
where
    R: Record,
    S: Store,
{
    make_room::<R, S>(store, scope, ceiling).await?;
    let created = store.create(record).await?;
    debug!(table = R::TABLE, id = created.id(), "inserted record");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use plantcare_core::{Owner, Plant, PlantCareState, PlantLogEntry};

    use super::*;
    use crate::MemoryStore;

    fn plant(n: usize) -> Plant {
        Plant::new(
            Owner::new("ada@example.com", "ada"),
            PlantCareState { name: format!("plant-{n}"), ..Default::default() },
        )
    }

    #[tokio::test]
    async fn plant_ceiling_keeps_most_recent() {
        let store = MemoryStore::new();
        for n in 0..505 {
            insert_bounded(&store, plant(n), Scope::All, 500).await.unwrap();
            assert!(store.count::<Plant>(Scope::All).await.unwrap() <= 500);
        }

        let plants: Vec<Plant> = store.find(Query::all()).await.unwrap();
        assert_eq!(plants.len(), 500);
        assert_eq!(plants.first().unwrap().care.name, "plant-5");
        assert_eq!(plants.last().unwrap().care.name, "plant-504");
    }

    #[tokio::test]
    async fn per_plant_ceiling_leaves_other_plants_alone() {
        let store = MemoryStore::new();
        for n in 0..3 {
            store.create(PlantLogEntry::new(2, format!("other-{n}"))).await.unwrap();
        }
        for n in 0..14 {
            insert_bounded(&store, PlantLogEntry::new(1, format!("entry-{n}")), Scope::Parent(1), 10)
                .await
                .unwrap();
        }

        let entries: Vec<PlantLogEntry> = store.find(Query::children_of(1)).await.unwrap();
        let messages: Vec<String> = entries.into_iter().map(|e| e.message).collect();
        let expected: Vec<String> = (4..14).map(|n| format!("entry-{n}")).collect();
        assert_eq!(messages, expected);
        assert_eq!(store.count::<PlantLogEntry>(Scope::Parent(2)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn make_room_below_ceiling_is_a_no_op() {
        let store = MemoryStore::new();
        store.create(plant(0)).await.unwrap();
        assert!(make_room::<Plant, _>(&store, Scope::All, 500).await.unwrap().is_empty());
        assert_eq!(store.count::<Plant>(Scope::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn make_room_trims_an_overfull_collection() {
        let store = MemoryStore::new();
        for n in 0..8 {
            store.create(plant(n)).await.unwrap();
        }
        // A lowered ceiling catches up in one call.
        assert_eq!(make_room::<Plant, _>(&store, Scope::All, 5).await.unwrap(), vec![1, 2, 3, 4]);
        let plants: Vec<Plant> = store.find(Query::all()).await.unwrap();
        assert_eq!(plants.len(), 4);
        assert_eq!(plants[0].care.name, "plant-4");
    }
}
