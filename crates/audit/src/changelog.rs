use std::sync::Arc;

use tracing::{debug, info};

use plantcare_core::{Plant, PlantCareState, PlantLogEntry, RecordId};
use plantcare_store::{PersistenceError, Query, Scope, Store, insert_bounded};

use crate::diff::{LogMessage, diff};
use crate::validate::validate;
use crate::AuditError;

/// Entries kept per plant unless configured otherwise.
pub const DEFAULT_MAX_ENTRIES: usize = 10;

/// A plant's bounded, creation-ordered audit trail.
pub struct ChangeLog<S> {
    store: Arc<S>,
    max_entries: usize,
}

impl<S> Clone for ChangeLog<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            max_entries: self.max_entries,
        }
    }
}

impl<S: Store> ChangeLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Append one entry, evicting the plant's oldest first if it is full.
    pub async fn record(
        &self,
        plant_id: RecordId,
        message: impl Into<String>,
    ) -> Result<PlantLogEntry, PersistenceError> {
        let entry = PlantLogEntry::new(plant_id, message);
        insert_bounded(&*self.store, entry, Scope::Parent(plant_id), self.max_entries).await
    }

    /// Append `messages` in order.  Retention runs before every insert, so the
    /// ceiling holds between any two writes, not just at the end.
    ///
    /// Stops at the first failed write; entries already appended stay.
    pub async fn append_entries(
        &self,
        plant_id: RecordId,
        messages: &[LogMessage],
    ) -> Result<Vec<PlantLogEntry>, PersistenceError> {
        let mut written = Vec::with_capacity(messages.len());
        for message in messages {
            written.push(self.record(plant_id, message.text.clone()).await?);
        }
        Ok(written)
    }

    /// The plant's entries, oldest first.
    pub async fn entries(&self, plant_id: RecordId) -> Result<Vec<PlantLogEntry>, PersistenceError> {
        self.store.find(Query::children_of(plant_id)).await
    }

    /// Drop every entry of a plant that is being deleted.
    pub async fn purge(&self, plant_id: RecordId) -> Result<usize, PersistenceError> {
        let removed = self.store.delete_scope::<PlantLogEntry>(Scope::Parent(plant_id)).await?;
        debug!(plant_id, removed, "purged plant log");
        Ok(removed)
    }

    /// Validate `incoming` and log what differs from `existing`.  Nothing is
    /// written when validation fails.
    pub async fn record_update(
        &self,
        existing: &Plant,
        incoming: &PlantCareState,
    ) -> Result<Vec<PlantLogEntry>, AuditError> {
        validate(incoming)?;

        let messages = diff(&existing.care, incoming);
        let written = self.append_entries(existing.id, &messages).await?;
        if !written.is_empty() {
            info!(plant_id = existing.id, changes = written.len(), "logged plant changes");
        }
        Ok(written)
    }

    /// [`record_update`](Self::record_update), then the merged plant.  The
    /// plant itself is not persisted here.
    pub async fn apply_update(
        &self,
        existing: &Plant,
        incoming: &PlantCareState,
    ) -> Result<Plant, AuditError> {
        self.record_update(existing, incoming).await?;
        Ok(Plant {
            care: merge_care(&existing.care, incoming),
            ..existing.clone()
        })
    }
}

/// User-editable fields come from `incoming`; notify dates from `current`.
/// A notify date is cleared when `incoming` moves its tracked date away from
/// the one in `current`.
///
/// Pure, so a caller can run it inside [`Store::modify`] against the stored
/// state and not lose a reminder stamp written since `current` was read.
pub fn merge_care(current: &PlantCareState, incoming: &PlantCareState) -> PlantCareState {
    let water_changed = current.last_water_date != incoming.last_water_date
        || current.last_moist_date != incoming.last_moist_date;
    let fertilize_changed = current.last_fertilize_date != incoming.last_fertilize_date;

    let mut care = PlantCareState {
        last_water_notify_date: current.last_water_notify_date.clone(),
        last_moist_notify_date: current.last_moist_notify_date.clone(),
        last_fertilize_notify_date: current.last_fertilize_notify_date.clone(),
        ..incoming.clone()
    };
    if water_changed {
        debug!("water or moist date changed, clearing water reminders");
        care.last_water_notify_date.clear();
        care.last_moist_notify_date.clear();
    }
    if fertilize_changed {
        debug!("fertilize date changed, clearing fertilize reminder");
        care.last_fertilize_notify_date.clear();
    }
    care
}
