//! Plant and comment workflows on top of the store and the change log.
//!
//! Callers identify themselves by e-mail address.  Authentication happens
//! elsewhere; the checks here are ownership rules only.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use plantcare_audit::{ChangeLog, merge_care, validate};
use plantcare_config::RetentionConfig;
use plantcare_core::{Comment, Owner, Plant, PlantCareState, PlantLogEntry, RecordId};
use plantcare_store::{Query, Scope, Store, make_room};

use crate::error::ServiceError;

pub type Result<T, E = ServiceError> = std::result::Result<T, E>;

/// A plant with its audit trail and comments, oldest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantDetails {
    #[serde(flatten)]
    pub plant: Plant,
    pub logs: Vec<PlantLogEntry>,
    pub comments: Vec<Comment>,
}

pub struct PlantService<S> {
    store: Arc<S>,
    log: ChangeLog<S>,
    retention: RetentionConfig,
}

impl<S: Store> PlantService<S> {
    pub fn new(store: Arc<S>, retention: RetentionConfig) -> Self {
        let log = ChangeLog::new(Arc::clone(&store)).with_max_entries(retention.max_log_entries);
        Self {
            store,
            log,
            retention,
        }
    }

    pub fn change_log(&self) -> &ChangeLog<S> {
        &self.log
    }

    // ── Plants ─────────────────────────────────────────────────────────────

    /// Create a plant for `owner`.  Reminder state, the moist date and notes
    /// always start empty.  Evicts the oldest plants when the ceiling is hit.
    pub async fn add_plant(&self, owner: Owner, mut care: PlantCareState) -> Result<Plant> {
        if owner.email.is_empty() {
            return Err(ServiceError::Forbidden("Must be logged in to add plants."));
        }
        validate(&care)?;

        care.clear_notify_dates();
        care.last_moist_date.clear();
        care.notes.clear();

        let evicted = make_room::<Plant, S>(&*self.store, Scope::All, self.retention.max_plants).await?;
        for id in evicted {
            self.purge_children(id).await?;
        }

        let plant = self.store.create(Plant::new(owner, care)).await?;
        self.log.record(plant.id, "Created plant!").await?;
        info!(plant_id = plant.id, owner = %plant.owner.email, name = %plant.care.name, "plant created");
        Ok(plant)
    }

    /// Apply `incoming` to a plant owned by `actor`, logging every change.
    pub async fn update_plant(
        &self,
        actor: &str,
        plant_id: RecordId,
        incoming: PlantCareState,
    ) -> Result<Plant> {
        let existing = self.owned_plant(actor, plant_id).await?;
        self.log.record_update(&existing, &incoming).await?;

        // Merge against the stored state: a reminder stamped since `existing`
        // was read must survive.
        let plant = self
            .store
            .modify::<Plant, _>(plant_id, move |p| p.care = merge_care(&p.care, &incoming))
            .await?;
        info!(plant_id, "plant updated");
        Ok(plant)
    }

    /// Delete a plant owned by `actor` together with its log and comments.
    pub async fn delete_plant(&self, actor: &str, plant_id: RecordId) -> Result<()> {
        self.owned_plant(actor, plant_id).await?;
        self.purge_children(plant_id).await?;
        self.store.delete::<Plant>(&[plant_id]).await?;
        info!(plant_id, "plant deleted");
        Ok(())
    }

    pub async fn plant_details(&self, viewer: Option<&str>, plant_id: RecordId) -> Result<PlantDetails> {
        let plant = self.visible_plant(viewer, plant_id).await?;
        let logs = self.log.entries(plant_id).await?;
        let comments = self.store.find(Query::children_of(plant_id)).await?;
        Ok(PlantDetails {
            plant,
            logs,
            comments,
        })
    }

    /// The viewer's own plants plus every public one; public only when
    /// anonymous.
    pub async fn visible_plants(&self, viewer: Option<&str>) -> Result<Vec<Plant>> {
        let plants: Vec<Plant> = self.store.find(Query::all()).await?;
        Ok(plants
            .into_iter()
            .filter(|plant| plant.is_visible_to(viewer))
            .collect())
    }

    // ── Comments ───────────────────────────────────────────────────────────

    /// Comment on a plant that is public or belongs to `author`.
    pub async fn add_comment(
        &self,
        author: Owner,
        plant_id: RecordId,
        content: &str,
    ) -> Result<Comment> {
        if author.email.is_empty() {
            return Err(ServiceError::Forbidden("Must be logged in to post comments."));
        }
        let content = content.trim();
        if content.is_empty() {
            return Err(ServiceError::Validation("Comment cannot be empty.".to_string()));
        }

        let plant = self.plant(plant_id).await?;
        if !plant.is_visible_to(Some(&author.email)) {
            return Err(ServiceError::Forbidden(
                "This plant is not public and also not yours, you cannot comment on it!",
            ));
        }

        make_room::<Comment, S>(&*self.store, Scope::All, self.retention.max_comments).await?;
        let comment = self.store.create(Comment::new(plant_id, author, content)).await?;
        info!(plant_id, comment_id = comment.id, "comment added");
        Ok(comment)
    }

    /// Comments may be removed by their author or by the plant's owner.
    pub async fn delete_comment(&self, actor: &str, comment_id: RecordId) -> Result<()> {
        let comment: Comment = self
            .store
            .get(comment_id)
            .await?
            .ok_or(ServiceError::NotFound { kind: "comment", id: comment_id })?;
        let plant: Option<Plant> = self.store.get(comment.plant_id).await?;

        let is_author = !actor.is_empty() && comment.author.email == actor;
        let owns_plant = plant.is_some_and(|p| p.is_owned_by(actor));
        if !is_author && !owns_plant {
            return Err(ServiceError::Forbidden(
                "This isn't your comment, nor a comment on your plant!",
            ));
        }

        self.store.delete::<Comment>(&[comment_id]).await?;
        info!(comment_id, plant_id = comment.plant_id, "comment deleted");
        Ok(())
    }

    /// A plant's comments, oldest first.  When the owner is the one looking,
    /// unread comments are marked viewed.
    pub async fn comments_for_plant(
        &self,
        viewer: Option<&str>,
        plant_id: RecordId,
    ) -> Result<Vec<Comment>> {
        let plant = self.visible_plant(viewer, plant_id).await?;
        let mut comments: Vec<Comment> = self.store.find(Query::children_of(plant_id)).await?;

        if viewer.is_some_and(|email| plant.is_owned_by(email)) {
            for comment in comments.iter_mut().filter(|c| !c.viewed) {
                self.store
                    .modify::<Comment, _>(comment.id, |c| c.viewed = true)
                    .await?;
                comment.viewed = true;
                debug!(comment_id = comment.id, "comment marked viewed");
            }
        }
        Ok(comments)
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    async fn plant(&self, plant_id: RecordId) -> Result<Plant> {
        self.store
            .get(plant_id)
            .await?
            .ok_or(ServiceError::NotFound { kind: "plant", id: plant_id })
    }

    async fn owned_plant(&self, actor: &str, plant_id: RecordId) -> Result<Plant> {
        let plant = self.plant(plant_id).await?;
        if !plant.is_owned_by(actor) {
            debug!(plant_id, actor, owner = %plant.owner.email, "rejected change to another user's plant");
            return Err(ServiceError::Forbidden("This isn't your plant!"));
        }
        Ok(plant)
    }

    async fn visible_plant(&self, viewer: Option<&str>, plant_id: RecordId) -> Result<Plant> {
        let plant = self.plant(plant_id).await?;
        if !plant.is_visible_to(viewer) {
            return Err(ServiceError::Forbidden("This plant is not public and also not yours!"));
        }
        Ok(plant)
    }

    async fn purge_children(&self, plant_id: RecordId) -> Result<()> {
        self.log.purge(plant_id).await?;
        let comments = self.store.delete_scope::<Comment>(Scope::Parent(plant_id)).await?;
        debug!(plant_id, comments, "removed plant comments");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use plantcare_store::{MemoryStore, Record};

    use super::*;

    const ADA: &str = "ada@example.com";
    const BOB: &str = "bob@example.com";

    fn ada() -> Owner {
        Owner::new(ADA, "ada")
    }

    fn bob() -> Owner {
        Owner::new(BOB, "bob")
    }

    fn fern() -> PlantCareState {
        PlantCareState {
            name: "Fern".into(),
            watering_interval_days: 7,
            last_water_date: "03/01/2023".into(),
            last_fertilize_date: "03/01/2023".into(),
            do_notify: true,
            ..Default::default()
        }
    }

    fn service() -> PlantService<MemoryStore> {
        PlantService::new(Arc::new(MemoryStore::new()), RetentionConfig::default())
    }

    fn messages(details: &PlantDetails) -> Vec<&str> {
        details.logs.iter().map(|e| e.message.as_str()).collect()
    }

    #[tokio::test]
    async fn add_plant_starts_clean_and_logs_creation() {
        let svc = service();
        let incoming = PlantCareState {
            notes: "from the nursery".into(),
            last_moist_date: "03/01/2023".into(),
            last_water_notify_date: "03/02/2023".into(),
            ..fern()
        };
        let plant = svc.add_plant(ada(), incoming).await.unwrap();
        assert!(plant.care.notes.is_empty());
        assert!(plant.care.last_moist_date.is_empty());
        assert!(plant.care.last_water_notify_date.is_empty());

        let details = svc.plant_details(Some(ADA), plant.id).await.unwrap();
        assert_eq!(messages(&details), vec!["Created plant!"]);
    }

    #[tokio::test]
    async fn add_plant_validates() {
        let svc = service();
        let err = svc
            .add_plant(ada(), PlantCareState { watering_interval_days: 0, ..fern() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "Invalid watering frequency."));
        assert!(svc.visible_plants(Some(ADA)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dates_must_be_readable() {
        let svc = service();
        let err = svc
            .add_plant(ada(), PlantCareState { last_water_date: "2023-03-01".into(), ..fern() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "Invalid last watering date."));

        let plant = svc.add_plant(ada(), fern()).await.unwrap();
        let err = svc
            .update_plant(ADA, plant.id, PlantCareState { last_fertilize_date: "yesterday".into(), ..fern() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref msg) if msg == "Invalid last fertilize date."));
        let details = svc.plant_details(Some(ADA), plant.id).await.unwrap();
        assert_eq!(details.plant.care.last_fertilize_date, "03/01/2023");
    }

    #[tokio::test]
    async fn plant_ceiling_evicts_oldest_with_children() {
        let store = Arc::new(MemoryStore::new());
        let retention = RetentionConfig { max_plants: 2, ..Default::default() };
        let svc = PlantService::new(Arc::clone(&store), retention);

        let first = svc.add_plant(ada(), fern()).await.unwrap();
        svc.add_comment(ada(), first.id, "looking good").await.unwrap();
        svc.add_plant(ada(), fern()).await.unwrap();
        svc.add_plant(ada(), fern()).await.unwrap();

        assert_eq!(store.count::<Plant>(Scope::All).await.unwrap(), 2);
        assert!(store.get::<Plant>(first.id).await.unwrap().is_none());
        assert_eq!(store.count::<PlantLogEntry>(Scope::Parent(first.id)).await.unwrap(), 0);
        assert_eq!(store.count::<Comment>(Scope::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_plant_logs_and_persists() {
        let svc = service();
        let plant = svc.add_plant(ada(), fern()).await.unwrap();

        let updated = svc
            .update_plant(ADA, plant.id, PlantCareState { name: "Ficus".into(), ..fern() })
            .await
            .unwrap();
        assert_eq!(updated.care.name, "Ficus");

        let details = svc.plant_details(Some(ADA), plant.id).await.unwrap();
        assert_eq!(details.plant.care.name, "Ficus");
        assert_eq!(messages(&details), vec!["Created plant!", "Name changed from Fern to Ficus"]);
    }

    /// Stamps a water reminder on the next plant log append, standing in for
    /// a sweep that lands while an update is being processed.
    struct StampOnLogAppend {
        inner: MemoryStore,
        pending: std::sync::Mutex<Option<RecordId>>,
    }

    #[async_trait::async_trait]
    impl Store for StampOnLogAppend {
        async fn create<R: Record>(&self, record: R) -> plantcare_store::Result<R> {
            if R::TABLE == PlantLogEntry::TABLE {
                let pending = self.pending.lock().unwrap().take();
                if let Some(plant_id) = pending {
                    self.inner
                        .modify::<Plant, _>(plant_id, |p| {
                            p.care.last_water_notify_date = "03/12/2023".into();
                        })
                        .await?;
                }
            }
            self.inner.create(record).await
        }

        async fn get<R: Record>(&self, id: RecordId) -> plantcare_store::Result<Option<R>> {
            self.inner.get(id).await
        }

        async fn update<R: Record>(&self, record: &R) -> plantcare_store::Result<()> {
            self.inner.update(record).await
        }

        async fn modify<R, F>(&self, id: RecordId, change: F) -> plantcare_store::Result<R>
        where
            R: Record,
            F: FnOnce(&mut R) + Send + 'static,
        {
            self.inner.modify(id, change).await
        }

        async fn find<R: Record>(&self, query: Query) -> plantcare_store::Result<Vec<R>> {
            self.inner.find(query).await
        }

        async fn count<R: Record>(&self, scope: Scope) -> plantcare_store::Result<usize> {
            self.inner.count::<R>(scope).await
        }

        async fn delete<R: Record>(&self, ids: &[RecordId]) -> plantcare_store::Result<usize> {
            self.inner.delete::<R>(ids).await
        }
    }

    #[tokio::test]
    async fn update_keeps_reminder_stamped_meanwhile() {
        let store = Arc::new(StampOnLogAppend {
            inner: MemoryStore::new(),
            pending: std::sync::Mutex::new(None),
        });
        let svc = PlantService::new(Arc::clone(&store), RetentionConfig::default());
        let plant = svc.add_plant(ada(), fern()).await.unwrap();

        *store.pending.lock().unwrap() = Some(plant.id);
        let updated = svc
            .update_plant(ADA, plant.id, PlantCareState { name: "Ficus".into(), ..fern() })
            .await
            .unwrap();
        assert_eq!(updated.care.name, "Ficus");
        assert_eq!(updated.care.last_water_notify_date, "03/12/2023");

        // A new water date still starts a fresh cycle.
        *store.pending.lock().unwrap() = Some(plant.id);
        let watered = svc
            .update_plant(
                ADA,
                plant.id,
                PlantCareState {
                    name: "Ficus".into(),
                    last_water_date: "03/12/2023".into(),
                    ..fern()
                },
            )
            .await
            .unwrap();
        assert!(watered.care.last_water_notify_date.is_empty());
    }

    #[tokio::test]
    async fn only_the_owner_may_change_a_plant() {
        let svc = service();
        let plant = svc.add_plant(ada(), fern()).await.unwrap();

        let err = svc
            .update_plant(BOB, plant.id, PlantCareState { name: "Mine now".into(), ..fern() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden("This isn't your plant!")));
        assert!(matches!(
            svc.delete_plant(BOB, plant.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            svc.delete_plant(ADA, 999).await,
            Err(ServiceError::NotFound { kind: "plant", id: 999 })
        ));
    }

    #[tokio::test]
    async fn delete_plant_cascades() {
        let store = Arc::new(MemoryStore::new());
        let svc = PlantService::new(Arc::clone(&store), RetentionConfig::default());
        let plant = svc.add_plant(ada(), PlantCareState { is_public: true, ..fern() }).await.unwrap();
        let other = svc.add_plant(ada(), fern()).await.unwrap();
        svc.add_comment(bob(), plant.id, "nice fern").await.unwrap();

        svc.delete_plant(ADA, plant.id).await.unwrap();

        assert!(store.get::<Plant>(plant.id).await.unwrap().is_none());
        assert_eq!(store.count::<PlantLogEntry>(Scope::Parent(plant.id)).await.unwrap(), 0);
        assert_eq!(store.count::<Comment>(Scope::Parent(plant.id)).await.unwrap(), 0);
        assert_eq!(store.count::<PlantLogEntry>(Scope::Parent(other.id)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn visibility_depends_on_viewer() {
        let svc = service();
        svc.add_plant(ada(), PlantCareState { name: "Public".into(), is_public: true, ..fern() })
            .await
            .unwrap();
        let private = svc
            .add_plant(ada(), PlantCareState { name: "Private".into(), ..fern() })
            .await
            .unwrap();

        assert_eq!(svc.visible_plants(None).await.unwrap().len(), 1);
        assert_eq!(svc.visible_plants(Some(BOB)).await.unwrap().len(), 1);
        assert_eq!(svc.visible_plants(Some(ADA)).await.unwrap().len(), 2);
        assert!(matches!(
            svc.plant_details(Some(BOB), private.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn comments_need_a_visible_plant() {
        let svc = service();
        let private = svc.add_plant(ada(), fern()).await.unwrap();

        assert!(matches!(
            svc.add_comment(bob(), private.id, "hi").await,
            Err(ServiceError::Forbidden(_))
        ));
        assert!(matches!(
            svc.add_comment(ada(), private.id, "   ").await,
            Err(ServiceError::Validation(_))
        ));
        let own = svc.add_comment(ada(), private.id, " note to self ").await.unwrap();
        assert_eq!(own.content, "note to self");
    }

    #[tokio::test]
    async fn comment_ceiling_is_global() {
        let store = Arc::new(MemoryStore::new());
        let retention = RetentionConfig { max_comments: 3, ..Default::default() };
        let svc = PlantService::new(Arc::clone(&store), retention);
        let a = svc.add_plant(ada(), PlantCareState { is_public: true, ..fern() }).await.unwrap();
        let b = svc.add_plant(bob(), PlantCareState { is_public: true, ..fern() }).await.unwrap();

        for n in 0..3 {
            svc.add_comment(bob(), a.id, &format!("a{n}")).await.unwrap();
            svc.add_comment(ada(), b.id, &format!("b{n}")).await.unwrap();
        }

        let all: Vec<Comment> = store.find(Query::all()).await.unwrap();
        let contents: Vec<&str> = all.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["b1", "a2", "b2"]);
    }

    #[tokio::test]
    async fn comment_removal_rules() {
        let svc = service();
        let plant = svc.add_plant(ada(), PlantCareState { is_public: true, ..fern() }).await.unwrap();
        let by_bob = svc.add_comment(bob(), plant.id, "from bob").await.unwrap();
        let by_ada = svc.add_comment(ada(), plant.id, "from ada").await.unwrap();

        let carol = "carol@example.com";
        assert!(matches!(
            svc.delete_comment(carol, by_bob.id).await,
            Err(ServiceError::Forbidden(_))
        ));
        // Bob may not remove the owner's comment, but the owner may remove theirs.
        assert!(svc.delete_comment(BOB, by_ada.id).await.is_err());
        svc.delete_comment(ADA, by_bob.id).await.unwrap();
        svc.delete_comment(ADA, by_ada.id).await.unwrap();
        assert!(svc.comments_for_plant(None, plant.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn owner_reading_comments_marks_them_viewed() {
        let svc = service();
        let plant = svc.add_plant(ada(), PlantCareState { is_public: true, ..fern() }).await.unwrap();
        svc.add_comment(bob(), plant.id, "lovely").await.unwrap();

        let seen_by_bob = svc.comments_for_plant(Some(BOB), plant.id).await.unwrap();
        assert!(!seen_by_bob[0].viewed);

        let seen_by_ada = svc.comments_for_plant(Some(ADA), plant.id).await.unwrap();
        assert!(seen_by_ada[0].viewed);

        let details = svc.plant_details(None, plant.id).await.unwrap();
        assert!(details.comments[0].viewed);
    }
}
