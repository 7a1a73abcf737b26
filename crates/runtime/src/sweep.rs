//! The reminder sweep: one pass over every plant, plus the periodic task that
//! runs it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use plantcare_core::Plant;
use plantcare_scheduler::{CareNeeds, CarePolicy, migrate_dates};
use plantcare_store::{PersistenceError, Query, Store};

use crate::clock::Clock;
use crate::mailer::{CareMailer, CareReminder};

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evaluated: usize,
    /// Reminders sent and stamped.
    pub reminded: usize,
    pub send_failures: usize,
    /// Plants whose legacy dates were rewritten.
    pub migrated: usize,
    /// Plants skipped because a per-plant write failed.
    pub write_failures: usize,
}

pub struct CareSweep<S> {
    store: Arc<S>,
    mailer: Arc<dyn CareMailer>,
    clock: Arc<dyn Clock>,
    policy: CarePolicy,
}

impl<S: Store> CareSweep<S> {
    pub fn new(
        store: Arc<S>,
        mailer: Arc<dyn CareMailer>,
        clock: Arc<dyn Clock>,
        policy: CarePolicy,
    ) -> Self {
        Self {
            store,
            mailer,
            clock,
            policy,
        }
    }

    /// Evaluate every plant once, oldest first, and remind owners of what is
    /// due.  Only listing the plants can fail the sweep as a whole; problems
    /// with one plant are logged and counted, and the sweep moves on.
    ///
    /// Each plant is re-read when its turn comes, so edits made while the
    /// sweep is running are evaluated rather than the listing snapshot.
    pub async fn run_once(&self) -> Result<SweepReport, PersistenceError> {
        let listed: Vec<Plant> = self.store.find(Query::all()).await?;
        let mut report = SweepReport::default();

        for plant_id in listed.iter().map(|p| p.id) {
            let mut plant = match self.store.get::<Plant>(plant_id).await {
                Ok(Some(plant)) => plant,
                Ok(None) => {
                    debug!(plant_id, "plant deleted during sweep");
                    continue;
                }
                Err(err) => {
                    warn!(plant_id, error = %err, "failed to reload plant");
                    report.write_failures += 1;
                    continue;
                }
            };
            report.evaluated += 1;

            if !migrate_dates(&mut plant.care).is_empty() {
                let written = self
                    .store
                    .modify::<Plant, _>(plant_id, |p| {
                        migrate_dates(&mut p.care);
                    })
                    .await;
                match written {
                    Ok(migrated) => {
                        plant = migrated;
                        report.migrated += 1;
                    }
                    Err(err) => {
                        warn!(plant_id, error = %err, "failed to write back migrated dates");
                        report.write_failures += 1;
                        continue;
                    }
                }
            }

            let needs = self.policy.evaluate(&plant.care, self.clock.now());
            if !needs.any() {
                continue;
            }

            let reminder = CareReminder::for_plant(&plant, needs);
            if let Err(err) = self.mailer.send(&reminder).await {
                warn!(plant_id, recipient = %reminder.recipient, error = %err, "care reminder not sent");
                report.send_failures += 1;
                continue;
            }

            match self.stamp(&plant, needs).await {
                Ok(()) => report.reminded += 1,
                Err(err) => {
                    warn!(plant_id, error = %err, "reminder sent but notify date not stamped");
                    report.write_failures += 1;
                }
            }
        }

        info!(
            evaluated = report.evaluated,
            reminded = report.reminded,
            send_failures = report.send_failures,
            migrated = report.migrated,
            write_failures = report.write_failures,
            "care sweep complete"
        );
        Ok(report)
    }

    /// Record that a reminder went out, in one atomic write so a concurrent
    /// edit to the same plant is not lost.  A need is only stamped while the
    /// date it was computed from is still the stored one; a newer care date
    /// starts a cycle this reminder does not cover.
    async fn stamp(&self, evaluated: &Plant, needs: CareNeeds) -> Result<(), PersistenceError> {
        let today = self.policy.stamp(self.clock.now());
        let seen = TrackedDates::of(evaluated);
        debug!(plant_id = evaluated.id, stamp = %today, ?needs, "stamping notify dates");

        let expected = seen.clone();
        let stored = self
            .store
            .modify::<Plant, _>(evaluated.id, move |p| {
                let now = TrackedDates::of(p);
                if needs.needs_fertilize && now.fertilize == expected.fertilize {
                    p.care.last_fertilize_notify_date = today.clone();
                }
                if needs.needs_water && now.water == expected.water {
                    p.care.last_water_notify_date = today.clone();
                    p.care.last_moist_notify_date = today;
                }
            })
            .await?;

        let now = TrackedDates::of(&stored);
        if (needs.needs_water && now.water != seen.water)
            || (needs.needs_fertilize && now.fertilize != seen.fertilize)
        {
            info!(plant_id = evaluated.id, "care dates changed during sweep, reminder left unstamped");
        }
        Ok(())
    }
}

/// The care dates a reminder decision is computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackedDates {
    /// Water and moist dates; either one moves the watering cycle.
    water: (String, String),
    fertilize: String,
}

impl TrackedDates {
    fn of(plant: &Plant) -> Self {
        Self {
            water: (
                plant.care.last_water_date.clone(),
                plant.care.last_moist_date.clone(),
            ),
            fertilize: plant.care.last_fertilize_date.clone(),
        }
    }
}

/// Run `sweep` every `interval` until `shutdown` flips to `true`.  The first
/// pass happens one interval after spawning.  Returns `None` without spawning
/// when `interval` is zero.
pub fn spawn_sweep_task<S>(
    sweep: Arc<CareSweep<S>>,
    interval: Duration,
    shutdown: &watch::Sender<bool>,
) -> Option<AbortHandle>
where
    S: Store + 'static,
{
    if interval.is_zero() {
        info!("care sweep disabled (interval is 0)");
        return None;
    }

    let mut rx = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        info!(interval_secs = interval.as_secs(), "care sweep task started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(err) = sweep.run_once().await {
                        warn!(error = %err, "care sweep failed");
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("care sweep task stopped");
    });
    Some(handle.abort_handle())
}
