//! Care-due scheduling.
//!
//! Everything here is a pure decision over stored dates: nothing mutates a
//! plant on disk or sends a reminder.  The reminder sweep in
//! `plantcare-runtime` composes these decisions with the store and mailer.
//!
//! Stored dates are civil dates in the policy timezone.  A care event on day
//! `D` with interval `N` becomes due once local midnight of
//! `D + N + grace_days` has strictly passed.

mod migrate;
mod policy;

pub use migrate::{DateMigration, migrate_dates};
pub use policy::{CareNeeds, CarePolicy};

use chrono::{DateTime, Utc};
use plantcare_core::{DateParseError, PlantCareState};

/// [`CarePolicy::needs_care`] under the default policy.
pub fn needs_care(
    last_care_date: &str,
    interval_days: u32,
    now: DateTime<Utc>,
) -> Result<bool, DateParseError> {
    CarePolicy::default().needs_care(last_care_date, interval_days, now)
}

/// [`CarePolicy::evaluate`] under the default policy.
pub fn evaluate_plant(state: &PlantCareState, now: DateTime<Utc>) -> CareNeeds {
    CarePolicy::default().evaluate(state, now)
}

/// [`CarePolicy::stamp`] under the default policy.
pub fn stamp(now: DateTime<Utc>) -> String {
    CarePolicy::default().stamp(now)
}
