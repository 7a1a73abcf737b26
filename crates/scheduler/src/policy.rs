use chrono::{DateTime, Days, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use plantcare_config::SchedulerConfig;
use plantcare_core::{
    DateParseError, ParsedDate, PlantCareState, REFERENCE_TZ, civil_date, format_canonical,
    start_of_day,
};

/// What a plant is due for right now.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CareNeeds {
    pub needs_water: bool,
    pub needs_fertilize: bool,
}

impl CareNeeds {
    pub fn any(self) -> bool {
        self.needs_water || self.needs_fertilize
    }
}

/// Scheduling constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarePolicy {
    pub timezone: Tz,
    /// Slack added to every interval so an owner who is on time is not nagged.
    pub grace_days: u32,
    /// Hours after a "soil is moist" report before watering is re-checked.
    pub moist_recheck_hours: u32,
}

impl Default for CarePolicy {
    fn default() -> Self {
        Self {
            timezone: REFERENCE_TZ,
            grace_days: 3,
            moist_recheck_hours: 24,
        }
    }
}

impl CarePolicy {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        let timezone: Tz = config.timezone.parse().unwrap_or_else(|_| {
            warn!(tz = %config.timezone, "unrecognised timezone, falling back to America/New_York");
            REFERENCE_TZ
        });
        Self {
            timezone,
            grace_days: config.grace_days,
            moist_recheck_hours: config.moist_recheck_hours,
        }
    }

    /// Instant from which a care event on `last` with `interval_days` is overdue.
    /// `None` only when the date arithmetic leaves chrono's range.
    pub fn next_care_time(&self, last: NaiveDate, interval_days: u32) -> Option<DateTime<Tz>> {
        let offset = u64::from(interval_days) + u64::from(self.grace_days);
        let due_day = last.checked_add_days(Days::new(offset))?;
        Some(start_of_day(due_day, self.timezone))
    }

    /// Whether care recorded on `last_care_date` is overdue at `now`.
    ///
    /// Legacy date formats are accepted as-is.  An empty or unreadable date is
    /// an error; callers treat it as "not due".  `interval_days == 0` is not
    /// special-cased.
    pub fn needs_care(
        &self,
        last_care_date: &str,
        interval_days: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, DateParseError> {
        let last = ParsedDate::parse(last_care_date).into_date()?;
        Ok(self
            .next_care_time(last, interval_days)
            .is_some_and(|due| due.with_timezone(&Utc) < now))
    }

    /// Decide which reminders `state` is due for.  Unreadable dates are
    /// logged and count as "not due".
    pub fn evaluate(&self, state: &PlantCareState, now: DateTime<Utc>) -> CareNeeds {
        if !state.do_notify {
            return CareNeeds::default();
        }

        let mut needs = CareNeeds::default();

        if state.last_moist_notify_date.is_empty() {
            needs.needs_water = self.moist_recheck_due(state, now);
        }

        if state.last_water_notify_date.is_empty() {
            needs.needs_water |= self.checked(
                state,
                "lastWaterDate",
                &state.last_water_date,
                state.watering_interval_days,
                now,
            );
        }

        if state.tracks_fertilizing() && state.last_fertilize_notify_date.is_empty() {
            needs.needs_fertilize = self.checked(
                state,
                "lastFertilizeDate",
                &state.last_fertilize_date,
                state.fertilizing_interval_days,
                now,
            );
        }

        debug!(
            plant = %state.name,
            needs_water = needs.needs_water,
            needs_fertilize = needs.needs_fertilize,
            "evaluated plant"
        );
        needs
    }

    /// Canonical date of `now` in the policy timezone, as written to notify
    /// fields.
    pub fn stamp(&self, now: DateTime<Utc>) -> String {
        format_canonical(civil_date(now, self.timezone))
    }

    fn moist_recheck_due(&self, state: &PlantCareState, now: DateTime<Utc>) -> bool {
        match ParsedDate::parse(&state.last_moist_date) {
            ParsedDate::Empty => false,
            ParsedDate::Unparseable(raw) => {
                warn!(plant = %state.name, field = "lastMoistDate", value = %raw, "unreadable stored date");
                false
            }
            parsed => parsed.date().is_some_and(|date| {
                let since = now - start_of_day(date, self.timezone).with_timezone(&Utc);
                since > Duration::hours(i64::from(self.moist_recheck_hours))
            }),
        }
    }

    fn checked(
        &self,
        state: &PlantCareState,
        field: &'static str,
        raw: &str,
        interval_days: u32,
        now: DateTime<Utc>,
    ) -> bool {
        self.needs_care(raw, interval_days, now).unwrap_or_else(|err| {
            warn!(plant = %state.name, field, error = %err, "stored date not usable, treating as not due");
            false
        })
    }
}
