use tracing::debug;

use plantcare_core::{LegacyFormat, ParsedDate, PlantCareState};

/// One stored date rewritten from a legacy layout to `MM/DD/YYYY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateMigration {
    pub field: &'static str,
    pub format: LegacyFormat,
    pub from: String,
    pub to: String,
}

/// Rewrite every legacy-format date on `state` in canonical form.
///
/// The calendar date never changes, so notify dates stay as they are and no
/// audit entry is due.  Returns what was rewritten; empty when nothing was.
pub fn migrate_dates(state: &mut PlantCareState) -> Vec<DateMigration> {
    let fields: [(&'static str, &mut String); 6] = [
        ("lastWaterDate", &mut state.last_water_date),
        ("lastFertilizeDate", &mut state.last_fertilize_date),
        ("lastMoistDate", &mut state.last_moist_date),
        ("lastWaterNotifyDate", &mut state.last_water_notify_date),
        ("lastFertilizeNotifyDate", &mut state.last_fertilize_notify_date),
        ("lastMoistNotifyDate", &mut state.last_moist_notify_date),
    ];

    let mut migrations = Vec::new();
    for (field, value) in fields {
        let ParsedDate::Legacy { date, format } = ParsedDate::parse(value) else {
            continue;
        };
        let canonical = plantcare_core::format_canonical(date);
        debug!(field, from = %value, to = %canonical, layout = format.layout(), "migrating legacy date");
        let from = std::mem::replace(value, canonical.clone());
        migrations.push(DateMigration { field, format, from, to: canonical });
    }
    migrations
}
