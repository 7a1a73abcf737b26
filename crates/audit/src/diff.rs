use std::fmt;

use plantcare_core::PlantCareState;

/// One human-readable change line, tagged with the field it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub field: &'static str,
    pub text: String,
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<LogMessage> for String {
    fn from(message: LogMessage) -> Self {
        message.text
    }
}

/// A compared field: how to read it and how to describe a change to it.
/// `render` also sees the incoming state for templates that depend on it.
struct FieldRule {
    field: &'static str,
    extract: fn(&PlantCareState) -> String,
    render: fn(&str, &str, &PlantCareState) -> String,
}

/// Comparison order is the order entries appear in a plant's log.
const RULES: &[FieldRule] = &[
    FieldRule {
        field: "isPublic",
        extract: |s| s.is_public.to_string(),
        render: |old, new, _| format!("Plant changed from public={old} to public={new}"),
    },
    FieldRule {
        field: "name",
        extract: |s| s.name.clone(),
        render: |old, new, _| format!("Name changed from {old} to {new}"),
    },
    FieldRule {
        field: "lastMoistDate",
        extract: |s| s.last_moist_date.clone(),
        render: |old, new, _| format!("Last soil moist date changed from {old} to {new}"),
    },
    FieldRule {
        field: "lastWaterDate",
        extract: |s| s.last_water_date.clone(),
        render: |old, new, _| format!("Last water date changed from {old} to {new}"),
    },
    FieldRule {
        field: "lastFertilizeDate",
        extract: |s| s.last_fertilize_date.clone(),
        render: |old, new, next| {
            if next.skipped_last_fertilize {
                format!("Fertilizing skipped, last fertilize date changed from {old} to {new}")
            } else {
                format!("Last fertilize date changed from {old} to {new}")
            }
        },
    },
    FieldRule {
        field: "wateringFrequency",
        extract: |s| s.watering_interval_days.to_string(),
        render: |old, new, _| format!("Watering frequency changed from {old} to {new} days"),
    },
    FieldRule {
        field: "tag",
        extract: |s| s.tag.clone(),
        render: |old, new, _| format!("Tag changed from {old} to {new}"),
    },
    FieldRule {
        field: "fertilizingFrequency",
        extract: |s| s.fertilizing_interval_days.to_string(),
        render: |old, new, _| format!("Fertilizing frequency changed from {old} to {new} days"),
    },
    FieldRule {
        field: "notes",
        extract: |s| s.notes.clone(),
        render: |old, new, _| format!("Notes changed from {old} to {new}"),
    },
];

/// One message per differing field, in log order.  `diff(s, s)` is empty.
pub fn diff(old: &PlantCareState, new: &PlantCareState) -> Vec<LogMessage> {
    RULES
        .iter()
        .filter_map(|rule| {
            let before = (rule.extract)(old);
            let after = (rule.extract)(new);
            (before != after).then(|| LogMessage {
                field: rule.field,
                text: (rule.render)(&before, &after, new),
            })
        })
        .collect()
}
