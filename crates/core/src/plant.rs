use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier, monotonically increasing per record kind.
pub type RecordId = u64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub email: String,
    pub username: String,
}

impl Owner {
    pub fn new(email: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
        }
    }
}

/// The part of a plant record that users edit and reminders are computed from.
///
/// Dates are kept as the text the client sent; see [`crate::ParsedDate`].
/// An empty notify date means no reminder went out since the tracked date
/// last changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlantCareState {
    pub name: String,
    pub tag: String,
    pub notes: String,
    pub is_public: bool,
    pub do_notify: bool,
    pub skipped_last_fertilize: bool,
    #[serde(rename = "wateringFrequency")]
    pub watering_interval_days: u32,
    /// `0` disables fertilizer tracking.
    #[serde(rename = "fertilizingFrequency")]
    pub fertilizing_interval_days: u32,
    pub last_water_date: String,
    pub last_fertilize_date: String,
    pub last_moist_date: String,
    pub last_water_notify_date: String,
    pub last_fertilize_notify_date: String,
    pub last_moist_notify_date: String,
}

impl PlantCareState {
    pub fn clear_notify_dates(&mut self) {
        self.last_water_notify_date.clear();
        self.last_fertilize_notify_date.clear();
        self.last_moist_notify_date.clear();
    }

    pub fn tracks_fertilizing(&self) -> bool {
        self.fertilizing_interval_days > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: RecordId,
    pub owner: Owner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub care: PlantCareState,
}

impl Plant {
    /// A plant not yet persisted; the store assigns `id` and `created_at`.
    pub fn new(owner: Owner, care: PlantCareState) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            owner,
            created_at: now,
            updated_at: now,
            care,
        }
    }

    pub fn is_owned_by(&self, email: &str) -> bool {
        !email.is_empty() && self.owner.email == email
    }

    /// Public plants are visible to everybody, private ones to their owner.
    pub fn is_visible_to(&self, viewer: Option<&str>) -> bool {
        self.care.is_public || viewer.map(|email| self.is_owned_by(email)).unwrap_or(false)
    }
}

impl fmt::Display for Plant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.care;
        write!(
            f,
            "plant #{} {:?} (owner={}, water every {}d last {:?}, fertilize every {}d last {:?}, \
             notified water={:?} fertilize={:?}, skipped_fertilize={}, public={}, notify={})",
            self.id,
            c.name,
            self.owner.username,
            c.watering_interval_days,
            c.last_water_date,
            c.fertilizing_interval_days,
            c.last_fertilize_date,
            c.last_water_notify_date,
            c.last_fertilize_notify_date,
            c.skipped_last_fertilize,
            c.is_public,
            c.do_notify,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plant(public: bool) -> Plant {
        Plant::new(
            Owner::new("ada@example.com", "ada"),
            PlantCareState {
                name: "Fern".to_string(),
                is_public: public,
                ..Default::default()
            },
        )
    }

    #[test]
    fn visibility_rules() {
        let private = plant(false);
        assert!(private.is_visible_to(Some("ada@example.com")));
        assert!(!private.is_visible_to(Some("bob@example.com")));
        assert!(!private.is_visible_to(None));
        assert!(plant(true).is_visible_to(None));
    }

    #[test]
    fn empty_email_never_owns() {
        let mut p = plant(false);
        p.owner.email.clear();
        assert!(!p.is_owned_by(""));
    }

    #[test]
    fn serialises_legacy_field_names() {
        let mut p = plant(true);
        p.care.watering_interval_days = 7;
        p.care.last_water_date = "03/01/2023".to_string();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["wateringFrequency"], 7);
        assert_eq!(json["lastWaterDate"], "03/01/2023");
        assert_eq!(json["isPublic"], true);
        assert_eq!(json["owner"]["username"], "ada");
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let care: PlantCareState = serde_json::from_str(r#"{"name":"Ivy"}"#).unwrap();
        assert_eq!(care.name, "Ivy");
        assert_eq!(care.watering_interval_days, 0);
        assert!(!care.tracks_fertilizing());
    }

    #[test]
    fn clear_notify_dates_resets_all_three() {
        let mut care = PlantCareState {
            last_water_notify_date: "03/01/2023".into(),
            last_fertilize_notify_date: "03/01/2023".into(),
            last_moist_notify_date: "03/01/2023".into(),
            ..Default::default()
        };
        care.clear_notify_dates();
        assert!(care.last_water_notify_date.is_empty());
        assert!(care.last_fertilize_notify_date.is_empty());
        assert!(care.last_moist_notify_date.is_empty());
    }
}
