use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plant::RecordId;

/// One human-readable line in a plant's audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlantLogEntry {
    pub id: RecordId,
    pub plant_id: RecordId,
    #[serde(rename = "log")]
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl PlantLogEntry {
    pub fn new(plant_id: RecordId, message: impl Into<String>) -> Self {
        Self {
            id: 0,
            plant_id,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}
