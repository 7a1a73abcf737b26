use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::plant::{Owner, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: RecordId,
    pub plant_id: RecordId,
    pub author: Owner,
    pub content: String,
    /// Set once the plant's owner has read the comment.
    pub viewed: bool,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(plant_id: RecordId, author: Owner, content: impl Into<String>) -> Self {
        Self {
            id: 0,
            plant_id,
            author,
            content: content.into(),
            viewed: false,
            created_at: Utc::now(),
        }
    }
}
