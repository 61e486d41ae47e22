use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::{object_id, timestamp};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Booking,
    Cancellation,
    Review,
    Login,
    ProfileUpdate,
    CampsiteVisit,
}

impl ActivityType {
    pub fn default_icon(&self) -> &'static str {
        match self {
            ActivityType::Booking => "calendar",
            ActivityType::Cancellation => "x-circle",
            ActivityType::Review => "star",
            ActivityType::Login => "log-in",
            ActivityType::ProfileUpdate => "user",
            ActivityType::CampsiteVisit => "map-pin",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(
        rename = "_id",
        skip_serializing_if = "Option::is_none",
        serialize_with = "object_id::serialize"
    )]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub username: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: String,
    pub description: String,
    #[serde(with = "timestamp")]
    pub date: DateTime<Utc>,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Everything the caller decides about an entry; ids and timestamps are
/// filled in when it is recorded.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub user_id: String,
    pub username: String,
    pub kind: ActivityType,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        kind: ActivityType,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            kind,
            title: title.into(),
            description: description.into(),
            icon: None,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn into_activity(self, now: DateTime<Utc>) -> Activity {
        Activity {
            id: None,
            icon: self.icon.unwrap_or_else(|| self.kind.default_icon().to_string()),
            user_id: self.user_id,
            username: self.username,
            kind: self.kind,
            title: self.title,
            description: self.description,
            date: now,
            metadata: self.metadata,
            created_at: now,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityInput {
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub title: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQuery {
    pub user_id: Option<String>,
    pub username: Option<String>,
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_uses_snake_case_on_the_wire() {
        let activity = NewActivity::new("u1", "alice", ActivityType::ProfileUpdate, "Profile", "Updated")
            .into_activity(Utc::now());

        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["type"], "profile_update");
        assert_eq!(json["icon"], "user");
        assert_eq!(json["date"], json["createdAt"]);
        assert!(json.get("_id").is_none());
    }
}
