use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::{object_id, timestamp};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(
        rename = "_id",
        skip_serializing_if = "Option::is_none",
        serialize_with = "object_id::serialize"
    )]
    pub id: Option<ObjectId>,
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    pub campsite_id: i64,
    pub campsite_name: String,
    pub rating: i32,
    pub title: String,
    pub content: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub helpful: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInput {
    pub campsite_id: Option<i64>,
    pub rating: Option<i32>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub campsite_id: Option<i64>,
    pub user_id: Option<String>,
}
