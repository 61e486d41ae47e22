use chrono::Utc;
use mongodb::{bson::doc, bson::Document, Database};

use crate::{
    db::mongo::{collect, ACTIVITY},
    error::AppError,
    models::activity::{Activity, NewActivity},
};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// Appends one entry to the feed, stamped with the server time.
pub async fn record(db: &Database, entry: NewActivity) -> Result<Activity, AppError> {
    let mut activity = entry.into_activity(Utc::now());

    let result = db
        .collection::<Activity>(ACTIVITY)
        .insert_one(&activity)
        .await?;
    activity.id = result.inserted_id.as_object_id();

    Ok(activity)
}

/// Same as `record`, for side effects whose failure must not undo the
/// caller's main write.
pub async fn record_quietly(db: &Database, entry: NewActivity) {
    let kind = entry.kind;
    if let Err(err) = record(db, entry).await {
        log::warn!("Failed to record {:?} activity: {}", kind, err);
    }
}

/// A user's feed, newest first.
pub async fn list_for_user(
    db: &Database,
    user_id: Option<&str>,
    username: Option<&str>,
    limit: Option<i64>,
) -> Result<Vec<Activity>, AppError> {
    let filter = match (user_id, username) {
        (Some(user_id), _) => doc! { "userId": user_id },
        (None, Some(username)) => doc! { "username": username },
        (None, None) => return Err(AppError::validation("userId or username is required")),
    };

    list(db, filter, limit).await
}

/// The feed across every user, newest first.
pub async fn recent(db: &Database, limit: Option<i64>) -> Result<Vec<Activity>, AppError> {
    list(db, doc! {}, limit).await
}

async fn list(db: &Database, filter: Document, limit: Option<i64>) -> Result<Vec<Activity>, AppError> {
    let cursor = db
        .collection::<Activity>(ACTIVITY)
        .find(filter)
        .sort(doc! { "date": -1, "_id": -1 })
        .limit(clamp_limit(limit))
        .await?;

    collect(cursor).await
}
