use chrono::Utc;
use log::info;
use mongodb::{
    bson::{doc, to_bson, Document},
    Database,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::mongo::{next_sequence, USERS},
    error::{is_duplicate_key, AppError},
    models::{
        activity::{Activity, ActivityType, NewActivity},
        timestamp,
        user::{Preferences, User, UserStats},
    },
    services::{
        account_service::{self, exact_ci, is_valid_email},
        activity_service, stats_service,
    },
};

const RECENT_ACTIVITY: i64 = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub profile: User,
    pub stats: UserStats,
    pub recent_activity: Vec<Activity>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
    pub preferences: Option<Preferences>,
}

/// Stand-in feed entry for users who have not done anything yet.
pub fn joined_entry(user: &User) -> Activity {
    let mut entry = NewActivity::new(
        user.user_id(),
        user.username.clone(),
        ActivityType::ProfileUpdate,
        "Joined the platform",
        format!("{} created an account", user.username),
    )
    .into_activity(user.created_at);
    entry.icon = "user-plus".to_string();
    entry
}

async fn view(db: &Database, user: User) -> Result<ProfileView, AppError> {
    let user_id = user.user_id();
    let stats = stats_service::current_stats(db, &user_id).await?;

    let mut recent_activity =
        activity_service::list_for_user(db, Some(&user_id), None, Some(RECENT_ACTIVITY)).await?;
    if recent_activity.is_empty() {
        recent_activity.push(joined_entry(&user));
    }

    Ok(ProfileView {
        profile: user.public(),
        stats,
        recent_activity,
    })
}

/// Read-only lookup; stats are always derived from the stored bookings.
pub async fn get_profile(db: &Database, username: &str) -> Result<ProfileView, AppError> {
    let user = account_service::find_by_username(db, username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Profile {username} not found")))?;

    view(db, user).await
}

/// Returns the profile for `username`, creating a default one first when
/// none exists. The created account has no password and cannot sign in
/// until one is set. The flag tells the caller whether a write happened.
pub async fn get_or_create_profile(db: &Database, username: &str) -> Result<(ProfileView, bool), AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::validation("username is required"));
    }

    if let Some(user) = account_service::find_by_username(db, username).await? {
        return Ok((view(db, user).await?, false));
    }

    let id = next_sequence(db, USERS).await?;
    let email = format!("{}@placeholder.invalid", username.to_lowercase());
    let mut user = User::with_defaults(id, username, &email, username);

    match db.collection::<User>(USERS).insert_one(&user).await {
        Ok(result) => user.oid = result.inserted_id.as_object_id(),
        // Lost a race with another request creating the same profile.
        Err(err) if is_duplicate_key(&err) => return Ok((get_profile(db, username).await?, false)),
        Err(err) => return Err(err.into()),
    }

    info!("Created default profile for {}", username);
    Ok((view(db, user).await?, true))
}

fn patch_document(patch: ProfilePatch) -> Result<Document, AppError> {
    let mut set = Document::new();

    if let Some(name) = patch.name {
        set.insert("name", name.trim());
    }
    if let Some(email) = patch.email {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email address"));
        }
        set.insert("email", email);
    }
    if let Some(bio) = patch.bio {
        set.insert("bio", bio);
    }
    if let Some(avatar) = patch.avatar {
        set.insert("avatar", avatar);
    }
    if let Some(preferences) = patch.preferences {
        set.insert("preferences", to_bson(&preferences)?);
    }
    set.insert("updatedAt", timestamp::format(&Utc::now()));

    Ok(set)
}

pub async fn update_profile(db: &Database, username: &str, patch: ProfilePatch) -> Result<ProfileView, AppError> {
    let set = patch_document(patch)?;
    let users = db.collection::<User>(USERS);

    let result = match users
        .update_one(doc! { "username": exact_ci(username) }, doc! { "$set": set })
        .await
    {
        Ok(result) => result,
        Err(err) if is_duplicate_key(&err) => {
            return Err(AppError::conflict("Email already registered"))
        }
        Err(err) => return Err(err.into()),
    };
    if result.matched_count == 0 {
        return Err(AppError::not_found(format!("Profile {username} not found")));
    }

    let user = account_service::find_by_username(db, username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Profile {username} not found")))?;

    activity_service::record_quietly(
        db,
        NewActivity::new(
            user.user_id(),
            user.username.clone(),
            ActivityType::ProfileUpdate,
            "Updated profile",
            format!("{} updated their profile", user.username),
        ),
    )
    .await;

    view(db, user).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_entry_is_dated_at_signup() {
        let user = User::with_defaults(3, "carol", "carol@x.com", "Carol");
        let entry = joined_entry(&user);
        assert_eq!(entry.title, "Joined the platform");
        assert_eq!(entry.date, user.created_at);
        assert!(entry.id.is_none());
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let set = patch_document(ProfilePatch {
            bio: Some("Hiker".into()),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(set.get_str("bio").unwrap(), "Hiker");
        assert!(set.get("name").is_none());
        assert!(set.get("preferences").is_none());
        assert!(set.contains_key("updatedAt"));
    }

    #[test]
    fn test_patch_rejects_bad_email() {
        let err = patch_document(ProfilePatch {
            email: Some("nope".into()),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
