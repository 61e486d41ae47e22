use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::{object_id, timestamp};

pub const DEFAULT_BIO: &str = "Travel enthusiast exploring the great outdoors.";
pub const DEFAULT_AVATAR: &str = "/images/default-avatar.png";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "admin" => Some(UserRole::Admin),
            "user" => Some(UserRole::User),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub total_bookings: i64,
    pub total_nights: i64,
    pub total_destinations_visited: i64,
    pub favorite_destination: Option<String>,
    #[serde(with = "timestamp::option")]
    pub last_booking: Option<DateTime<Utc>>,
    pub total_spent: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationPreferences {
    pub email: bool,
    pub push: bool,
    pub sms: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            push: true,
            sms: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacyPreferences {
    pub profile_visibility: String,
    pub show_email: bool,
    pub show_activity: bool,
}

impl Default for PrivacyPreferences {
    fn default() -> Self {
        Self {
            profile_visibility: "public".to_string(),
            show_email: false,
            show_activity: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub theme: String,
    pub notifications: NotificationPreferences,
    pub privacy: PrivacyPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            notifications: NotificationPreferences::default(),
            privacy: PrivacyPreferences::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(
        rename = "_id",
        skip_serializing_if = "Option::is_none",
        serialize_with = "object_id::serialize"
    )]
    pub oid: Option<ObjectId>,
    pub id: i64,
    pub username: String,
    pub email: String,
    /// bcrypt hash. Absent for profiles created on demand, which cannot sign in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A fresh account with default bio, avatar and preferences and zeroed stats.
    pub fn with_defaults(id: i64, username: &str, email: &str, name: &str) -> Self {
        let now = Utc::now();
        Self {
            oid: None,
            id,
            username: username.to_string(),
            email: email.to_string(),
            password: None,
            name: name.to_string(),
            role: UserRole::User,
            bio: DEFAULT_BIO.to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
            stats: UserStats::default(),
            preferences: Preferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Hex form of the store id, used as `userId` on bookings, activity and reviews.
    pub fn user_id(&self) -> String {
        self.oid.map(|oid| oid.to_hex()).unwrap_or_default()
    }

    /// The same document without the password hash, safe to hand to clients.
    pub fn public(mut self) -> Self {
        self.password = None;
        self
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    pub id: String,
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSession {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id(),
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Admin-side user creation: registration fields plus an optional role.
#[derive(Debug, Deserialize)]
pub struct CreateUserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub bio: Option<String>,
    pub avatar: Option<String>,
}
