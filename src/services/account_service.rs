use std::sync::OnceLock;

use chrono::Utc;
use log::info;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    Database,
};
use regex::Regex;

use crate::{
    db::mongo::{collect, next_sequence, USERS},
    error::{is_duplicate_key, AppError},
    models::{
        activity::{ActivityType, NewActivity},
        timestamp,
        user::{CreateUserInput, User, UserPatch, UserRole},
    },
    services::activity_service,
};

const MIN_PASSWORD_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?)*$",
        )
        .expect("email pattern is valid")
    })
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Case-insensitive exact match on a text field.
pub fn exact_ci(value: &str) -> Document {
    doc! { "$regex": format!("^{}$", regex::escape(value)), "$options": "i" }
}

fn required(value: Option<String>, field: &str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::validation(format!("{field} is required"))),
    }
}

/// Validated registration data.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub role: UserRole,
}

impl Registration {
    pub fn validate(input: CreateUserInput) -> Result<Self, AppError> {
        let name = required(input.name, "name")?;
        let email = required(input.email, "email")?.to_lowercase();
        let username = required(input.username, "username")?;
        let password = input
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::validation("password is required"))?;

        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email address"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(Self {
            name,
            email,
            username,
            password,
            role: input.role.unwrap_or_default(),
        })
    }
}

pub async fn find_by_username(db: &Database, username: &str) -> Result<Option<User>, AppError> {
    Ok(db
        .collection::<User>(USERS)
        .find_one(doc! { "username": exact_ci(username) })
        .await?)
}

async fn ensure_unique(
    db: &Database,
    username: Option<&str>,
    email: Option<&str>,
    except: Option<ObjectId>,
) -> Result<(), AppError> {
    let users = db.collection::<User>(USERS);
    let not_self = |mut filter: Document| {
        if let Some(oid) = except {
            filter.insert("_id", doc! { "$ne": oid });
        }
        filter
    };

    if let Some(username) = username {
        let filter = not_self(doc! { "username": exact_ci(username) });
        if users.find_one(filter).await?.is_some() {
            return Err(AppError::conflict("Username already exists"));
        }
    }
    if let Some(email) = email {
        let filter = not_self(doc! { "email": exact_ci(email) });
        if users.find_one(filter).await?.is_some() {
            return Err(AppError::conflict("Email already registered"));
        }
    }
    Ok(())
}

/// Inserts a new account with a bcrypt-hashed password.
pub async fn create_user(db: &Database, registration: Registration) -> Result<User, AppError> {
    ensure_unique(
        db,
        Some(&registration.username),
        Some(&registration.email),
        None,
    )
    .await?;

    let id = next_sequence(db, USERS).await?;
    let mut user = User::with_defaults(
        id,
        &registration.username,
        &registration.email,
        &registration.name,
    );
    user.role = registration.role;
    user.password = Some(bcrypt::hash(&registration.password, bcrypt::DEFAULT_COST)?);

    match db.collection::<User>(USERS).insert_one(&user).await {
        Ok(result) => {
            user.oid = result.inserted_id.as_object_id();
            info!("Created {} account {}", user.role.as_str(), user.username);
            Ok(user)
        }
        Err(err) if is_duplicate_key(&err) => {
            Err(AppError::conflict("Username or email already exists"))
        }
        Err(err) => Err(err.into()),
    }
}

/// Self-service sign-up: always a regular user.
pub async fn register(db: &Database, mut input: CreateUserInput) -> Result<User, AppError> {
    input.role = None;
    let registration = Registration::validate(input)?;
    create_user(db, registration).await
}

/// Verifies credentials. Unknown users and wrong passwords fail the same way.
pub async fn login(db: &Database, username: Option<String>, password: Option<String>) -> Result<User, AppError> {
    let username = required(username, "username")?;
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("password is required"))?;

    let filter = doc! {
        "$or": [
            { "username": exact_ci(&username) },
            { "email": exact_ci(&username) },
        ]
    };
    let invalid = || AppError::unauthorized("Invalid username or password");

    let user = db
        .collection::<User>(USERS)
        .find_one(filter)
        .await?
        .ok_or_else(invalid)?;

    let hash = user.password.as_deref().ok_or_else(invalid)?;
    if !bcrypt::verify(&password, hash)? {
        return Err(invalid());
    }

    activity_service::record_quietly(
        db,
        NewActivity::new(
            user.user_id(),
            user.username.clone(),
            ActivityType::Login,
            "Signed in",
            format!("{} signed in", user.username),
        ),
    )
    .await;

    info!("User {} signed in", user.username);
    Ok(user)
}

/// Numeric ids are tried first, then the store's own id.
pub fn id_filter(id: &str) -> Result<Document, AppError> {
    if let Ok(numeric) = id.trim().parse::<i64>() {
        return Ok(doc! { "id": numeric });
    }
    ObjectId::parse_str(id.trim())
        .map(|oid| doc! { "_id": oid })
        .map_err(|_| AppError::validation(format!("Invalid user id: {id}")))
}

pub async fn list_users(db: &Database) -> Result<Vec<User>, AppError> {
    let cursor = db
        .collection::<User>(USERS)
        .find(doc! {})
        .sort(doc! { "id": 1 })
        .await?;
    Ok(collect(cursor)
        .await?
        .into_iter()
        .map(User::public)
        .collect())
}

pub async fn get_user(db: &Database, id: &str) -> Result<User, AppError> {
    db.collection::<User>(USERS)
        .find_one(id_filter(id)?)
        .await?
        .map(User::public)
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn update_user(db: &Database, id: &str, patch: UserPatch) -> Result<User, AppError> {
    let filter = id_filter(id)?;
    let users = db.collection::<User>(USERS);
    let existing = users
        .find_one(filter.clone())
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    let mut set = Document::new();
    if let Some(email) = &patch.email {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email address"));
        }
        set.insert("email", email);
    }
    if let Some(username) = &patch.username {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::validation("username cannot be empty"));
        }
        set.insert("username", username);
    }

    ensure_unique(
        db,
        set.get_str("username").ok(),
        set.get_str("email").ok(),
        existing.oid,
    )
    .await?;

    if let Some(password) = patch.password.filter(|p| !p.is_empty()) {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        set.insert("password", bcrypt::hash(&password, bcrypt::DEFAULT_COST)?);
    }
    if let Some(name) = patch.name {
        set.insert("name", name.trim());
    }
    if let Some(role) = patch.role {
        set.insert("role", role.as_str());
    }
    if let Some(bio) = patch.bio {
        set.insert("bio", bio);
    }
    if let Some(avatar) = patch.avatar {
        set.insert("avatar", avatar);
    }
    set.insert("updatedAt", timestamp::format(&Utc::now()));

    match users.update_one(filter, doc! { "$set": set }).await {
        Ok(_) => {}
        Err(err) if is_duplicate_key(&err) => {
            return Err(AppError::conflict("Username or email already exists"))
        }
        Err(err) => return Err(err.into()),
    }

    get_user(db, &existing.user_id()).await
}

pub async fn delete_user(db: &Database, id: &str) -> Result<(), AppError> {
    let result = db
        .collection::<User>(USERS)
        .delete_one(id_filter(id)?)
        .await?;
    if result.deleted_count == 0 {
        return Err(AppError::not_found("User not found"));
    }

    info!("Deleted user {id}");
    Ok(())
}
