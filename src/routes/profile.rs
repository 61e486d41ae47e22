use actix_web::{web, HttpResponse};
use mongodb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    services::profile_service::{self, ProfilePatch},
};

#[derive(Debug, Deserialize, Default)]
pub struct ProfileQuery {
    pub username: Option<String>,
}

/// Resolves whose profile a request is about and checks the caller may touch it.
fn target(caller: &AuthenticatedUser, requested: Option<&str>) -> Result<String, AppError> {
    let username = requested
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&caller.username);

    if !caller.can_act_for(username) {
        return Err(AppError::forbidden("You can only access your own profile"));
    }
    Ok(username.to_string())
}

/*
    GET /api/profile?username=
*/
pub async fn get_profile(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    query: web::Query<ProfileQuery>,
) -> Result<HttpResponse, AppError> {
    let username = target(&caller, query.username.as_deref())?;
    let view = profile_service::get_profile(&db, &username).await?;
    Ok(HttpResponse::Ok().json(view))
}

/*
    POST /api/profile
    Body: { "username": "..." }
*/
pub async fn ensure_profile(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    input: Option<web::Json<ProfileQuery>>,
) -> Result<HttpResponse, AppError> {
    let requested = input.map(|json| json.into_inner()).unwrap_or_default();
    let username = target(&caller, requested.username.as_deref())?;

    let (view, created) = profile_service::get_or_create_profile(&db, &username).await?;
    let (mut response, message) = if created {
        (HttpResponse::Created(), "Profile created")
    } else {
        (HttpResponse::Ok(), "Profile found")
    };

    Ok(response.json(json!({
        "success": true,
        "message": message,
        "created": created,
        "profile": view.profile,
        "stats": view.stats,
        "recentActivity": view.recent_activity,
    })))
}

/*
    PUT /api/profile?username=
*/
pub async fn update_profile(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    query: web::Query<ProfileQuery>,
    input: web::Json<ProfilePatch>,
) -> Result<HttpResponse, AppError> {
    let patch = input.into_inner();
    let requested = query.username.as_deref().or(patch.username.as_deref());
    let username = target(&caller, requested)?;

    let view = profile_service::update_profile(&db, &username, patch).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Profile updated successfully",
        "profile": view.profile,
        "stats": view.stats,
        "recentActivity": view.recent_activity,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;

    fn caller(username: &str, role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "abc".into(),
            email: format!("{username}@example.com"),
            username: username.into(),
            role,
        }
    }

    #[test]
    fn test_target_defaults_to_caller() {
        let alice = caller("alice", UserRole::User);
        assert_eq!(target(&alice, None).unwrap(), "alice");
        assert_eq!(target(&alice, Some("  ")).unwrap(), "alice");
        assert_eq!(target(&alice, Some("ALICE")).unwrap(), "ALICE");
    }

    #[test]
    fn test_target_rejects_other_users() {
        let alice = caller("alice", UserRole::User);
        assert!(matches!(target(&alice, Some("bob")), Err(AppError::Forbidden(_))));

        let admin = caller("admin", UserRole::Admin);
        assert_eq!(target(&admin, Some("bob")).unwrap(), "bob");
    }
}
