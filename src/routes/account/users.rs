use actix_web::{web, HttpResponse};
use mongodb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    models::user::{CreateUserInput, UserPatch},
    services::account_service::{self, Registration},
};

#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub id: Option<String>,
}

fn required_id(query: &UserIdQuery) -> Result<&str, AppError> {
    query
        .id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::validation("id query parameter is required"))
}

/*
    GET /api/users        every user
    GET /api/users?id=    one user
*/
pub async fn get_users(
    db: web::Data<Database>,
    query: web::Query<UserIdQuery>,
) -> Result<HttpResponse, AppError> {
    match query.id.as_deref().filter(|id| !id.trim().is_empty()) {
        Some(id) => Ok(HttpResponse::Ok().json(account_service::get_user(&db, id).await?)),
        None => Ok(HttpResponse::Ok().json(account_service::list_users(&db).await?)),
    }
}

/*
    POST /api/users
*/
pub async fn create_user(
    db: web::Data<Database>,
    input: web::Json<CreateUserInput>,
) -> Result<HttpResponse, AppError> {
    let registration = Registration::validate(input.into_inner())?;
    let user = account_service::create_user(&db, registration).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "User created",
        "user": user.public(),
    })))
}

/*
    PUT /api/users?id=
*/
pub async fn update_user(
    db: web::Data<Database>,
    query: web::Query<UserIdQuery>,
    input: web::Json<UserPatch>,
) -> Result<HttpResponse, AppError> {
    let id = required_id(&query)?;
    let user = account_service::update_user(&db, id, input.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User updated",
        "user": user,
    })))
}

/*
    DELETE /api/users?id=
*/
pub async fn delete_user(
    db: web::Data<Database>,
    query: web::Query<UserIdQuery>,
) -> Result<HttpResponse, AppError> {
    let id = required_id(&query)?;
    account_service::delete_user(&db, id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted",
    })))
}
