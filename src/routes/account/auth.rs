use actix_web::{web, HttpResponse};
use mongodb::Database;
use serde::Serialize;

use crate::{
    config::Config,
    error::AppError,
    middleware::{auth::generate_token, auth_context::AuthenticatedUser},
    models::user::{CreateUserInput, LoginInput, RegisterInput, User, UserSession},
    services::account_service,
};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    success: bool,
    message: String,
    token: String,
    user: UserSession,
}

fn signed_in(user: &User, config: &Config, message: &str) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        success: true,
        message: message.to_string(),
        token: generate_token(user, config)?,
        user: UserSession::from(user),
    })
}

/*
    POST /api/register
*/
pub async fn register(
    db: web::Data<Database>,
    config: web::Data<Config>,
    input: web::Json<RegisterInput>,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();
    let user = account_service::register(
        &db,
        CreateUserInput {
            name: input.name,
            email: input.email,
            username: input.username,
            password: input.password,
            role: None,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(signed_in(&user, &config, "Registration successful")?))
}

/*
    POST /api/login
*/
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<Config>,
    input: web::Json<LoginInput>,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();
    let user = account_service::login(&db, input.username, input.password).await?;

    Ok(HttpResponse::Ok().json(signed_in(&user, &config, "Login successful")?))
}

/*
    GET /api/auth/session
*/
pub async fn user_session(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = account_service::get_user(&db, &caller.user_id).await?;
    Ok(HttpResponse::Ok().json(UserSession::from(&user)))
}
