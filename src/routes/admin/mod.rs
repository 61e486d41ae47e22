use actix_web::{web, HttpResponse};
use mongodb::{bson::doc, bson::Document, Database};
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::auth::AuthMiddleware;
use crate::middleware::role_auth::RequireRole;
use crate::models::bookings::BookingStatus;
use crate::models::user::UserRole;
use crate::routes::account::users;
use crate::services::{activity_service, admin_service, booking_service};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<BookingStatus>,
}

/*
    GET /api/admin/stats
*/
pub async fn get_stats(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let stats = admin_service::dashboard(&db).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/*
    GET /api/admin/activity?limit=
*/
pub async fn get_activity(
    db: web::Data<Database>,
    query: web::Query<LimitQuery>,
) -> Result<HttpResponse, AppError> {
    let activities = activity_service::recent(&db, query.limit).await?;
    Ok(HttpResponse::Ok().json(activities))
}

/*
    GET /api/admin/bookings?status=
*/
pub async fn get_bookings(
    db: web::Data<Database>,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = match query.status {
        Some(status) => doc! { "status": status.as_str() },
        None => Document::new(),
    };
    let bookings = booking_service::all(&db, filter).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/// Everything behind the admin gate. `RequireRole` is registered first so
/// that `AuthMiddleware` wraps it and the claims exist when it runs.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(RequireRole::new(UserRole::Admin))
            .wrap(AuthMiddleware)
            .route("/stats", web::get().to(get_stats))
            .route("/activity", web::get().to(get_activity))
            .route("/bookings", web::get().to(get_bookings)),
    )
    .service(
        web::scope("/users")
            .wrap(RequireRole::new(UserRole::Admin))
            .wrap(AuthMiddleware)
            .route("", web::get().to(users::get_users))
            .route("", web::post().to(users::create_user))
            .route("", web::put().to(users::update_user))
            .route("", web::delete().to(users::delete_user)),
    );
}
