use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::Database;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::AppError,
    middleware::auth_context::AdminUser,
    models::destination::DestinationInput,
    services::{booking_service, destination_service},
};

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub from: Option<String>,
}

/*
    GET /api/destinations
*/
pub async fn get_destinations(db: web::Data<Database>) -> Result<HttpResponse, AppError> {
    let destinations = destination_service::list(&db).await?;
    Ok(HttpResponse::Ok().json(destinations))
}

/*
    GET /api/destinations/{id}
*/
pub async fn get_destination(
    db: web::Data<Database>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let destination = destination_service::get(&db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(destination))
}

/*
    GET /api/destinations/{id}/availability?from=YYYY-MM-DD
*/
pub async fn get_availability(
    db: web::Data<Database>,
    path: web::Path<i64>,
    query: web::Query<AvailabilityQuery>,
) -> Result<HttpResponse, AppError> {
    let from = match query.from.as_deref() {
        Some(raw) => booking_service::parse_date(raw, "from")?,
        None => Utc::now().date_naive(),
    };

    let id = path.into_inner();
    let booked = destination_service::booked_ranges(&db, id, from).await?;

    Ok(HttpResponse::Ok().json(json!({
        "destinationId": id,
        "bookedDates": booked,
    })))
}

/*
    POST /api/destinations
*/
pub async fn create_destination(
    db: web::Data<Database>,
    _admin: AdminUser,
    input: web::Json<DestinationInput>,
) -> Result<HttpResponse, AppError> {
    let destination = destination_service::create(&db, input.into_inner()).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Destination created",
        "destination": destination,
    })))
}

/*
    PUT /api/destinations/{id}
*/
pub async fn update_destination(
    db: web::Data<Database>,
    _admin: AdminUser,
    path: web::Path<i64>,
    input: web::Json<DestinationInput>,
) -> Result<HttpResponse, AppError> {
    let destination =
        destination_service::update(&db, path.into_inner(), input.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Destination updated",
        "destination": destination,
    })))
}

/*
    DELETE /api/destinations/{id}
*/
pub async fn delete_destination(
    db: web::Data<Database>,
    _admin: AdminUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    destination_service::delete(&db, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Destination deleted",
    })))
}
