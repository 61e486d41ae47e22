use actix_web::{web, HttpResponse};
use mongodb::Database;
use serde_json::json;

use crate::{
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    models::bookings::{BookingInput, BookingQuery},
    services::booking_service,
};

/*
    GET /api/bookings?username=&destinationId=&status=
*/
pub async fn get_bookings(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    query: web::Query<BookingQuery>,
) -> Result<HttpResponse, AppError> {
    let bookings = booking_service::list_bookings(&db, query.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/*
    GET /api/bookings/{id}
*/
pub async fn get_booking(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking = booking_service::get_booking(&db, &path).await?;

    if !caller.is_admin() && caller.user_id != booking.user_id {
        return Err(AppError::forbidden("You can only view your own bookings"));
    }

    Ok(HttpResponse::Ok().json(booking))
}

/*
    POST /api/bookings
*/
pub async fn create_booking(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    input: web::Json<BookingInput>,
) -> Result<HttpResponse, AppError> {
    let booking = booking_service::create_booking(&db, input.into_inner(), &caller).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Booking created successfully",
        "booking": booking,
    })))
}

/*
    POST /api/bookings/{id}/cancel
    PUT  /api/bookings/{id}/cancel
*/
pub async fn cancel_booking(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking = booking_service::cancel_booking(&db, &path, &caller).await?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Booking cancelled successfully",
        "booking": booking,
    })))
}
