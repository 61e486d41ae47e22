use actix_web::web;

use crate::error::AppError;

pub mod account;
pub mod activity;
pub mod admin;
pub mod bookings;
pub mod destination;
pub mod health;
pub mod profile;
pub mod reviews;

/// Registers every route. Mixed public/protected resources authenticate
/// through the `AuthenticatedUser`/`AdminUser` extractors; scopes that are
/// protected as a whole are wrapped in `AuthMiddleware`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::validation(format!("Invalid request body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::validation(format!("Invalid query string: {err}")).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::validation(format!("Invalid path: {err}")).into()
    }))
    .route("/health", web::get().to(health::liveness))
    .service(
        web::scope("/api")
            .route("/health", web::get().to(health::health_check))
            // Public routes
            .route("/register", web::post().to(account::auth::register))
            .route("/login", web::post().to(account::auth::login))
            .route("/auth/session", web::get().to(account::auth::user_session))
            .service(
                web::scope("/destinations")
                    .route("", web::get().to(destination::get_destinations))
                    .route("", web::post().to(destination::create_destination))
                    .route("/{id}", web::get().to(destination::get_destination))
                    .route("/{id}", web::put().to(destination::update_destination))
                    .route("/{id}", web::delete().to(destination::delete_destination))
                    .route(
                        "/{id}/availability",
                        web::get().to(destination::get_availability),
                    ),
            )
            .route("/reviews", web::get().to(reviews::get_reviews))
            .route("/reviews", web::post().to(reviews::create_review))
            // Protected routes
            .service(
                web::scope("/bookings")
                    .wrap(crate::middleware::auth::AuthMiddleware)
                    .route("", web::get().to(bookings::get_bookings))
                    .route("", web::post().to(bookings::create_booking))
                    .route("/{id}", web::get().to(bookings::get_booking))
                    .route("/{id}/cancel", web::post().to(bookings::cancel_booking))
                    .route("/{id}/cancel", web::put().to(bookings::cancel_booking)),
            )
            .service(
                web::scope("/activity")
                    .wrap(crate::middleware::auth::AuthMiddleware)
                    .route("", web::get().to(activity::get_activity))
                    .route("", web::post().to(activity::record_activity)),
            )
            .service(
                web::scope("/profile")
                    .wrap(crate::middleware::auth::AuthMiddleware)
                    .route("", web::get().to(profile::get_profile))
                    .route("", web::put().to(profile::update_profile))
                    .route("", web::post().to(profile::ensure_profile)),
            )
            .configure(admin::config),
    );
}
