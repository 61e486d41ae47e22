use actix_web::{web, HttpResponse};
use mongodb::Database;
use serde_json::json;

use crate::{
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    models::review::{ReviewInput, ReviewQuery},
    services::review_service,
};

/*
    GET /api/reviews?campsiteId=&userId=
*/
pub async fn get_reviews(
    db: web::Data<Database>,
    query: web::Query<ReviewQuery>,
) -> Result<HttpResponse, AppError> {
    let reviews = review_service::list(&db, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(reviews))
}

/*
    POST /api/reviews
*/
pub async fn create_review(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    input: web::Json<ReviewInput>,
) -> Result<HttpResponse, AppError> {
    let review = review_service::create(&db, input.into_inner(), &caller).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Review submitted",
        "review": review,
    })))
}
