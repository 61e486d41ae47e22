use actix_web::{web, HttpResponse};
use mongodb::Database;
use serde_json::json;

use crate::{
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    models::activity::{ActivityInput, ActivityQuery, NewActivity},
    services::activity_service,
};

/*
    GET /api/activity?userId=&username=&limit=
    Without a filter the caller's own feed is returned.
*/
pub async fn get_activity(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    query: web::Query<ActivityQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let user_id = query.user_id.filter(|id| !id.trim().is_empty());
    let username = query.username.filter(|name| !name.trim().is_empty());

    if !caller.is_admin() {
        let foreign_id = user_id.as_deref().is_some_and(|id| id != caller.user_id);
        let foreign_name = username.as_deref().is_some_and(|name| !caller.can_act_for(name));
        if foreign_id || foreign_name {
            return Err(AppError::forbidden("You can only view your own activity"));
        }
    }

    let activities = match (user_id.as_deref(), username.as_deref()) {
        (None, None) => {
            activity_service::list_for_user(&db, Some(&caller.user_id), None, query.limit).await?
        }
        (user_id, username) => {
            activity_service::list_for_user(&db, user_id, username, query.limit).await?
        }
    };

    Ok(HttpResponse::Ok().json(activities))
}

/*
    POST /api/activity
*/
pub async fn record_activity(
    db: web::Data<Database>,
    caller: AuthenticatedUser,
    input: web::Json<ActivityInput>,
) -> Result<HttpResponse, AppError> {
    let input = input.into_inner();
    let title = input
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("title is required"))?;

    let mut entry = NewActivity::new(
        caller.user_id.clone(),
        caller.username.clone(),
        input.kind,
        title,
        input.description.unwrap_or_default(),
    );
    entry.icon = input.icon.filter(|icon| !icon.is_empty());
    entry.metadata = input.metadata;

    let activity = activity_service::record(&db, entry).await?;

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Activity recorded",
        "activity": activity,
    })))
}
