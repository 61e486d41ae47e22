use chrono::Utc;
use log::{info, warn};
use mongodb::{
    bson::{doc, Document},
    Database,
};

use crate::{
    db::mongo::{collect, DESTINATIONS, REVIEWS},
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    models::{
        activity::{ActivityType, NewActivity},
        review::{Review, ReviewInput, ReviewQuery},
        timestamp,
    },
    services::{activity_service, destination_service},
};

pub fn validate(input: &ReviewInput) -> Result<(i64, i32, String, String), AppError> {
    let campsite_id = input
        .campsite_id
        .ok_or_else(|| AppError::validation("campsiteId is required"))?;
    let rating = input
        .rating
        .ok_or_else(|| AppError::validation("rating is required"))?;
    if !(1..=5).contains(&rating) {
        return Err(AppError::validation("Rating must be between 1 and 5"));
    }

    let title = input.title.as_deref().map(str::trim).unwrap_or_default();
    let content = input.content.as_deref().map(str::trim).unwrap_or_default();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    if content.is_empty() {
        return Err(AppError::validation("content is required"));
    }

    Ok((campsite_id, rating, title.to_string(), content.to_string()))
}

/// Mean rating rounded to one decimal place; zero without reviews.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let mean = ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub async fn create(
    db: &Database,
    input: ReviewInput,
    author: &AuthenticatedUser,
) -> Result<Review, AppError> {
    let (campsite_id, rating, title, content) = validate(&input)?;
    let destination = destination_service::find(db, campsite_id).await?;

    let now = Utc::now();
    let mut review = Review {
        id: None,
        user_id: author.user_id.clone(),
        username: author.username.clone(),
        campsite_id,
        campsite_name: destination.name.clone(),
        rating,
        title,
        content,
        created_at: now,
        updated_at: now,
        helpful: 0,
    };

    let reviews = db.collection::<Review>(REVIEWS);
    let result = reviews.insert_one(&review).await?;
    review.id = result.inserted_id.as_object_id();

    activity_service::record_quietly(
        db,
        NewActivity::new(
            review.user_id.clone(),
            review.username.clone(),
            ActivityType::Review,
            format!("Reviewed {}", review.campsite_name),
            format!("Rated {} {}/5: {}", review.campsite_name, review.rating, review.title),
        )
        .with_metadata(serde_json::json!({ "campsiteId": campsite_id, "rating": rating })),
    )
    .await;

    if let Err(err) = refresh_rating(db, campsite_id).await {
        warn!("Failed to refresh rating for destination {}: {}", campsite_id, err);
    }

    info!("{} reviewed destination {}", review.username, campsite_id);
    Ok(review)
}

async fn refresh_rating(db: &Database, campsite_id: i64) -> Result<(), AppError> {
    let cursor = db
        .collection::<Review>(REVIEWS)
        .find(doc! { "campsiteId": campsite_id })
        .await?;
    let ratings: Vec<i32> = collect(cursor).await?.iter().map(|r| r.rating).collect();

    db.collection::<Document>(DESTINATIONS)
        .update_one(
            doc! { "id": campsite_id },
            doc! { "$set": {
                "rating": average_rating(&ratings),
                "updatedAt": timestamp::format(&Utc::now()),
            } },
        )
        .await?;
    Ok(())
}

pub async fn list(db: &Database, query: ReviewQuery) -> Result<Vec<Review>, AppError> {
    let mut filter = Document::new();
    if let Some(campsite_id) = query.campsite_id {
        filter.insert("campsiteId", campsite_id);
    }
    if let Some(user_id) = query.user_id.filter(|u| !u.is_empty()) {
        filter.insert("userId", user_id);
    }

    let cursor = db
        .collection::<Review>(REVIEWS)
        .find(filter)
        .sort(doc! { "_id": -1 })
        .await?;
    collect(cursor).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(rating: Option<i32>, title: &str) -> ReviewInput {
        ReviewInput {
            campsite_id: Some(1),
            rating,
            title: Some(title.into()),
            content: Some("Quiet spot by the lake".into()),
        }
    }

    #[test]
    fn test_rating_range() {
        assert!(validate(&input(Some(5), "Great")).is_ok());
        assert!(validate(&input(Some(1), "Meh")).is_ok());
        assert!(matches!(validate(&input(Some(0), "Bad")), Err(AppError::Validation(_))));
        assert!(matches!(validate(&input(Some(6), "Wow")), Err(AppError::Validation(_))));
        assert!(matches!(validate(&input(None, "Hm")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_title_required() {
        assert!(matches!(
            validate(&input(Some(4), "   ")),
            Err(AppError::Validation(msg)) if msg == "title is required"
        ));
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), 0.0);
        assert_eq!(average_rating(&[5]), 5.0);
        assert_eq!(average_rating(&[4, 5, 5]), 4.7);
        assert_eq!(average_rating(&[1, 2]), 1.5);
    }
}
