//! Booking creation and cancellation.
//!
//! Creating a booking is several writes: the booking itself, an activity
//! entry and the traveller's stored stats. The store offers no multi-document
//! transaction here, so the booking is compensated (deleted again) when the
//! activity entry cannot be written. Stats are derived data; a failure to
//! store them is logged and repaired by the next recomputation.

use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info, warn};
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    Database,
};
use rand::{distributions::Alphanumeric, Rng};

use crate::{
    db::mongo::{collect, BOOKINGS},
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    models::{
        activity::{ActivityType, NewActivity},
        bookings::{Booking, BookingInput, BookingQuery, BookingStatus, PaymentStatus},
        destination::Destination,
        timestamp,
        user::{User, UserRole},
    },
    services::{account_service, activity_service, destination_service, stats_service},
};

pub const MIN_GUESTS: i64 = 1;
pub const MAX_GUESTS: i64 = 10;
const REFERENCE_SUFFIX_LEN: usize = 5;
const DEFAULT_PAYMENT_METHOD: &str = "card";

/// A booking request that passed the input checks.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub username: String,
    pub destination_id: i64,
    pub destination_name: String,
    pub destination_image: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guests: i32,
    pub total_price: f64,
    pub special_requests: String,
    pub payment_method: String,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only the date.
pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| AppError::validation(format!("{field} must be a date (YYYY-MM-DD)")))
}

pub fn validate(input: BookingInput, today: NaiveDate) -> Result<ValidatedBooking, AppError> {
    let missing = |field: &str| AppError::validation(format!("Missing required field: {field}"));
    let text = |value: Option<String>, field: &str| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| missing(field))
    };

    let username = text(input.username, "username")?;
    let destination_id = input.destination_id.ok_or_else(|| missing("destinationId"))?;
    let destination_name = text(input.destination_name, "destinationName")?;
    let start_raw = text(input.start_date, "startDate")?;
    let end_raw = text(input.end_date, "endDate")?;
    let guests = input.number_of_people.ok_or_else(|| missing("numberOfPeople"))?;
    let total_price = input.total_price.ok_or_else(|| missing("totalPrice"))?;

    let start_date = parse_date(&start_raw, "startDate")?;
    let end_date = parse_date(&end_raw, "endDate")?;

    if start_date < today {
        return Err(AppError::validation("Start date cannot be in the past"));
    }
    if end_date <= start_date {
        return Err(AppError::validation("End date must be after start date"));
    }
    if !(MIN_GUESTS..=MAX_GUESTS).contains(&guests) {
        return Err(AppError::validation(format!(
            "Number of guests must be between {MIN_GUESTS} and {MAX_GUESTS}"
        )));
    }
    if !total_price.is_finite() || total_price <= 0.0 {
        return Err(AppError::validation("Total price must be greater than zero"));
    }

    Ok(ValidatedBooking {
        username,
        destination_id,
        destination_name,
        destination_image: input.destination_image.filter(|i| !i.trim().is_empty()),
        start_date,
        end_date,
        guests: guests as i32,
        total_price,
        special_requests: input.special_requests.unwrap_or_default(),
        payment_method: input
            .payment_method
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
    })
}

/// Half-open interval test on `[start, end)` stays.
pub fn overlaps(a_start: NaiveDate, a_end: NaiveDate, b_start: NaiveDate, b_end: NaiveDate) -> bool {
    a_start < b_end && a_end > b_start
}

/// Store query for bookings that hold any night of `[start, end)`.
pub fn conflict_filter(destination_id: i64, start: NaiveDate, end: NaiveDate) -> Document {
    let statuses: Vec<&str> = BookingStatus::BLOCKING.iter().map(|s| s.as_str()).collect();
    doc! {
        "destinationId": destination_id,
        "status": { "$in": statuses },
        "startDate": { "$lt": end.to_string() },
        "endDate": { "$gt": start.to_string() },
    }
}

pub fn nights_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// `BK` + unix millis + five random uppercase alphanumerics.
pub fn generate_booking_reference(now: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERENCE_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();

    format!("BK{}{}", now.timestamp_millis(), suffix)
}

/// A booking can be cancelled while it is live and has not started yet.
pub fn ensure_cancellable(booking: &Booking, today: NaiveDate) -> Result<(), AppError> {
    if booking.status.is_terminal() {
        return Err(AppError::invalid_state(format!(
            "Booking is already {}",
            booking.status.as_str()
        )));
    }
    if booking.start_date <= today {
        return Err(AppError::invalid_state(
            "Cannot cancel a booking that has already started",
        ));
    }
    Ok(())
}

fn booking_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": oid },
        Err(_) => doc! { "bookingReference": id },
    }
}

/// The stored form of a validated request. Name and image come from the
/// catalog entry; the request's own image is kept only when one was sent.
fn new_booking(
    request: ValidatedBooking,
    user: &User,
    destination: &Destination,
    now: DateTime<Utc>,
) -> Booking {
    Booking {
        id: None,
        user_id: user.user_id(),
        username: user.username.clone(),
        destination_id: destination.id,
        destination_name: destination.name.clone(),
        destination_image: request
            .destination_image
            .unwrap_or_else(|| destination.image.clone()),
        start_date: request.start_date,
        end_date: request.end_date,
        nights: nights_between(request.start_date, request.end_date),
        guests: request.guests,
        status: BookingStatus::Confirmed,
        total_price: request.total_price,
        special_requests: request.special_requests,
        payment_method: request.payment_method,
        payment_status: PaymentStatus::Pending,
        booking_reference: generate_booking_reference(now),
        created_at: now,
        updated_at: now,
    }
}

pub async fn create_booking(
    db: &Database,
    input: BookingInput,
    caller: &AuthenticatedUser,
) -> Result<Booking, AppError> {
    let now = Utc::now();
    let request = validate(input, now.date_naive())?;

    let user = account_service::find_by_username(db, &request.username)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", request.username)))?;
    let destination = destination_service::find(db, request.destination_id).await?;

    if user.role == UserRole::Admin {
        return Err(AppError::forbidden("Administrators cannot make bookings"));
    }
    if !caller.username.eq_ignore_ascii_case(&user.username) {
        return Err(AppError::forbidden("You can only book for your own account"));
    }

    let bookings = db.collection::<Booking>(BOOKINGS);
    let clash = bookings
        .find_one(conflict_filter(
            request.destination_id,
            request.start_date,
            request.end_date,
        ))
        .await?;
    if let Some(existing) = clash {
        info!(
            "Booking for destination {} on {}..{} conflicts with {}",
            request.destination_id, request.start_date, request.end_date, existing.booking_reference
        );
        return Err(AppError::conflict(
            "The destination is already booked for the selected dates",
        ));
    }

    let mut booking = new_booking(request, &user, &destination, now);

    let inserted = bookings.insert_one(&booking).await?;
    booking.id = inserted.inserted_id.as_object_id();

    let entry = NewActivity::new(
        booking.user_id.clone(),
        booking.username.clone(),
        ActivityType::Booking,
        format!("Booked {}", booking.destination_name),
        format!(
            "{} night(s) from {} to {} for {} guest(s)",
            booking.nights, booking.start_date, booking.end_date, booking.guests
        ),
    )
    .with_metadata(serde_json::json!({
        "bookingReference": booking.booking_reference,
        "destinationId": booking.destination_id,
        "totalPrice": booking.total_price,
    }));

    if let Err(err) = activity_service::record(db, entry).await {
        error!(
            "Activity write failed for booking {}, rolling the booking back: {}",
            booking.booking_reference, err
        );
        if let Err(undo) = bookings.delete_one(doc! { "_id": booking.id }).await {
            error!(
                "Compensation failed, booking {} remains: {}",
                booking.booking_reference, undo
            );
        }
        return Err(AppError::Server("Failed to create booking".to_string()));
    }

    if let Err(err) = stats_service::refresh_user_stats(db, &booking.user_id).await {
        warn!("Failed to refresh stats for {}: {}", booking.username, err);
    }

    info!(
        "Created booking {} for {} at destination {}",
        booking.booking_reference, booking.username, booking.destination_id
    );
    Ok(booking)
}

pub async fn get_booking(db: &Database, id: &str) -> Result<Booking, AppError> {
    db.collection::<Booking>(BOOKINGS)
        .find_one(booking_filter(id))
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found"))
}

pub async fn cancel_booking(
    db: &Database,
    id: &str,
    caller: &AuthenticatedUser,
) -> Result<Booking, AppError> {
    let booking = get_booking(db, id).await?;

    if !caller.is_admin() && caller.user_id != booking.user_id {
        return Err(AppError::forbidden("You can only cancel your own bookings"));
    }

    let now = Utc::now();
    ensure_cancellable(&booking, now.date_naive())?;

    // The status guard keeps two concurrent cancellations from both succeeding.
    let statuses: Vec<&str> = BookingStatus::BLOCKING.iter().map(|s| s.as_str()).collect();
    let result = db
        .collection::<Booking>(BOOKINGS)
        .update_one(
            doc! { "_id": booking.id, "status": { "$in": statuses } },
            doc! { "$set": {
                "status": BookingStatus::Cancelled.as_str(),
                "updatedAt": timestamp::format(&now),
            } },
        )
        .await?;
    if result.modified_count == 0 {
        return Err(AppError::invalid_state("Booking is already cancelled"));
    }

    activity_service::record_quietly(
        db,
        NewActivity::new(
            booking.user_id.clone(),
            booking.username.clone(),
            ActivityType::Cancellation,
            format!("Cancelled {}", booking.destination_name),
            format!(
                "Cancelled booking {} ({} to {})",
                booking.booking_reference, booking.start_date, booking.end_date
            ),
        )
        .with_metadata(serde_json::json!({
            "bookingReference": booking.booking_reference,
            "destinationId": booking.destination_id,
        })),
    )
    .await;

    if let Err(err) = stats_service::refresh_user_stats(db, &booking.user_id).await {
        warn!("Failed to refresh stats for {}: {}", booking.username, err);
    }

    info!("Cancelled booking {}", booking.booking_reference);
    get_booking(db, id).await
}

/// Store filter for a booking listing. Non-admin callers are pinned to their
/// own bookings; empty query values count as absent.
fn list_filter(query: BookingQuery, caller: &AuthenticatedUser) -> Result<Document, AppError> {
    let mut filter = Document::new();
    let username = query.username.filter(|u| !u.trim().is_empty());

    if caller.is_admin() {
        if let Some(username) = username {
            filter.insert("username", account_service::exact_ci(&username));
        }
    } else {
        if let Some(username) = username {
            if !caller.username.eq_ignore_ascii_case(username.trim()) {
                return Err(AppError::forbidden("You can only view your own bookings"));
            }
        }
        filter.insert("userId", caller.user_id.clone());
    }
    if let Some(destination_id) = query.destination_id {
        filter.insert("destinationId", destination_id);
    }
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }

    Ok(filter)
}

/// Lists bookings newest first. Non-admin callers only ever see their own.
pub async fn list_bookings(
    db: &Database,
    query: BookingQuery,
    caller: &AuthenticatedUser,
) -> Result<Vec<Booking>, AppError> {
    all(db, list_filter(query, caller)?).await
}

pub async fn all(db: &Database, filter: Document) -> Result<Vec<Booking>, AppError> {
    let cursor = db
        .collection::<Booking>(BOOKINGS)
        .find(filter)
        .sort(doc! { "_id": -1 })
        .await?;
    collect(cursor).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn scenario_c() -> BookingInput {
        BookingInput {
            username: Some("alice".into()),
            destination_id: Some(1),
            destination_name: Some("X".into()),
            start_date: Some("2025-01-10".into()),
            end_date: Some("2025-01-12".into()),
            number_of_people: Some(2),
            total_price: Some(205.0),
            ..Default::default()
        }
    }

    fn stored(start: &str, end: &str, status: BookingStatus) -> Booking {
        let now = Utc::now();
        Booking {
            id: None,
            user_id: "u1".into(),
            username: "alice".into(),
            destination_id: 1,
            destination_name: "X".into(),
            destination_image: String::new(),
            start_date: date(start),
            end_date: date(end),
            nights: nights_between(date(start), date(end)),
            guests: 2,
            status,
            total_price: 205.0,
            special_requests: String::new(),
            payment_method: "card".into(),
            payment_status: PaymentStatus::Pending,
            booking_reference: generate_booking_reference(now),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_valid_request() {
        let booking = validate(scenario_c(), date("2025-01-01")).unwrap();
        assert_eq!(booking.guests, 2);
        assert_eq!(booking.payment_method, "card");
        assert_eq!(nights_between(booking.start_date, booking.end_date), 2);
    }

    #[test]
    fn test_missing_fields_are_named() {
        for field in [
            "username",
            "destinationId",
            "destinationName",
            "startDate",
            "endDate",
            "numberOfPeople",
            "totalPrice",
        ] {
            let mut input = scenario_c();
            match field {
                "username" => input.username = None,
                "destinationId" => input.destination_id = None,
                "destinationName" => input.destination_name = Some(" ".into()),
                "startDate" => input.start_date = None,
                "endDate" => input.end_date = None,
                "numberOfPeople" => input.number_of_people = None,
                _ => input.total_price = None,
            }
            let err = validate(input, date("2025-01-01")).unwrap_err();
            assert!(
                matches!(&err, AppError::Validation(msg) if msg.ends_with(field)),
                "{field}: {err}"
            );
        }
    }

    #[test]
    fn test_date_rules() {
        let today = date("2025-01-11");
        assert!(matches!(validate(scenario_c(), today), Err(AppError::Validation(_))));

        let mut same_day = scenario_c();
        same_day.end_date = Some("2025-01-10".into());
        assert!(matches!(
            validate(same_day, date("2025-01-01")),
            Err(AppError::Validation(msg)) if msg == "End date must be after start date"
        ));

        let mut timestamped = scenario_c();
        timestamped.start_date = Some("2025-01-10T00:00:00.000Z".into());
        assert_eq!(
            validate(timestamped, date("2025-01-01")).unwrap().start_date,
            date("2025-01-10")
        );

        let mut garbage = scenario_c();
        garbage.end_date = Some("next tuesday".into());
        assert!(matches!(validate(garbage, date("2025-01-01")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_guest_bounds() {
        let mut eleven = scenario_c();
        eleven.number_of_people = Some(11);
        assert!(matches!(validate(eleven, date("2025-01-01")), Err(AppError::Validation(_))));

        let mut none = scenario_c();
        none.number_of_people = Some(0);
        assert!(matches!(validate(none, date("2025-01-01")), Err(AppError::Validation(_))));

        let mut ten = scenario_c();
        ten.number_of_people = Some(10);
        assert!(validate(ten, date("2025-01-01")).is_ok());
    }

    #[test]
    fn test_price_must_be_positive() {
        let mut free = scenario_c();
        free.total_price = Some(0.0);
        assert!(matches!(validate(free, date("2025-01-01")), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_overlap_is_half_open() {
        let (a, b) = (date("2025-01-10"), date("2025-01-12"));
        assert!(overlaps(a, b, date("2025-01-11"), date("2025-01-13")));
        assert!(overlaps(a, b, date("2025-01-09"), date("2025-01-11")));
        assert!(overlaps(a, b, date("2025-01-01"), date("2025-01-31")));
        // Checking out the day another guest checks in is fine.
        assert!(!overlaps(a, b, date("2025-01-12"), date("2025-01-14")));
        assert!(!overlaps(a, b, date("2025-01-08"), date("2025-01-10")));
    }

    #[test]
    fn test_conflict_filter_shape() {
        let filter = conflict_filter(1, date("2025-01-11"), date("2025-01-13"));
        assert_eq!(filter.get_i64("destinationId").unwrap(), 1);
        let start = filter.get_document("startDate").unwrap();
        assert_eq!(start.get_str("$lt").unwrap(), "2025-01-13");
        let end = filter.get_document("endDate").unwrap();
        assert_eq!(end.get_str("$gt").unwrap(), "2025-01-11");
        let statuses = filter.get_document("status").unwrap().get_array("$in").unwrap();
        assert_eq!(statuses.len(), 2);
    }

    #[test]
    fn test_reference_format() {
        let pattern = Regex::new(r"^BK\d+[A-Z0-9]{5}$").unwrap();
        let now = Utc::now();
        let reference = generate_booking_reference(now);
        assert!(pattern.is_match(&reference), "{reference}");
        assert!(reference.starts_with(&format!("BK{}", now.timestamp_millis())));
    }

    #[test]
    fn test_cancel_rules() {
        let booking = stored("2025-01-10", "2025-01-12", BookingStatus::Confirmed);
        assert!(ensure_cancellable(&booking, date("2025-01-09")).is_ok());
        assert!(matches!(
            ensure_cancellable(&booking, date("2025-01-10")),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            ensure_cancellable(&booking, date("2025-01-11")),
            Err(AppError::InvalidState(_))
        ));

        for status in [BookingStatus::Cancelled, BookingStatus::Completed] {
            let done = stored("2025-01-10", "2025-01-12", status);
            assert!(matches!(
                ensure_cancellable(&done, date("2025-01-01")),
                Err(AppError::InvalidState(_))
            ));
        }
    }

    #[test]
    fn test_booking_lookup_by_reference_or_id() {
        let oid = ObjectId::new();
        assert_eq!(booking_filter(&oid.to_hex()), doc! { "_id": oid });
        assert_eq!(
            booking_filter("BK1700000000000ABCDE"),
            doc! { "bookingReference": "BK1700000000000ABCDE" }
        );
    }

    fn caller(username: &str, role: UserRole) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "65a000000000000000000001".into(),
            email: format!("{username}@example.com"),
            username: username.into(),
            role,
        }
    }

    #[test]
    fn test_empty_username_query_lists_own_bookings() {
        let alice = caller("alice", UserRole::User);
        let query = BookingQuery {
            username: Some("".into()),
            ..Default::default()
        };

        let filter = list_filter(query, &alice).unwrap();
        assert_eq!(filter.get_str("userId").unwrap(), "65a000000000000000000001");
        assert!(filter.get("username").is_none());
    }

    #[test]
    fn test_other_username_is_forbidden_for_users() {
        let alice = caller("alice", UserRole::User);
        let query = BookingQuery {
            username: Some("bob".into()),
            ..Default::default()
        };
        assert!(matches!(list_filter(query, &alice), Err(AppError::Forbidden(_))));

        let own = BookingQuery {
            username: Some("ALICE".into()),
            status: Some(BookingStatus::Confirmed),
            ..Default::default()
        };
        let filter = list_filter(own, &alice).unwrap();
        assert_eq!(filter.get_str("status").unwrap(), "confirmed");
    }

    #[test]
    fn test_admin_filters_by_username() {
        let admin = caller("admin", UserRole::Admin);
        let query = BookingQuery {
            username: Some("bob".into()),
            ..Default::default()
        };

        let filter = list_filter(query, &admin).unwrap();
        assert!(filter.get("userId").is_none());
        assert!(filter.get_document("username").is_ok());
    }

    #[test]
    fn test_stored_booking_takes_catalog_name() {
        let mut input = scenario_c();
        input.destination_name = Some("Somewhere Else".into());
        let request = validate(input, date("2025-01-01")).unwrap();

        let user = User::with_defaults(2, "alice", "alice@x.com", "Alice");
        let destination = crate::services::destination_service::build(
            crate::models::destination::DestinationInput {
                name: Some("Pine Hollow".into()),
                location: Some("Oregon".into()),
                price: Some("$45/night".into()),
                image: Some("/images/pine.jpg".into()),
                description: Some("Shady".into()),
                ..Default::default()
            },
            1,
        )
        .unwrap();

        let booking = new_booking(request, &user, &destination, Utc::now());
        assert_eq!(booking.destination_name, "Pine Hollow");
        assert_eq!(booking.destination_image, "/images/pine.jpg");
        assert_eq!(booking.nights, 2);
        assert_eq!(booking.status, BookingStatus::Confirmed);
    }
}
