//! Loads sample data into an empty database.
//!
//! Goes through the regular services so ids, password hashes and user
//! stats come out exactly as if the data had been entered through the API.
//! Collections that already hold documents are left alone.

use chrono::{Duration, Utc};
use env_logger::Env;
use log::info;
use mongodb::{bson::Document, Database};

use campsite_api::{
    config::Config,
    db::mongo::{create_mongo_client, ensure_indexes, BOOKINGS, DESTINATIONS, USERS},
    error::AppError,
    middleware::auth_context::AuthenticatedUser,
    models::{
        bookings::BookingInput,
        destination::{DestinationInput, ListInput},
        user::{CreateUserInput, User, UserRole},
    },
    services::{account_service, booking_service, destination_service},
};

struct SampleDestination {
    name: &'static str,
    location: &'static str,
    price: &'static str,
    image: &'static str,
    description: &'static str,
    amenities: &'static str,
    features: &'static str,
}

const DESTINATIONS_DATA: [SampleDestination; 4] = [
    SampleDestination {
        name: "Pine Hollow",
        location: "Mount Hood, Oregon",
        price: "$45/night",
        image: "/images/pine-hollow.jpg",
        description: "Shaded tent sites under old-growth pines, a short walk from the lake.",
        amenities: "Fire pit, Picnic table, Potable water, Vault toilets",
        features: "Lake access, Hiking trails, Pet friendly",
    },
    SampleDestination {
        name: "Red Rock Canyon",
        location: "Sedona, Arizona",
        price: "$60/night",
        image: "/images/red-rock.jpg",
        description: "Open desert sites with views of the red sandstone formations.",
        amenities: "Fire pit, Showers, Electric hookups",
        features: "Stargazing, Rock climbing",
    },
    SampleDestination {
        name: "Lakeside Meadows",
        location: "Lake Tahoe, California",
        price: "$75/night",
        image: "/images/lakeside.jpg",
        description: "Grassy meadow sites right on the shore with kayak rentals nearby.",
        amenities: "Showers, Camp store, Potable water, Flush toilets",
        features: "Swimming, Kayaking, Fishing",
    },
    SampleDestination {
        name: "Aspen Ridge",
        location: "Aspen, Colorado",
        price: "$55/night",
        image: "/images/aspen-ridge.jpg",
        description: "High-altitude sites among aspen groves, cool even in July.",
        amenities: "Fire pit, Bear lockers",
        features: "Mountain biking, Wildflower hikes",
    },
];

async fn is_empty(db: &Database, collection: &str) -> Result<bool, AppError> {
    let count = db
        .collection::<Document>(collection)
        .estimated_document_count()
        .await?;
    if count > 0 {
        info!("Skipping {collection}: {count} documents present");
    }
    Ok(count == 0)
}

async fn seed_destinations(db: &Database) -> Result<(), AppError> {
    if !is_empty(db, DESTINATIONS).await? {
        return Ok(());
    }

    for sample in &DESTINATIONS_DATA {
        let destination = destination_service::create(
            db,
            DestinationInput {
                name: Some(sample.name.into()),
                location: Some(sample.location.into()),
                price: Some(sample.price.into()),
                image: Some(sample.image.into()),
                description: Some(sample.description.into()),
                amenities: Some(ListInput::Text(sample.amenities.into())),
                features: Some(ListInput::Text(sample.features.into())),
                rating: None,
            },
        )
        .await?;
        info!("Seeded destination {} ({})", destination.id, destination.name);
    }
    Ok(())
}

async fn seed_user(
    db: &Database,
    name: &str,
    username: &str,
    password: &str,
    role: UserRole,
) -> Result<User, AppError> {
    let registration = account_service::Registration::validate(CreateUserInput {
        name: Some(name.into()),
        email: Some(format!("{username}@example.com")),
        username: Some(username.into()),
        password: Some(password.into()),
        role: Some(role),
    })?;
    account_service::create_user(db, registration).await
}

async fn seed_users(db: &Database) -> Result<Option<User>, AppError> {
    if !is_empty(db, USERS).await? {
        return Ok(None);
    }

    seed_user(db, "Administrator", "admin", "admin123", UserRole::Admin).await?;
    let camper = seed_user(db, "Casey Camper", "camper", "camper123", UserRole::User).await?;
    info!("Seeded users admin and {}", camper.username);

    Ok(Some(camper))
}

async fn seed_bookings(db: &Database, camper: &User) -> Result<(), AppError> {
    if !is_empty(db, BOOKINGS).await? {
        return Ok(());
    }

    let caller = AuthenticatedUser {
        user_id: camper.user_id(),
        email: camper.email.clone(),
        username: camper.username.clone(),
        role: camper.role,
    };
    let today = Utc::now().date_naive();

    for (destination_id, offset, nights, guests) in [(1i64, 14i64, 2i64, 2i64), (3, 45, 3, 4)] {
        let destination = destination_service::find(db, destination_id).await?;
        let start = today + Duration::days(offset);
        let input = BookingInput {
            username: Some(camper.username.clone()),
            destination_id: Some(destination_id),
            destination_name: Some(destination.name.clone()),
            start_date: Some(start.to_string()),
            end_date: Some((start + Duration::days(nights)).to_string()),
            number_of_people: Some(guests),
            total_price: Some(60.0 * nights as f64),
            ..Default::default()
        };

        let booking = booking_service::create_booking(db, input, &caller).await?;
        info!("Seeded booking {} at {}", booking.booking_reference, booking.destination_name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }

    let config = Config::load()?;
    let client = create_mongo_client(&config.mongodb_uri)
        .await
        .map_err(std::io::Error::other)?;
    let db = client.database(&config.database_name);

    let result = async {
        ensure_indexes(&db).await?;
        seed_destinations(&db).await?;
        if let Some(camper) = seed_users(&db).await? {
            seed_bookings(&db, &camper).await?;
        }
        Ok::<_, AppError>(())
    }
    .await;

    result.map_err(|e| std::io::Error::other(e.to_string()))?;
    info!("Seeding complete");
    Ok(())
}
