use log::{info, warn};
use mongodb::{
    bson::{doc, Document},
    options::{ClientOptions, IndexOptions, ReturnDocument, ServerApi, ServerApiVersion},
    Client, Database, IndexModel,
};
use serde::{de::DeserializeOwned, Deserialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;

pub const USERS: &str = "users";
pub const DESTINATIONS: &str = "destinations";
pub const BOOKINGS: &str = "bookings";
pub const ACTIVITY: &str = "activity";
pub const REVIEWS: &str = "reviews";
pub const COUNTERS: &str = "counters";

pub async fn create_mongo_client(uri: &str) -> Result<Arc<Client>, mongodb::error::Error> {
    info!("Connecting to MongoDB");

    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client = Client::with_options(client_options)?;

    match client
        .database("admin")
        .run_command(doc! {"ping": 1})
        .await
    {
        Ok(_) => info!("Successfully connected to MongoDB and verified with ping command"),
        Err(e) => {
            warn!("Connected to MongoDB but ping test failed: {}", e);
            warn!("The API may still work, but some functionality might be impaired");
        }
    }

    Ok(Arc::new(client))
}

/// Unique keys the services rely on. Index creation is idempotent.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let unique = |keys: Document| {
        IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build()
    };

    let users = db.collection::<Document>(USERS);
    users.create_index(unique(doc! { "username": 1 })).await?;
    users.create_index(unique(doc! { "email": 1 })).await?;
    users.create_index(unique(doc! { "id": 1 })).await?;

    db.collection::<Document>(DESTINATIONS)
        .create_index(unique(doc! { "id": 1 }))
        .await?;

    let bookings = db.collection::<Document>(BOOKINGS);
    bookings
        .create_index(unique(doc! { "bookingReference": 1 }))
        .await?;
    bookings
        .create_index(
            IndexModel::builder()
                .keys(doc! { "destinationId": 1, "status": 1, "startDate": 1 })
                .build(),
        )
        .await?;

    db.collection::<Document>(ACTIVITY)
        .create_index(IndexModel::builder().keys(doc! { "userId": 1, "date": -1 }).build())
        .await?;

    info!("Database indexes are in place");
    Ok(())
}

#[derive(Deserialize)]
struct Counter {
    seq: i64,
}

#[derive(Deserialize)]
struct NumericId {
    id: i64,
}

/// The next numeric id for `collection`: one more than both the largest id
/// already stored and every id handed out before. The increment is a single
/// atomic update on the `counters` document, so concurrent callers never
/// receive the same value.
pub async fn next_sequence(db: &Database, collection: &str) -> Result<i64, AppError> {
    let highest = db
        .collection::<NumericId>(collection)
        .find_one(doc! {})
        .projection(doc! { "id": 1, "_id": 0 })
        .sort(doc! { "id": -1 })
        .await?
        .map(|doc| doc.id);

    let counters = db.collection::<Counter>(COUNTERS);
    counters
        .update_one(
            doc! { "_id": collection },
            doc! { "$max": { "seq": highest.unwrap_or(0) } },
        )
        .upsert(true)
        .await?;

    let counter = counters
        .find_one_and_update(doc! { "_id": collection }, doc! { "$inc": { "seq": 1_i64 } })
        .upsert(true)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| AppError::Server(format!("Failed to allocate an id for {collection}")))?;

    Ok(counter.seq)
}

pub async fn collect<T>(cursor: mongodb::Cursor<T>) -> Result<Vec<T>, AppError>
where
    T: DeserializeOwned + Send + Sync,
{
    use futures::TryStreamExt;
    Ok(cursor.try_collect::<Vec<T>>().await?)
}
