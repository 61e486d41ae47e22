#![allow(dead_code)]

use actix_cors::Cors;
use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::StatusCode,
    middleware::Logger,
    test, web, App,
};
use mongodb::{Client, Database};
use serde_json::Value;

use campsite_api::{
    config::Config,
    db::mongo::ensure_indexes,
    middleware::auth::generate_token,
    models::user::{User, UserRole},
    routes,
};

pub const TEST_DATABASE: &str = "campsite_api_test";

pub struct TestApp {
    pub db: Database,
    pub config: Config,
}

pub fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        mongodb_uri: mongo_uri(),
        database_name: TEST_DATABASE.to_string(),
        jwt_secret: "integration_test_secret".to_string(),
        token_ttl_hours: 1,
        environment: "test".to_string(),
    }
}

fn mongo_uri() -> String {
    std::env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

impl TestApp {
    /// The driver connects lazily, so routes that never reach the store
    /// can be exercised without a running MongoDB.
    pub async fn new() -> Self {
        let config = test_config();
        let client = Client::with_uri_str(&config.mongodb_uri)
            .await
            .expect("Failed to parse MongoDB URI");
        let db = client.database(&config.database_name);

        Self { db, config }
    }

    /// Starts from an empty database. Needs a reachable MongoDB.
    pub async fn fresh() -> Self {
        let app = Self::new().await;
        app.db.drop().await.expect("Failed to drop test database");
        ensure_indexes(&app.db).await.expect("Failed to create indexes");
        app
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(self.db.clone()))
            .app_data(web::Data::new(self.config.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    }

    /// `Authorization` header value for a signed token.
    pub fn bearer(&self, user: &User) -> String {
        format!(
            "Bearer {}",
            generate_token(user, &self.config).expect("Failed to sign token")
        )
    }

    /// Token for a user that only exists in the token itself.
    pub fn bearer_for(&self, username: &str, role: UserRole) -> String {
        let mut user = User::with_defaults(
            1,
            username,
            &format!("{username}@example.com"),
            username,
        );
        user.oid = Some(mongodb::bson::oid::ObjectId::new());
        user.role = role;
        self.bearer(&user)
    }
}

/// Sends a request and returns the status with the JSON body (`Null` for
/// non-JSON bodies). Errors raised by middleware are rendered the same way
/// the server would render them.
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match test::try_call_service(app, req).await {
        Ok(resp) => {
            let status = resp.status();
            let body = test::read_body(resp).await;
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
        Err(err) => {
            let resp = err.error_response();
            let status = resp.status();
            let body = actix_web::body::to_bytes(resp.into_body())
                .await
                .unwrap_or_default();
            (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
        }
    }
}
