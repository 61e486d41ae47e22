use std::{env, fmt::Display, io, str::FromStr};

use log::{info, warn};

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const DATABASE_NAME: &str = "travel";
const TOKEN_TTL_HOURS: i64 = 24;
const DEV_JWT_SECRET: &str = "development_secret";

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub environment: String,
}

impl Config {
    /// Reads the service configuration from the environment. `MONGODB_URI` is
    /// mandatory; `JWT_SECRET` is mandatory outside debug builds.
    pub fn load() -> io::Result<Self> {
        let mongodb_uri = required("MONGODB_URI")?;

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if cfg!(debug_assertions) => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
            _ => return Err(missing("JWT_SECRET")),
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| HOST.to_string()),
            port: try_load("PORT", PORT),
            mongodb_uri,
            database_name: env::var("DATABASE_NAME").unwrap_or_else(|_| DATABASE_NAME.to_string()),
            jwt_secret,
            token_ttl_hours: try_load("TOKEN_TTL_HOURS", TOKEN_TTL_HOURS),
            environment: env::var("RUST_ENV").unwrap_or_else(|_| "development".to_string()),
        })
    }
}

fn missing(key: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, format!("{key} must be set"))
}

fn required(key: &str) -> io::Result<String> {
    env::var(key).map_err(|_| missing(key))
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
