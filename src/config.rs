use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub stripe_timeout: Duration,
    /// Maximum accepted age of a webhook signature timestamp, in seconds
    pub webhook_tolerance_secs: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let stripe_secret_key =
            env::var("STRIPE_SECRET_KEY").map_err(|_| ConfigError::Missing("STRIPE_SECRET_KEY"))?;

        // WEBHOOK_SECRET is the older name, still accepted
        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET")
            .or_else(|_| env::var("WEBHOOK_SECRET"))
            .map_err(|_| ConfigError::Missing("STRIPE_WEBHOOK_SECRET"))?;

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 4242)?,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "transactions.db".to_string()),
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
            stripe_timeout: Duration::from_secs(parse_var("STRIPE_TIMEOUT_SECS", 30)?),
            webhook_tolerance_secs: parse_var("WEBHOOK_TOLERANCE_SECS", 300)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
