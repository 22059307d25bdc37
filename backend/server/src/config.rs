use std::{env, fmt::Display, fs::read_to_string, ops::RangeInclusive, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Secret {0} is not configured")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// `None` keeps every record in process memory.
    pub redis_url: Option<String>,
    pub token_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub seed_admins: bool,
    pub default_admin_password: String,
    pub super_admin: Option<SuperAdminSeed>,
}

#[derive(Debug, Clone)]
pub struct SuperAdminSeed {
    pub username: String,
    pub password: String,
}

/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let bcrypt_cost = within("BCRYPT_COST", try_load("BCRYPT_COST", "10")?, 4..=31)?;
        let token_ttl_hours = within(
            "TOKEN_TTL_HOURS",
            try_load("TOKEN_TTL_HOURS", "24")?,
            1..=MAX_TOKEN_TTL_HOURS,
        )?;

        let super_admin = match (var("SUPER_ADMIN_USERNAME"), optional_secret("SUPER_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(SuperAdminSeed { username, password }),
            _ => None,
        };

        Ok(Self {
            port: try_load("RUST_PORT", "5000")?,
            redis_url: var("REDIS_URL"),
            token_secret: read_secret("TOKEN_SECRET")?,
            token_ttl_hours,
            bcrypt_cost,
            seed_admins: try_load("SEED_ADMINS", "true")?,
            default_admin_password: var("DEFAULT_ADMIN_PASSWORD")
                .unwrap_or_else(|| "admin123".to_string()),
            super_admin,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            redis_url: None,
            token_secret: "development-only-secret".to_string(),
            token_ttl_hours: 24,
            bcrypt_cost: 10,
            seed_admins: false,
            default_admin_password: "admin123".to_string(),
            super_admin: None,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}

fn within<T>(key: &'static str, value: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        return Ok(value);
    }

    warn!("Invalid {key} value: {value}");
    Err(ConfigError::Invalid {
        key,
        reason: format!("{value} is outside {}..={}", range.start(), range.end()),
    })
}

/// Reads `/run/secrets/<name>`, falling back to the environment variable of
/// the same name.
fn optional_secret(secret_name: &'static str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) => Some(secret.trim().to_string()),
        Err(e) => {
            info!("Failed to read {secret_name} from file ({e}), trying environment");
            var(secret_name)
        }
    }
}

fn read_secret(secret_name: &'static str) -> Result<String, ConfigError> {
    optional_secret(secret_name).ok_or(ConfigError::MissingSecret(secret_name))
}
