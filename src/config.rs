use std::env;

use anyhow::{bail, Context, Result};

const DEFAULT_PORT: &str = "5000";
const DEFAULT_SESSION_HOURS: i64 = 12;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Process configuration, read once at startup from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: String,
    pub jwt_secret: String,
    pub admin_username: String,
    pub admin_password: AdminPassword,
    pub session_hours: i64,
    pub max_connections: u32,
}

/// The shared credential's password, either pre-hashed or given in the clear for development.
#[derive(Clone)]
pub enum AdminPassword {
    Hash(String),
    Plain(String),
}

impl std::fmt::Debug for AdminPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminPassword::Hash(_) => f.write_str("Hash(..)"),
            AdminPassword::Plain(_) => f.write_str("Plain(..)"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET must be set")?;
        if jwt_secret.len() < 16 {
            bail!("JWT_SECRET must be at least 16 characters");
        }

        let admin_password = match (lookup("ADMIN_PASSWORD_HASH"), lookup("ADMIN_PASSWORD")) {
            (Some(hash), _) if !hash.is_empty() => AdminPassword::Hash(hash),
            (_, Some(plain)) if !plain.is_empty() => AdminPassword::Plain(plain),
            _ => bail!("ADMIN_PASSWORD_HASH or ADMIN_PASSWORD must be set"),
        };

        let session_hours = match lookup("SESSION_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .context("SESSION_HOURS must be a positive integer")?,
            None => DEFAULT_SESSION_HOURS,
        };

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            port: lookup("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string()),
            jwt_secret,
            admin_username: lookup("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password,
            session_hours,
            max_connections,
        })
    }
}
