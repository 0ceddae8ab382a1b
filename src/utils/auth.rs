use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{Duration, Utc};

use crate::config::AdminPassword;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    pub sid: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(username: String, lifetime: Duration) -> Self {
        let now = Utc::now();
        let exp = now + lifetime;

        Self {
            sub: username,
            sid: Uuid::new_v4(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Issues and validates session tokens with a process-wide HS256 secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl SessionKeys {
    pub fn new(secret: &str, lifetime_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(lifetime_hours),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn create_token(&self, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims::new(username.to_string(), self.lifetime);
        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(token_data.claims)
    }
}

/// Decides whether a submitted username/password pair may log in.
pub trait CredentialCheck: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// The single shared login of the application.
pub struct SharedCredential {
    username: String,
    password_hash: String,
}

impl SharedCredential {
    pub fn new(username: String, password_hash: String) -> Self {
        Self { username, password_hash }
    }

    pub fn from_config(username: &str, password: &AdminPassword) -> Result<Self, bcrypt::BcryptError> {
        let password_hash = match password {
            AdminPassword::Hash(hash) => hash.clone(),
            AdminPassword::Plain(plain) => hash_password(plain)?,
        };
        Ok(Self::new(username.to_string(), password_hash))
    }
}

impl CredentialCheck for SharedCredential {
    fn verify(&self, username: &str, password: &str) -> bool {
        // Always run bcrypt so a wrong username costs as much as a wrong password
        let password_ok = verify_password(password, &self.password_hash).unwrap_or(false);
        let username_ok = constant_time_eq(username.as_bytes(), self.username.as_bytes());
        password_ok & username_ok
    }
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
