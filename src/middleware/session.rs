use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::{
    error::AppError,
    utils::SessionKeys,
};

pub const AUTH_COOKIE: &str = "auth_token";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentSession {
    pub username: String,
}

pub fn get_current_session(cookies: &Cookies, keys: &SessionKeys) -> Option<CurrentSession> {
    // Try to get JWT token from auth_token cookie
    let token = cookies.get(AUTH_COOKIE)?.value().to_string();

    match keys.verify_token(&token) {
        Ok(claims) => Some(CurrentSession {
            username: claims.sub,
        }),
        Err(err) => {
            log::debug!("rejecting session cookie: {err}");
            None
        }
    }
}

/// Guard for every page behind the login screen.
pub fn require_session(cookies: &Cookies, keys: &SessionKeys) -> Result<CurrentSession, AppError> {
    get_current_session(cookies, keys).ok_or(AppError::Unauthenticated)
}
