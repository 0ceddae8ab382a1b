use axum::{
    extract::{Form, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::AppResult,
    middleware::{get_current_session, session::AUTH_COOKIE},
    state::AppState,
    utils::{flash, Flash, FlashLevel},
};

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    flashes: Vec<Flash>,
    username: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login_page(
    cookies: Cookies,
    State(state): State<AppState>,
) -> AppResult<Response> {
    // If already logged in, go to dashboard
    if get_current_session(&cookies, &state.keys).is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    let template = LoginTemplate {
        flashes: flash::take(&cookies),
        username: String::new(),
    };
    Ok(Html(template.render()?).into_response())
}

pub async fn login(
    cookies: Cookies,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let username = form.username.trim();
    let password = form.password.trim();

    if !state.credentials.verify(username, password) {
        log::info!("failed login attempt for {username:?}");
        let template = LoginTemplate {
            flashes: vec![Flash::new(FlashLevel::Danger, "Invalid username or password.")],
            username: username.to_string(),
        };
        return Ok((StatusCode::UNAUTHORIZED, Html(template.render()?)).into_response());
    }

    let token = state.keys.create_token(username)?;
    let max_age = time::Duration::seconds(state.keys.lifetime().num_seconds());

    // Set secure HTTP-only cookie with JWT token
    let cookie = Cookie::build((AUTH_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(tower_cookies::cookie::SameSite::Lax)
        .max_age(max_age)
        .build();
    cookies.add(cookie);

    log::info!("{username} logged in");
    flash::success(&cookies, "Logged in successfully.");
    Ok(Redirect::to("/").into_response())
}

pub async fn logout(cookies: Cookies) -> impl IntoResponse {
    let mut removal = Cookie::from(AUTH_COOKIE);
    removal.set_path("/");
    cookies.remove(removal);
    flash::info(&cookies, "Logged out successfully.");
    Redirect::to("/login")
}
