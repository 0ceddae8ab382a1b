mod config;
mod database;
mod error;
mod filters;
mod handlers;
mod ledger;
mod middleware;
mod models;
mod queries;
mod state;
mod utils;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use config::AppConfig;
use database::{create_database_pool, run_migrations};
use state::AppState;
use utils::{SessionKeys, SharedCredential};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = AppConfig::from_env()?;

    let db = create_database_pool(&config.database_url, config.max_connections)
        .await
        .context("failed to connect to database")?;
    run_migrations(&db).await.context("failed to apply migrations")?;

    let credentials = SharedCredential::from_config(&config.admin_username, &config.admin_password)
        .context("failed to prepare the admin credential")?;
    let keys = SessionKeys::new(&config.jwt_secret, config.session_hours);
    let state = AppState::new(db, keys, Arc::new(credentials));

    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    log::info!("labstock listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        // Session
        .route("/login", get(handlers::auth::login_page).post(handlers::auth::login))
        .route("/logout", get(handlers::auth::logout))

        .route("/", get(handlers::dashboard))

        // Labs
        .route("/labs", get(handlers::labs::labs_list).post(handlers::labs::create_lab))
        .route(
            "/labs/:id/edit",
            get(handlers::labs::edit_lab_form).post(handlers::labs::update_lab),
        )
        .route("/labs/:id/delete", post(handlers::labs::delete_lab))
        .route("/labs/:id/components", get(handlers::labs::lab_components))

        // Categories
        .route(
            "/categories",
            get(handlers::categories::categories_list).post(handlers::categories::create_category),
        )
        .route(
            "/categories/:id/edit",
            get(handlers::categories::edit_category_form).post(handlers::categories::update_category),
        )
        .route("/categories/:id/delete", post(handlers::categories::delete_category))
        .route("/categories/:id/components", get(handlers::categories::category_components))

        // Components
        .route("/components", get(handlers::components::components_list))
        .route(
            "/components/add",
            get(handlers::components::add_component_form).post(handlers::components::create_component),
        )
        .route(
            "/components/:id/edit",
            get(handlers::components::edit_component_form).post(handlers::components::update_component),
        )
        .route("/components/:id/delete", post(handlers::components::delete_component))

        // Transactions
        .route("/transactions", get(handlers::transactions::transactions_list))
        .route(
            "/transactions/add",
            get(handlers::transactions::add_transaction_form)
                .post(handlers::transactions::create_transaction),
        )
        .route(
            "/transactions/:id/edit",
            get(handlers::transactions::edit_transaction_form)
                .post(handlers::transactions::return_against_transaction),
        )
        .route("/transactions/:id/view", get(handlers::transactions::view_transaction))

        // API routes
        .route("/api/labs/:id/components", get(handlers::api::get_lab_components))

        // Static files
        .nest_service("/static", ServeDir::new("static"))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(1024 * 1024)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    fn app() -> Router {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://labstock@localhost/labstock")
            .unwrap();
        let keys = SessionKeys::new("router-test-secret-0123", 1);
        let credentials = SharedCredential::new("admin".into(), "not-a-hash".into());
        create_router(AppState::new(db, keys, Arc::new(credentials)))
    }

    #[tokio::test]
    async fn protected_pages_redirect_to_login() {
        for uri in ["/", "/components", "/transactions/add", "/api/labs/1/components"] {
            let response = app()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers()[header::LOCATION], "/login");
        }
    }

    #[tokio::test]
    async fn login_page_renders() {
        let response = app()
            .oneshot(Request::get("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn view_redirects_to_edit() {
        let response = app()
            .oneshot(Request::get("/transactions/7/view").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()[header::LOCATION], "/transactions/7/edit");
    }

    #[tokio::test]
    #[ignore = "requires a disposable PostgreSQL database; opt in via LABSTOCK_TEST_DATABASE_URL"]
    async fn unknown_lab_or_category_flashes_instead_of_failing() {
        let Some(db) = database::test_database().await else { return };
        let keys = SessionKeys::new("router-test-secret-0123", 1);
        let cookie = format!("auth_token={}", keys.create_token("admin").unwrap());
        let credentials = SharedCredential::new("admin".into(), "not-a-hash".into());
        let app = create_router(AppState::new(db, keys, Arc::new(credentials)));

        let missing = i32::MAX;
        for (uri, body, back_to) in [
            (
                "/components/add",
                format!("name=Servo&category_id={missing}&lab_id={missing}"),
                "/components/add",
            ),
            ("/categories", format!("name=Sensors&lab_id={missing}"), "/categories"),
        ] {
            let response = app
                .clone()
                .oneshot(
                    Request::post(uri)
                        .header(header::COOKIE, &cookie)
                        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                        .body(Body::from(body))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(response.headers()[header::LOCATION], back_to);
            let flash = response.headers()[header::SET_COOKIE].to_str().unwrap();
            assert!(flash.starts_with("flash=") && flash.contains("danger"), "{flash}");
        }
    }
}
