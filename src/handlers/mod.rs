pub mod auth;
pub mod labs;
pub mod categories;
pub mod components;
pub mod transactions;
pub mod api;

use axum::{
    extract::State,
    response::Html,
};
use askama::Template;
use tower_cookies::Cookies;

use crate::{
    error::AppResult,
    filters,
    middleware::require_session,
    queries::{self, DashboardStats, StatusCount},
    state::AppState,
    utils::{flash, Flash},
};

#[derive(Template)]
#[template(path = "index.html")]
struct DashboardTemplate {
    flashes: Vec<Flash>,
    username: String,
    stats: DashboardStats,
    status_counts: Vec<StatusCount>,
}

pub async fn dashboard(
    cookies: Cookies,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    let session = require_session(&cookies, &state.keys)?;

    let stats = queries::dashboard_stats(&state.db).await?;
    let status_counts = queries::status_counts(&state.db).await?;

    let template = DashboardTemplate {
        flashes: flash::take(&cookies),
        username: session.username,
        stats,
        status_counts,
    };
    Ok(Html(template.render()?))
}

/// Select inputs submit "" for "nothing chosen".
pub(crate) fn parse_id(raw: Option<&str>) -> Option<i32> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<i32>().ok())
}

/// Optional numeric inputs fall back to zero when blank or unparsable.
pub(crate) fn parse_count(raw: Option<&str>) -> i32 {
    raw.map(str::trim)
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(0)
}

pub(crate) fn trimmed(raw: Option<&str>) -> String {
    raw.map(str::trim).unwrap_or_default().to_string()
}

pub(crate) fn optional_text(raw: Option<&str>) -> Option<String> {
    Some(trimmed(raw)).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_ignores_blank_selects() {
        assert_eq!(parse_id(Some("12")), Some(12));
        assert_eq!(parse_id(Some(" 3 ")), Some(3));
        assert_eq!(parse_id(Some("")), None);
        assert_eq!(parse_id(Some("abc")), None);
        assert_eq!(parse_id(None), None);
    }

    #[test]
    fn parse_count_defaults_to_zero() {
        assert_eq!(parse_count(Some("15")), 15);
        assert_eq!(parse_count(Some("")), 0);
        assert_eq!(parse_count(Some("lots")), 0);
        assert_eq!(parse_count(None), 0);
    }

    #[test]
    fn optional_text_drops_blanks() {
        assert_eq!(optional_text(Some("  Block A ")).as_deref(), Some("Block A"));
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(trimmed(None), "");
    }
}
