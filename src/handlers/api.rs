use axum::{
    extract::{Path, State},
    response::Json,
};
use tower_cookies::Cookies;

use crate::{
    error::AppResult,
    middleware::require_session,
    models::ComponentOption,
    queries,
    state::AppState,
};

/// Components stocked in one lab, for narrowing the add-transaction picker.
pub async fn get_lab_components(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(lab_id): Path<i32>,
) -> AppResult<Json<Vec<ComponentOption>>> {
    require_session(&cookies, &state.keys)?;

    let components = queries::component_options(&state.db, lab_id).await?;
    Ok(Json(components))
}
