use axum::{
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::Cookies;

use super::components::ComponentsTemplate;
use crate::{
    database::is_foreign_key_violation,
    error::AppResult,
    filters,
    middleware::require_session,
    models::Lab,
    queries::{self, ComponentScope},
    state::AppState,
    utils::{flash, Flash},
};

#[derive(Template)]
#[template(path = "labs.html")]
struct LabsTemplate {
    flashes: Vec<Flash>,
    labs: Vec<Lab>,
}

#[derive(Template)]
#[template(path = "edit_lab.html")]
struct EditLabTemplate {
    flashes: Vec<Flash>,
    lab: Lab,
}

#[derive(Deserialize)]
pub struct LabForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
}

impl LabForm {
    fn fields(&self) -> (&str, Option<String>, Option<String>) {
        (
            self.name.trim(),
            super::optional_text(Some(&self.location)),
            super::optional_text(Some(&self.description)),
        )
    }
}

pub async fn labs_list(
    cookies: Cookies,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    require_session(&cookies, &state.keys)?;

    let template = LabsTemplate {
        flashes: flash::take(&cookies),
        labs: queries::list_labs(&state.db).await?,
    };
    Ok(Html(template.render()?))
}

pub async fn create_lab(
    cookies: Cookies,
    State(state): State<AppState>,
    Form(form): Form<LabForm>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    let (name, location, description) = form.fields();
    if name.is_empty() {
        flash::danger(&cookies, "Lab name is required.");
        return Ok(Redirect::to("/labs"));
    }

    sqlx::query("INSERT INTO labs (name, location, description) VALUES ($1, $2, $3)")
        .bind(name)
        .bind(location)
        .bind(description)
        .execute(&state.db)
        .await?;

    flash::success(&cookies, "Lab added successfully.");
    Ok(Redirect::to("/labs"))
}

pub async fn edit_lab_form(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(lab_id): Path<i32>,
) -> AppResult<Response> {
    require_session(&cookies, &state.keys)?;

    let Some(lab) = queries::find_lab(&state.db, lab_id).await? else {
        flash::danger(&cookies, "Lab not found.");
        return Ok(Redirect::to("/labs").into_response());
    };

    let template = EditLabTemplate {
        flashes: flash::take(&cookies),
        lab,
    };
    Ok(Html(template.render()?).into_response())
}

pub async fn update_lab(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(lab_id): Path<i32>,
    Form(form): Form<LabForm>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    let (name, location, description) = form.fields();
    if name.is_empty() {
        flash::danger(&cookies, "Lab name is required.");
        return Ok(Redirect::to(&format!("/labs/{lab_id}/edit")));
    }

    let result = sqlx::query("UPDATE labs SET name = $1, location = $2, description = $3 WHERE id = $4")
        .bind(name)
        .bind(location)
        .bind(description)
        .bind(lab_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        flash::danger(&cookies, "Lab not found.");
    } else {
        flash::success(&cookies, "Lab updated successfully.");
    }
    Ok(Redirect::to("/labs"))
}

pub async fn delete_lab(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(lab_id): Path<i32>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    match sqlx::query("DELETE FROM labs WHERE id = $1")
        .bind(lab_id)
        .execute(&state.db)
        .await
    {
        Ok(result) if result.rows_affected() > 0 => flash::info(&cookies, "Lab deleted."),
        Ok(_) => {}
        Err(err) if is_foreign_key_violation(&err) => flash::danger(
            &cookies,
            "Lab still has categories, components or transactions and cannot be deleted.",
        ),
        Err(err) => return Err(err.into()),
    }
    Ok(Redirect::to("/labs"))
}

pub async fn lab_components(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(lab_id): Path<i32>,
) -> AppResult<Response> {
    require_session(&cookies, &state.keys)?;

    let Some(lab) = queries::find_lab(&state.db, lab_id).await? else {
        flash::danger(&cookies, "Lab not found.");
        return Ok(Redirect::to("/labs").into_response());
    };

    let template = ComponentsTemplate {
        flashes: flash::take(&cookies),
        components: queries::component_displays(&state.db, ComponentScope::Lab(lab_id)).await?,
        selected_lab: Some(lab),
        selected_category: None,
    };
    Ok(Html(template.render()?).into_response())
}
