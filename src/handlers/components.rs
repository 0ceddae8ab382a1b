use axum::{
    extract::{Form, Path, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    database::is_foreign_key_violation,
    error::AppResult,
    filters,
    middleware::require_session,
    models::{component::DEFAULT_COMPONENT_TYPE, Category, Component, ComponentDisplay, Lab},
    queries::{self, ComponentScope},
    state::AppState,
    utils::{flash, Flash},
};

#[derive(Template)]
#[template(path = "components.html")]
pub(crate) struct ComponentsTemplate {
    pub flashes: Vec<Flash>,
    pub components: Vec<ComponentDisplay>,
    pub selected_lab: Option<Lab>,
    pub selected_category: Option<Category>,
}

#[derive(Template)]
#[template(path = "component_form.html")]
struct ComponentFormTemplate {
    flashes: Vec<Flash>,
    values: ComponentValues,
    labs: Vec<Lab>,
    categories: Vec<Category>,
}

/// Prefilled inputs of the add/edit form. Empty for a new component.
#[derive(Debug, Default)]
struct ComponentValues {
    id: Option<i32>,
    name: String,
    category_id: Option<i32>,
    lab_id: Option<i32>,
    quantity: i32,
    min_stock_level: i32,
    unit: String,
    description: String,
    component_type: String,
}

impl ComponentValues {
    fn action(&self) -> String {
        match self.id {
            Some(id) => format!("/components/{id}/edit"),
            None => "/components/add".to_string(),
        }
    }

    fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    fn in_lab(&self, lab_id: i32) -> bool {
        self.lab_id == Some(lab_id)
    }

    fn in_category(&self, category_id: i32) -> bool {
        self.category_id == Some(category_id)
    }
}

impl From<Component> for ComponentValues {
    fn from(component: Component) -> Self {
        Self {
            id: Some(component.id),
            category_id: Some(component.category_id),
            lab_id: Some(component.lab_id),
            quantity: component.quantity,
            min_stock_level: component.min_stock_level,
            unit: component.unit_text().to_string(),
            description: component.description_text().to_string(),
            component_type: component.type_text().to_string(),
            name: component.name,
        }
    }
}

// This struct mirrors the add/edit component form
#[derive(Deserialize)]
pub struct ComponentForm {
    #[serde(default)]
    name: String,
    category_id: Option<String>,
    lab_id: Option<String>,
    quantity: Option<String>,
    min_stock_level: Option<String>,
    unit: Option<String>,
    description: Option<String>,
    component_type: Option<String>,
}

struct ComponentFields {
    name: String,
    category_id: i32,
    lab_id: i32,
    quantity: i32,
    min_stock_level: i32,
    unit: Option<String>,
    description: Option<String>,
    component_type: String,
}

impl ComponentForm {
    fn validate(&self) -> Option<ComponentFields> {
        let name = self.name.trim();
        let category_id = super::parse_id(self.category_id.as_deref())?;
        let lab_id = super::parse_id(self.lab_id.as_deref())?;
        if name.is_empty() {
            return None;
        }

        Some(ComponentFields {
            name: name.to_string(),
            category_id,
            lab_id,
            quantity: super::parse_count(self.quantity.as_deref()),
            min_stock_level: super::parse_count(self.min_stock_level.as_deref()),
            unit: super::optional_text(self.unit.as_deref()),
            description: super::optional_text(self.description.as_deref()),
            component_type: super::optional_text(self.component_type.as_deref())
                .unwrap_or_else(|| DEFAULT_COMPONENT_TYPE.to_string()),
        })
    }
}

const COMPONENT_REQUIRED: &str = "Name, category, and lab are required.";

pub async fn components_list(
    cookies: Cookies,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    require_session(&cookies, &state.keys)?;

    let template = ComponentsTemplate {
        flashes: flash::take(&cookies),
        components: queries::component_displays(&state.db, ComponentScope::All).await?,
        selected_lab: None,
        selected_category: None,
    };
    Ok(Html(template.render()?))
}

async fn render_form(
    cookies: &Cookies,
    state: &AppState,
    component: Option<Component>,
) -> AppResult<Html<String>> {
    let template = ComponentFormTemplate {
        flashes: flash::take(cookies),
        values: component.map(ComponentValues::from).unwrap_or_default(),
        labs: queries::list_labs(&state.db).await?,
        categories: queries::list_categories(&state.db).await?,
    };
    Ok(Html(template.render()?))
}

pub async fn add_component_form(
    cookies: Cookies,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    require_session(&cookies, &state.keys)?;
    render_form(&cookies, &state, None).await
}

pub async fn create_component(
    cookies: Cookies,
    State(state): State<AppState>,
    Form(form): Form<ComponentForm>,
) -> AppResult<Response> {
    require_session(&cookies, &state.keys)?;

    let Some(fields) = form.validate() else {
        flash::danger(&cookies, COMPONENT_REQUIRED);
        return Ok(Redirect::to("/components/add").into_response());
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO components (
            name, category_id, lab_id, quantity, min_stock_level, unit, description, component_type
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&fields.name)
    .bind(fields.category_id)
    .bind(fields.lab_id)
    .bind(fields.quantity)
    .bind(fields.min_stock_level)
    .bind(&fields.unit)
    .bind(&fields.description)
    .bind(&fields.component_type)
    .execute(&state.db)
    .await;

    match inserted {
        Ok(_) => {}
        Err(err) if is_foreign_key_violation(&err) => {
            flash::danger(&cookies, COMPONENT_REQUIRED);
            return Ok(Redirect::to("/components/add").into_response());
        }
        Err(err) => return Err(err.into()),
    }

    log::info!("component {:?} added with quantity {}", fields.name, fields.quantity);
    flash::success(&cookies, "Component added successfully.");
    Ok(Redirect::to("/components").into_response())
}

pub async fn edit_component_form(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(component_id): Path<i32>,
) -> AppResult<Response> {
    require_session(&cookies, &state.keys)?;

    let Some(component) = queries::find_component(&state.db, component_id).await? else {
        flash::danger(&cookies, "Component not found.");
        return Ok(Redirect::to("/components").into_response());
    };
    Ok(render_form(&cookies, &state, Some(component)).await?.into_response())
}

pub async fn update_component(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(component_id): Path<i32>,
    Form(form): Form<ComponentForm>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    let Some(fields) = form.validate() else {
        flash::danger(&cookies, COMPONENT_REQUIRED);
        return Ok(Redirect::to(&format!("/components/{component_id}/edit")));
    };

    let result = sqlx::query(
        r#"
        UPDATE components SET
            name = $1, category_id = $2, lab_id = $3, quantity = $4, min_stock_level = $5,
            unit = $6, description = $7, component_type = $8, last_updated = NOW()
        WHERE id = $9
        "#,
    )
    .bind(&fields.name)
    .bind(fields.category_id)
    .bind(fields.lab_id)
    .bind(fields.quantity)
    .bind(fields.min_stock_level)
    .bind(&fields.unit)
    .bind(&fields.description)
    .bind(&fields.component_type)
    .bind(component_id)
    .execute(&state.db)
    .await;

    match result {
        Ok(result) if result.rows_affected() == 0 => flash::danger(&cookies, "Component not found."),
        Ok(_) => flash::success(&cookies, "Component updated successfully."),
        Err(err) if is_foreign_key_violation(&err) => {
            flash::danger(&cookies, COMPONENT_REQUIRED);
            return Ok(Redirect::to(&format!("/components/{component_id}/edit")));
        }
        Err(err) => return Err(err.into()),
    }
    Ok(Redirect::to("/components"))
}

pub async fn delete_component(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(component_id): Path<i32>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    match sqlx::query("DELETE FROM components WHERE id = $1")
        .bind(component_id)
        .execute(&state.db)
        .await
    {
        Ok(result) if result.rows_affected() > 0 => flash::info(&cookies, "Component deleted."),
        Ok(_) => {}
        Err(err) if is_foreign_key_violation(&err) => flash::danger(
            &cookies,
            "Component has transactions recorded against it and cannot be deleted.",
        ),
        Err(err) => return Err(err.into()),
    }
    Ok(Redirect::to("/components"))
}
