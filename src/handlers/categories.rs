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
    middleware::require_session,
    models::{Category, CategorySummary, Lab},
    queries::{self, ComponentScope},
    state::AppState,
    utils::{flash, Flash},
};

#[derive(Template)]
#[template(path = "categories.html")]
struct CategoriesTemplate {
    flashes: Vec<Flash>,
    categories: Vec<CategorySummary>,
    labs: Vec<Lab>,
}

#[derive(Template)]
#[template(path = "edit_category.html")]
struct EditCategoryTemplate {
    flashes: Vec<Flash>,
    category: Category,
    labs: Vec<Lab>,
}

#[derive(Deserialize)]
pub struct CategoryForm {
    lab_id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

struct ValidCategory {
    lab_id: i32,
    name: String,
    description: Option<String>,
}

impl CategoryForm {
    fn validate(&self) -> Option<ValidCategory> {
        let lab_id = super::parse_id(self.lab_id.as_deref())?;
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        Some(ValidCategory {
            lab_id,
            name: name.to_string(),
            description: super::optional_text(Some(&self.description)),
        })
    }
}

const CATEGORY_REQUIRED: &str = "Lab and Category name are required.";

pub async fn categories_list(
    cookies: Cookies,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    require_session(&cookies, &state.keys)?;

    let template = CategoriesTemplate {
        flashes: flash::take(&cookies),
        categories: queries::category_summaries(&state.db).await?,
        labs: queries::list_labs(&state.db).await?,
    };
    Ok(Html(template.render()?))
}

pub async fn create_category(
    cookies: Cookies,
    State(state): State<AppState>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    let Some(category) = form.validate() else {
        flash::danger(&cookies, CATEGORY_REQUIRED);
        return Ok(Redirect::to("/categories"));
    };

    let inserted = sqlx::query("INSERT INTO categories (name, description, lab_id) VALUES ($1, $2, $3)")
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.lab_id)
        .execute(&state.db)
        .await;

    match inserted {
        Ok(_) => flash::success(&cookies, "Category added successfully."),
        Err(err) if is_foreign_key_violation(&err) => flash::danger(&cookies, CATEGORY_REQUIRED),
        Err(err) => return Err(err.into()),
    }
    Ok(Redirect::to("/categories"))
}

pub async fn edit_category_form(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
) -> AppResult<Response> {
    require_session(&cookies, &state.keys)?;

    let Some(category) = queries::find_category(&state.db, category_id).await? else {
        flash::danger(&cookies, "Category not found.");
        return Ok(Redirect::to("/categories").into_response());
    };

    let template = EditCategoryTemplate {
        flashes: flash::take(&cookies),
        category,
        labs: queries::list_labs(&state.db).await?,
    };
    Ok(Html(template.render()?).into_response())
}

pub async fn update_category(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    let Some(category) = form.validate() else {
        flash::danger(&cookies, CATEGORY_REQUIRED);
        return Ok(Redirect::to(&format!("/categories/{category_id}/edit")));
    };

    let result = sqlx::query("UPDATE categories SET name = $1, description = $2, lab_id = $3 WHERE id = $4")
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.lab_id)
        .bind(category_id)
        .execute(&state.db)
        .await;

    match result {
        Ok(result) if result.rows_affected() == 0 => flash::danger(&cookies, "Category not found."),
        Ok(_) => flash::success(&cookies, "Category updated successfully."),
        Err(err) if is_foreign_key_violation(&err) => {
            flash::danger(&cookies, CATEGORY_REQUIRED);
            return Ok(Redirect::to(&format!("/categories/{category_id}/edit")));
        }
        Err(err) => return Err(err.into()),
    }
    Ok(Redirect::to("/categories"))
}

pub async fn delete_category(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    match sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(category_id)
        .execute(&state.db)
        .await
    {
        Ok(result) if result.rows_affected() > 0 => flash::info(&cookies, "Category deleted."),
        Ok(_) => {}
        Err(err) if is_foreign_key_violation(&err) => {
            flash::danger(&cookies, "Category still has components and cannot be deleted.")
        }
        Err(err) => return Err(err.into()),
    }
    Ok(Redirect::to("/categories"))
}

pub async fn category_components(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(category_id): Path<i32>,
) -> AppResult<Response> {
    require_session(&cookies, &state.keys)?;

    let Some(category) = queries::find_category(&state.db, category_id).await? else {
        flash::danger(&cookies, "Category not found.");
        return Ok(Redirect::to("/categories").into_response());
    };

    let template = ComponentsTemplate {
        flashes: flash::take(&cookies),
        components: queries::component_displays(&state.db, ComponentScope::Category(category_id)).await?,
        selected_lab: None,
        selected_category: Some(category),
    };
    Ok(Html(template.render()?).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(lab_id: &str, name: &str) -> CategoryForm {
        CategoryForm {
            lab_id: Some(lab_id.to_string()),
            name: name.to_string(),
            description: "  ".to_string(),
        }
    }

    #[test]
    fn category_needs_lab_and_name() {
        let valid = form("3", " Sensors ").validate().unwrap();
        assert_eq!(valid.lab_id, 3);
        assert_eq!(valid.name, "Sensors");
        assert_eq!(valid.description, None);

        assert!(form("", "Sensors").validate().is_none());
        assert!(form("3", "   ").validate().is_none());
    }
}
