use axum::{
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::{AppError, AppResult},
    filters,
    ledger::{parse_quantity, LedgerCommand, LedgerError, MovementRequest, TransactionKind},
    middleware::require_session,
    models::{ComponentDisplay, Lab, TransactionDisplay},
    queries::{self, ComponentScope, StatusCount},
    state::AppState,
    utils::{flash, Flash, FlashLevel},
};

#[derive(Template)]
#[template(path = "transactions.html")]
struct TransactionsTemplate {
    flashes: Vec<Flash>,
    transactions: Vec<TransactionDisplay>,
    status_counts: Vec<StatusCount>,
}

#[derive(Template)]
#[template(path = "add_transaction.html")]
struct AddTransactionTemplate {
    flashes: Vec<Flash>,
    labs: Vec<Lab>,
    components: Vec<ComponentDisplay>,
    selection: Selection,
}

#[derive(Template)]
#[template(path = "edit_transaction.html")]
struct EditTransactionTemplate {
    flashes: Vec<Flash>,
    transaction: TransactionDisplay,
}

/// What the add form shows as already chosen.
#[derive(Debug, Default)]
struct Selection {
    transaction_type: String,
    component_id: Option<i32>,
    lab_id: Option<i32>,
    campus: String,
    person_name: String,
    purpose: String,
    quantity: String,
    notes: String,
}

impl Selection {
    fn is_type(&self, kind: &str) -> bool {
        self.transaction_type == kind
    }

    fn has_component(&self, id: i32) -> bool {
        self.component_id == Some(id)
    }

    fn has_lab(&self, id: i32) -> bool {
        self.lab_id == Some(id)
    }
}

#[derive(Deserialize)]
pub struct AddTransactionQuery {
    component_id: Option<String>,
    transaction_type: Option<String>,
}

#[derive(Deserialize)]
pub struct TransactionForm {
    transaction_type: Option<String>,
    component_id: Option<String>,
    from_lab_id: Option<String>,
    from_campus: Option<String>,
    person_name: Option<String>,
    purpose: Option<String>,
    transaction_quantity: Option<String>,
    notes: Option<String>,
}

impl TransactionForm {
    fn selection(&self) -> Selection {
        Selection {
            transaction_type: super::trimmed(self.transaction_type.as_deref()),
            component_id: super::parse_id(self.component_id.as_deref()),
            lab_id: super::parse_id(self.from_lab_id.as_deref()),
            campus: super::trimmed(self.from_campus.as_deref()),
            person_name: super::trimmed(self.person_name.as_deref()),
            purpose: super::trimmed(self.purpose.as_deref()),
            quantity: super::trimmed(self.transaction_quantity.as_deref()),
            notes: super::trimmed(self.notes.as_deref()),
        }
    }

    /// Field errors are reported in form order; the transaction type is checked last.
    fn command(&self) -> Result<LedgerCommand, LedgerError> {
        let quantity = parse_quantity(self.transaction_quantity.as_deref().unwrap_or_default())?;
        let request = MovementRequest {
            component_id: super::parse_id(self.component_id.as_deref()),
            lab_id: super::parse_id(self.from_lab_id.as_deref()),
            campus: self.from_campus.clone(),
            person_name: super::trimmed(self.person_name.as_deref()),
            purpose: super::trimmed(self.purpose.as_deref()),
            quantity,
            notes: self.notes.clone(),
        };
        request.validate()?;

        let kind: TransactionKind = self.transaction_type.as_deref().unwrap_or_default().parse()?;
        Ok(LedgerCommand::Record { kind, request })
    }
}

#[derive(Deserialize)]
pub struct ReturnForm {
    return_now: Option<String>,
    notes: Option<String>,
}

/// How the edit screen reads `return_now`.
#[derive(Debug, PartialEq)]
enum ReturnNow {
    Quantity(i32),
    NoChange,
    Invalid,
}

impl ReturnForm {
    fn return_now(&self) -> ReturnNow {
        let raw = self.return_now.as_deref().map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return ReturnNow::NoChange;
        }
        match raw.parse::<i32>() {
            Ok(quantity) if quantity > 0 => ReturnNow::Quantity(quantity),
            Ok(_) => ReturnNow::NoChange,
            Err(_) => ReturnNow::Invalid,
        }
    }
}

pub async fn transactions_list(
    cookies: Cookies,
    State(state): State<AppState>,
) -> AppResult<Html<String>> {
    require_session(&cookies, &state.keys)?;

    let template = TransactionsTemplate {
        flashes: flash::take(&cookies),
        transactions: queries::transaction_displays(&state.db, None).await?,
        status_counts: queries::status_counts(&state.db).await?,
    };
    Ok(Html(template.render()?))
}

async fn render_add_form(
    state: &AppState,
    flashes: Vec<Flash>,
    selection: Selection,
) -> AppResult<Html<String>> {
    let template = AddTransactionTemplate {
        flashes,
        labs: queries::list_labs(&state.db).await?,
        components: queries::component_displays(&state.db, ComponentScope::All).await?,
        selection,
    };
    Ok(Html(template.render()?))
}

pub async fn add_transaction_form(
    cookies: Cookies,
    State(state): State<AppState>,
    Query(query): Query<AddTransactionQuery>,
) -> AppResult<Html<String>> {
    require_session(&cookies, &state.keys)?;

    let component_id = super::parse_id(query.component_id.as_deref());
    let lab_id = match component_id {
        Some(id) => queries::find_component(&state.db, id).await?.map(|c| c.lab_id),
        None => None,
    };

    let selection = Selection {
        transaction_type: super::optional_text(query.transaction_type.as_deref())
            .unwrap_or_else(|| TransactionKind::Issue.as_str().to_string()),
        component_id,
        lab_id,
        ..Selection::default()
    };
    render_add_form(&state, flash::take(&cookies), selection).await
}

pub async fn create_transaction(
    cookies: Cookies,
    State(state): State<AppState>,
    Form(form): Form<TransactionForm>,
) -> AppResult<Response> {
    require_session(&cookies, &state.keys)?;

    let outcome = match form.command() {
        Ok(command) => state.ledger.execute(&command).await,
        Err(LedgerError::InvalidTransactionType) => Err(unknown_type_error(&state, &form).await?),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(outcome) => {
            log::info!(
                "transaction {} {}: {} x{} of component {}, stock now {}",
                outcome.transaction.id,
                if outcome.merged { "updated" } else { "opened" },
                outcome.transaction.last_action,
                outcome.transaction.transaction_quantity,
                outcome.component.id,
                outcome.component.quantity,
            );
            flash::success(&cookies, "Transaction recorded successfully.");
            Ok(Redirect::to("/transactions").into_response())
        }
        Err(err) if err.is_domain() => {
            let flashes = vec![Flash::new(FlashLevel::Danger, err.to_string())];
            let page = render_add_form(&state, flashes, form.selection()).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
        }
        Err(err) => Err(AppError::from(err)),
    }
}

/// A missing component outranks a bad transaction type.
async fn unknown_type_error(state: &AppState, form: &TransactionForm) -> AppResult<LedgerError> {
    let component = match super::parse_id(form.component_id.as_deref()) {
        Some(id) => queries::find_component(&state.db, id).await?,
        None => None,
    };
    Ok(match component {
        Some(_) => LedgerError::InvalidTransactionType,
        None => LedgerError::ComponentNotFound,
    })
}

pub async fn edit_transaction_form(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(transaction_id): Path<i32>,
) -> AppResult<Response> {
    require_session(&cookies, &state.keys)?;

    let Some(transaction) = queries::find_transaction_display(&state.db, transaction_id).await? else {
        flash::danger(&cookies, LedgerError::TransactionNotFound.to_string());
        return Ok(Redirect::to("/transactions").into_response());
    };

    let template = EditTransactionTemplate {
        flashes: flash::take(&cookies),
        transaction,
    };
    Ok(Html(template.render()?).into_response())
}

pub async fn return_against_transaction(
    cookies: Cookies,
    State(state): State<AppState>,
    Path(transaction_id): Path<i32>,
    Form(form): Form<ReturnForm>,
) -> AppResult<Redirect> {
    require_session(&cookies, &state.keys)?;

    let edit_page = format!("/transactions/{transaction_id}/edit");
    let quantity = match form.return_now() {
        ReturnNow::Quantity(quantity) => quantity,
        ReturnNow::NoChange => {
            flash::info(&cookies, "No changes made (return quantity must be > 0).");
            return Ok(Redirect::to(&edit_page));
        }
        ReturnNow::Invalid => {
            flash::danger(&cookies, "Return quantity must be a valid number.");
            return Ok(Redirect::to(&edit_page));
        }
    };

    let command = LedgerCommand::ReturnAgainst {
        transaction_id,
        quantity,
        notes: form.notes.clone(),
    };

    match state.ledger.execute(&command).await {
        Ok(outcome) => {
            log::info!(
                "returned {quantity} against transaction {transaction_id}, now {}",
                outcome.transaction.status,
            );
            flash::success(&cookies, "Return transaction recorded successfully.");
            Ok(Redirect::to(&edit_page))
        }
        Err(LedgerError::TransactionNotFound) => {
            flash::danger(&cookies, LedgerError::TransactionNotFound.to_string());
            Ok(Redirect::to("/transactions"))
        }
        Err(err) if err.is_domain() => {
            flash::danger(&cookies, err.to_string());
            Ok(Redirect::to(&edit_page))
        }
        Err(err) => Err(AppError::from(err)),
    }
}

pub async fn view_transaction(Path(transaction_id): Path<i32>) -> Redirect {
    Redirect::to(&format!("/transactions/{transaction_id}/edit"))
}
