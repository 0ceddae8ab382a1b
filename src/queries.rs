//! Read-side queries. Listing screens get rows with lab and category names
//! already joined in; nothing here writes.

use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Postgres};

use crate::{
    database::Database,
    models::{
        Category, CategorySummary, Component, ComponentDisplay, ComponentOption, Lab,
        LabComponentCount, TransactionDisplay, TransactionStatus,
    },
};

const TRANSACTION_DISPLAY_SELECT: &str = r#"
    SELECT
        t.id, t.component_id, c.name AS component_name, l.name AS lab_name,
        t.campus, t.person_name, t.purpose,
        t.qty_issued, t.qty_returned, t.pending_qty, t.status,
        t.issue_date, t.date, t.transaction_quantity, t.last_action, t.notes
    FROM transactions t
    JOIN components c ON c.id = t.component_id
    LEFT JOIN labs l ON l.id = t.lab_id
"#;

const COMPONENT_DISPLAY_SELECT: &str = r#"
    SELECT
        c.id, c.name, c.category_id, cat.name AS category_name,
        c.lab_id, l.name AS lab_name, c.quantity, c.min_stock_level,
        c.unit, c.description, c.component_type, c.last_updated
    FROM components c
    JOIN categories cat ON cat.id = c.category_id
    JOIN labs l ON l.id = c.lab_id
"#;

#[derive(Debug, Clone, Copy)]
pub enum ComponentScope {
    All,
    Lab(i32),
    Category(i32),
}

#[derive(Debug, Serialize, FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_components: i64,
    pub total_transactions: i64,
    pub total_labs: i64,
    pub total_categories: i64,
    pub pending_returns: i64,
    pub low_stock_components: i64,
    pub out_of_stock_components: i64,
    pub lab_stats: Vec<LabComponentCount>,
    pub recent_transactions: Vec<TransactionDisplay>,
}

pub async fn list_labs(db: &Database) -> Result<Vec<Lab>, sqlx::Error> {
    sqlx::query_as::<_, Lab>("SELECT * FROM labs ORDER BY name")
        .fetch_all(db)
        .await
}

pub async fn find_lab(db: &Database, id: i32) -> Result<Option<Lab>, sqlx::Error> {
    sqlx::query_as::<_, Lab>("SELECT * FROM labs WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn list_categories(db: &Database) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(db)
        .await
}

pub async fn find_category(db: &Database, id: i32) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn category_summaries(db: &Database) -> Result<Vec<CategorySummary>, sqlx::Error> {
    sqlx::query_as::<_, CategorySummary>(
        r#"
        SELECT
            cat.id, cat.name, cat.description, l.name AS lab_name, cat.created_at,
            COUNT(c.id) AS component_count,
            COALESCE(SUM(c.quantity), 0)::BIGINT AS total_quantity
        FROM categories cat
        LEFT JOIN labs l ON l.id = cat.lab_id
        LEFT JOIN components c ON c.category_id = cat.id
        GROUP BY cat.id, l.name
        ORDER BY cat.name
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn find_component(db: &Database, id: i32) -> Result<Option<Component>, sqlx::Error> {
    sqlx::query_as::<_, Component>("SELECT * FROM components WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn component_displays(
    db: &Database,
    scope: ComponentScope,
) -> Result<Vec<ComponentDisplay>, sqlx::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(COMPONENT_DISPLAY_SELECT);
    match scope {
        ComponentScope::All => {}
        ComponentScope::Lab(lab_id) => {
            query.push(" WHERE c.lab_id = ").push_bind(lab_id);
        }
        ComponentScope::Category(category_id) => {
            query.push(" WHERE c.category_id = ").push_bind(category_id);
        }
    }
    query.push(" ORDER BY c.name");

    query.build_query_as::<ComponentDisplay>().fetch_all(db).await
}

pub async fn component_options(db: &Database, lab_id: i32) -> Result<Vec<ComponentOption>, sqlx::Error> {
    sqlx::query_as::<_, ComponentOption>(
        "SELECT id, name, quantity, unit FROM components WHERE lab_id = $1 ORDER BY name"
    )
    .bind(lab_id)
    .fetch_all(db)
    .await
}

pub async fn transaction_displays(
    db: &Database,
    limit: Option<i64>,
) -> Result<Vec<TransactionDisplay>, sqlx::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(TRANSACTION_DISPLAY_SELECT);
    query.push(" ORDER BY t.issue_date DESC, t.id DESC");
    if let Some(limit) = limit {
        query.push(" LIMIT ").push_bind(limit);
    }

    query.build_query_as::<TransactionDisplay>().fetch_all(db).await
}

pub async fn find_transaction_display(
    db: &Database,
    id: i32,
) -> Result<Option<TransactionDisplay>, sqlx::Error> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(TRANSACTION_DISPLAY_SELECT);
    query.push(" WHERE t.id = ").push_bind(id);

    query.build_query_as::<TransactionDisplay>().fetch_optional(db).await
}

pub async fn status_counts(db: &Database) -> Result<Vec<StatusCount>, sqlx::Error> {
    sqlx::query_as::<_, StatusCount>(
        "SELECT status, COUNT(*) AS count FROM transactions GROUP BY status ORDER BY status"
    )
    .fetch_all(db)
    .await
}

async fn count(db: &Database, sql: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(db).await
}

pub async fn dashboard_stats(db: &Database) -> Result<DashboardStats, sqlx::Error> {
    let lab_stats = sqlx::query_as::<_, LabComponentCount>(
        r#"
        SELECT l.name AS lab_name, COUNT(c.id) AS component_count
        FROM labs l
        LEFT JOIN components c ON c.lab_id = l.id
        GROUP BY l.id, l.name
        ORDER BY l.name
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(DashboardStats {
        total_components: count(db, "SELECT COUNT(*) FROM components").await?,
        total_transactions: count(db, "SELECT COUNT(*) FROM transactions").await?,
        total_labs: count(db, "SELECT COUNT(*) FROM labs").await?,
        total_categories: count(db, "SELECT COUNT(*) FROM categories").await?,
        pending_returns: sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transactions WHERE status = ANY($1)",
        )
        .bind(TransactionStatus::open_labels())
        .fetch_one(db)
        .await?,
        low_stock_components: count(
            db,
            "SELECT COUNT(*) FROM components WHERE quantity <= min_stock_level",
        )
        .await?,
        out_of_stock_components: count(db, "SELECT COUNT(*) FROM components WHERE quantity <= 0")
            .await?,
        lab_stats,
        recent_transactions: transaction_displays(db, Some(5)).await?,
    })
}
