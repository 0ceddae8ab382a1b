use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};

pub type Database = Pool<Postgres>;

pub async fn create_database_pool(database_url: &str, max_connections: u32) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await?;

    log::info!("Connected to database successfully");
    Ok(pool)
}

pub async fn run_migrations(db: &Database) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(db).await?;
    log::info!("Database migrations applied");
    Ok(())
}

/// Foreign key violation: a delete hit a row still referenced elsewhere,
/// or a write pointed at a row that does not exist.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}

/// Pool for tests that need a real server, or `None` when
/// `LABSTOCK_TEST_DATABASE_URL` is unset. The database must be disposable.
#[cfg(test)]
pub async fn test_database() -> Option<Database> {
    let Ok(url) = std::env::var("LABSTOCK_TEST_DATABASE_URL") else {
        eprintln!("SKIP: set LABSTOCK_TEST_DATABASE_URL to run");
        return None;
    };
    let db = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .expect("test database should accept connections");
    run_migrations(&db).await.expect("migrations should apply");
    Some(db)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_database_errors_can_be_foreign_key_violations() {
        assert!(!is_foreign_key_violation(&sqlx::Error::RowNotFound));
        assert!(!is_foreign_key_violation(&sqlx::Error::PoolTimedOut));
    }

    #[tokio::test]
    #[ignore = "requires a disposable PostgreSQL database; opt in via LABSTOCK_TEST_DATABASE_URL"]
    async fn missing_parent_row_is_a_foreign_key_violation() {
        let Some(db) = test_database().await else { return };

        let err = sqlx::query("INSERT INTO categories (name, lab_id) VALUES ('orphan', $1)")
            .bind(i32::MAX)
            .execute(&db)
            .await
            .unwrap_err();
        assert!(is_foreign_key_violation(&err));
    }
}
