use chrono::NaiveDateTime;
use ledgersort_core::{Category, Money, MoneyOverflow, Transaction, TransactionBatch};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub type DbPool = Pool<Sqlite>;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Overflow(#[from] MoneyOverflow),
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    open(options).await
}

/// A private database that lives as long as the pool.
pub async fn create_memory_db() -> Result<DbPool, sqlx::Error> {
    open(SqliteConnectOptions::from_str("sqlite::memory:")?).await
}

async fn open(options: SqliteConnectOptions) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS batches (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created TEXT NOT NULL,
            source TEXT,
            recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Amounts are stored as decimal text so no precision is lost.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            batch_id INTEGER NOT NULL,
            id INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount TEXT NOT NULL,
            running_balance TEXT,
            category TEXT NOT NULL,
            PRIMARY KEY (batch_id, id),
            FOREIGN KEY (batch_id) REFERENCES batches(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Stores a batch and its transactions atomically, returning the batch row id.
pub async fn record_batch(
    pool: &DbPool,
    batch: &TransactionBatch,
    source: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let batch_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO batches (created, source) VALUES (?, ?) RETURNING id",
    )
    .bind(batch.created.to_rfc3339())
    .bind(source)
    .fetch_one(&mut *tx)
    .await?;

    for t in &batch.transactions {
        sqlx::query(
            "INSERT INTO transactions (batch_id, id, date, description, amount, running_balance, category) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(batch_id)
        .bind(t.id)
        .bind(t.date.format(DATE_FORMAT).to_string())
        .bind(&t.description)
        .bind(t.amount.amount().to_string())
        .bind(t.running_balance.map(|b| b.amount().to_string()))
        .bind(t.category.name())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(
        "Recorded batch {} with {} transactions",
        batch_id,
        batch.transactions.len()
    );
    Ok(batch_id)
}

/// Writes back the categories of transactions already recorded in `batch_id`.
pub async fn update_categories(
    pool: &DbPool,
    batch_id: i64,
    transactions: &[Transaction],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut updated = 0;
    for t in transactions {
        updated += sqlx::query("UPDATE transactions SET category = ? WHERE batch_id = ? AND id = ?")
            .bind(t.category.name())
            .bind(batch_id)
            .bind(t.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    Ok(updated)
}

pub async fn get_transactions(pool: &DbPool, batch_id: i64) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, String, String, Option<String>, String)>(
        "SELECT id, date, description, amount, running_balance, category FROM transactions WHERE batch_id = ? ORDER BY id",
    )
    .bind(batch_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(id, date, description, amount, running_balance, category)| {
            Ok(Transaction {
                id,
                date: NaiveDateTime::parse_from_str(&date, DATE_FORMAT).map_err(decode_error)?,
                description,
                amount: amount.parse::<Money>().map_err(decode_error)?,
                running_balance: running_balance
                    .map(|b| b.parse::<Money>())
                    .transpose()
                    .map_err(decode_error)?,
                category: category.parse::<Category>().map_err(decode_error)?,
            })
        })
        .collect()
}

/// Net amount per category across every recorded batch.
pub async fn category_totals(pool: &DbPool) -> Result<BTreeMap<Category, Money>, LedgerError> {
    let rows = sqlx::query_as::<_, (String, String)>("SELECT category, amount FROM transactions")
        .fetch_all(pool)
        .await?;

    let mut totals = BTreeMap::new();
    for (category, amount) in rows {
        let category = category.parse::<Category>().map_err(decode_error)?;
        let amount = amount.parse::<Money>().map_err(decode_error)?;
        let entry = totals.entry(category).or_insert_with(Money::zero);
        *entry = entry.checked_add(amount)?;
    }
    Ok(totals)
}

fn decode_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}
