use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, FromRow, PgPool};

use crate::models::{Budget, Expense, Income};

pub trait LedgerEntry: for<'r> FromRow<'r, PgRow> + Send + Unpin {
    const TABLE: &'static str;
}

impl LedgerEntry for Income {
    const TABLE: &'static str = "incomes";
}

impl LedgerEntry for Expense {
    const TABLE: &'static str = "expenses";
}

pub async fn insert_entry<T: LedgerEntry>(
    pool: &PgPool,
    user_id: i32,
    amount: f64,
    description: &str,
    created_at: DateTime<Utc>,
) -> Result<T, sqlx::Error> {
    let sql = format!(
        "INSERT INTO {} (amount, description, user_id, created_at) VALUES ($1, $2, $3, $4)
         RETURNING id, amount, description, user_id, created_at",
        T::TABLE
    );
    sqlx::query_as::<_, T>(&sql)
        .bind(amount)
        .bind(description)
        .bind(user_id)
        .bind(created_at)
        .fetch_one(pool)
        .await
}

pub async fn list_entries<T: LedgerEntry>(pool: &PgPool, user_id: i32) -> Result<Vec<T>, sqlx::Error> {
    let sql = format!(
        "SELECT id, amount, description, user_id, created_at FROM {}
         WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
        T::TABLE
    );
    sqlx::query_as::<_, T>(&sql).bind(user_id).fetch_all(pool).await
}

pub async fn budget_for_user(pool: &PgPool, user_id: i32) -> Result<Budget, sqlx::Error> {
    let incomes = list_entries::<Income>(pool, user_id).await?;
    let expenses = list_entries::<Expense>(pool, user_id).await?;
    Ok(Budget {
        incomes: incomes.into_iter().map(Into::into).collect(),
        expenses: expenses.into_iter().map(Into::into).collect(),
    })
}
