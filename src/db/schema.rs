// src/db/schema.rs
use sqlx::{Executor, Postgres};

const SCHEMA: &str = include_str!("../../db/schema.sql");

pub async fn install<'e, E>(executor: E) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    // A bare &str runs unprepared, so the multi-statement script goes through.
    executor.execute(SCHEMA).await?;
    Ok(())
}
