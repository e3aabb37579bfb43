// src/routes/budget.rs
use axum::{extract::Json, http::StatusCode, response::IntoResponse, Extension};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        Budget, Expense, ExpenseCreate, ExpenseResponse, Income, IncomeCreate, IncomeResponse,
    },
    routes::auth::current_user_id,
    services::{auth::Claims, budget as budget_service},
    state::AppState,
};

pub async fn create_income(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<IncomeCreate>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = current_user_id(&claims)?;
    payload.validate()?;

    let income: Income = budget_service::insert_entry(
        &app_state.pool,
        user_id,
        payload.amount,
        &payload.description,
        payload.created_at_or_now(),
    )
    .await?;

    tracing::info!(user_id, income_id = income.id, "income recorded");
    Ok((StatusCode::CREATED, Json(IncomeResponse::from(income))))
}

pub async fn list_incomes(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<IncomeResponse>>, AppError> {
    let user_id = current_user_id(&claims)?;
    let incomes = budget_service::list_entries::<Income>(&app_state.pool, user_id).await?;
    Ok(Json(incomes.into_iter().map(IncomeResponse::from).collect()))
}

pub async fn create_expense(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ExpenseCreate>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = current_user_id(&claims)?;
    payload.validate()?;

    let expense: Expense = budget_service::insert_entry(
        &app_state.pool,
        user_id,
        payload.amount,
        &payload.description,
        payload.created_at_or_now(),
    )
    .await?;

    tracing::info!(user_id, expense_id = expense.id, "expense recorded");
    Ok((StatusCode::CREATED, Json(ExpenseResponse::from(expense))))
}

pub async fn list_expenses(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ExpenseResponse>>, AppError> {
    let user_id = current_user_id(&claims)?;
    let expenses = budget_service::list_entries::<Expense>(&app_state.pool, user_id).await?;
    Ok(Json(expenses.into_iter().map(ExpenseResponse::from).collect()))
}

pub async fn get_budget(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Budget>, AppError> {
    let user_id = current_user_id(&claims)?;
    let budget = budget_service::budget_for_user(&app_state.pool, user_id).await?;
    Ok(Json(budget))
}
