// src/models/income.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::now_default;

// Owner comes from the bearer token, not the body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IncomeCreate {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 255, message = "Description must be between 1 and 255 characters"))]
    pub description: String,
    #[serde(default = "now_default")]
    pub created_at: Option<DateTime<Utc>>,
}

impl IncomeCreate {
    pub fn created_at_or_now(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Income {
    pub id: i32,
    pub amount: f64,
    pub description: String,
    pub user_id: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct IncomeResponse {
    pub id: i32,
    pub amount: f64,
    pub description: String,
    pub user_id: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Income> for IncomeResponse {
    fn from(income: Income) -> Self {
        IncomeResponse {
            id: income.id,
            amount: income.amount,
            description: income.description,
            user_id: income.user_id,
            created_at: income.created_at,
        }
    }
}
