// src/models/expense.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::now_default;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExpenseCreate {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[validate(length(min = 1, max = 255, message = "Description must be between 1 and 255 characters"))]
    pub description: String,
    #[serde(default = "now_default")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExpenseCreate {
    pub fn created_at_or_now(&self) -> DateTime<Utc> {
        self.created_at.unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Expense {
    pub id: i32,
    pub amount: f64,
    pub description: String,
    pub user_id: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ExpenseResponse {
    pub id: i32,
    pub amount: f64,
    pub description: String,
    pub user_id: i32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Expense> for ExpenseResponse {
    fn from(expense: Expense) -> Self {
        ExpenseResponse {
            id: expense.id,
            amount: expense.amount,
            description: expense.description,
            user_id: expense.user_id,
            created_at: expense.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validates_like_income_create() {
        let ok: ExpenseCreate =
            serde_json::from_value(json!({ "amount": 12.5, "description": "groceries" })).unwrap();
        assert!(ok.validate().is_ok());

        let negative: ExpenseCreate =
            serde_json::from_value(json!({ "amount": -1.0, "description": "refund?" })).unwrap();
        assert!(negative.validate().is_err());

        let blank: ExpenseCreate =
            serde_json::from_value(json!({ "amount": 3.0, "description": "" })).unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn explicit_null_created_at_means_now_at_insert() {
        let parsed: ExpenseCreate = serde_json::from_value(
            json!({ "amount": 3.0, "description": "coffee", "created_at": null }),
        )
        .unwrap();
        assert_eq!(parsed.created_at, None);
        let before = Utc::now();
        assert!(parsed.created_at_or_now() >= before);
    }

    #[test]
    fn given_created_at_is_kept() {
        let parsed: ExpenseCreate = serde_json::from_value(json!({
            "amount": 3.0,
            "description": "coffee",
            "created_at": "2024-03-01T08:30:00Z"
        }))
        .unwrap();
        assert_eq!(
            parsed.created_at_or_now().to_rfc3339(),
            "2024-03-01T08:30:00+00:00"
        );
    }
}
