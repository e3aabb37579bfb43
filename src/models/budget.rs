// src/models/budget.rs
use serde::{Deserialize, Serialize};

use super::{expense::ExpenseResponse, income::IncomeResponse};

// Not persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default)]
    pub incomes: Vec<IncomeResponse>,
    #[serde(default)]
    pub expenses: Vec<ExpenseResponse>,
}
