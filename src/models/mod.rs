// src/models/mod.rs
pub mod budget;
pub mod expense;
pub mod income;
pub mod user;

use chrono::{DateTime, Utc};

pub use budget::Budget;
pub use expense::{Expense, ExpenseCreate, ExpenseResponse};
pub use income::{Income, IncomeCreate, IncomeResponse};
pub use user::{PublicUser, User};

fn now_default() -> Option<DateTime<Utc>> {
    Some(Utc::now())
}
