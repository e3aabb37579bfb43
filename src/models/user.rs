// src/models/user.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub login: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PublicUser {
    pub id: i32,
    pub username: String,
    pub login: String,
    pub role: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            login: user.login,
            role: user.role,
        }
    }
}
