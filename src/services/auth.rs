use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::models::User;

pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<i32> {
        self.sub.parse().ok()
    }
}

pub async fn find_user_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, login, hashed_password, role FROM users WHERE login = $1",
    )
    .bind(login)
    .fetch_optional(pool)
    .await
}

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    login: &str,
    hashed_password: &str,
    role: &str,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, login, hashed_password, role) VALUES ($1, $2, $3, $4)
         RETURNING id, username, login, hashed_password, role",
    )
    .bind(username)
    .bind(login)
    .bind(hashed_password)
    .bind(role)
    .fetch_one(pool)
    .await
}

// Runs bcrypt even for an unknown login so response time does not reveal which logins exist
pub fn check_credentials(user: Option<User>, password: &str, dummy_hash: &str) -> Option<User> {
    let hashed = user
        .as_ref()
        .map_or(dummy_hash, |user| user.hashed_password.as_str());
    let password_ok = verify(password, hashed).unwrap_or(false);
    user.filter(|_| password_ok)
}

pub fn issue_token(user: &User, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}
