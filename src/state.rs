// src/state.rs
use sqlx::PgPool;

// Shared by every handler through Extension<Arc<AppState>>
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: String,
    pub bcrypt_cost: u32,
    // Verified against when the login is unknown, so both paths cost one bcrypt run
    pub dummy_hash: String,
}

impl AppState {
    pub fn new(pool: PgPool, jwt_secret: String, bcrypt_cost: u32) -> Result<Self, bcrypt::BcryptError> {
        Ok(AppState {
            pool,
            jwt_secret,
            bcrypt_cost,
            dummy_hash: bcrypt::hash("budgeting-dummy-password", bcrypt_cost)?,
        })
    }
}
