// src/routes/auth.rs
use axum::{
    body::Body,
    extract::Json,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use bcrypt::hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{user::DEFAULT_ROLE, PublicUser},
    services::auth::{self as auth_service, Claims},
    state::AppState,
};

#[derive(Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Username must be between 1 and 100 characters"))]
    username: String,
    #[validate(length(min = 1, max = 64, message = "Login must be between 1 and 64 characters"))]
    login: String,
    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    login: String,
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

// JWT Authentication Middleware
pub async fn auth_middleware(
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header_str| header_str.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized("Missing bearer token"))?;

    let claims = auth_service::decode_token(token, &app_state.jwt_secret).map_err(|e| {
        tracing::debug!(error = ?e, "JWT validation failed");
        AppError::Unauthorized("Invalid token")
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn register(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let hashed_password = hash(&payload.password, app_state.bcrypt_cost)?;
    let user = auth_service::create_user(
        &app_state.pool,
        &payload.username,
        &payload.login,
        &hashed_password,
        DEFAULT_ROLE,
    )
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(format!("Login {} is already taken", payload.login))
        }
        other => AppError::Database(other),
    })?;

    tracing::info!(user_id = user.id, login = %user.login, "user registered");
    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

pub async fn login(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = auth_service::find_user_by_login(&app_state.pool, &payload.login).await?;
    let user = auth_service::check_credentials(user, &payload.password, &app_state.dummy_hash)
        .ok_or(AppError::Unauthorized("Invalid credentials"))?;

    let token = auth_service::issue_token(&user, &app_state.jwt_secret)?;
    Ok(Json(LoginResponse { token }))
}

pub fn current_user_id(claims: &Claims) -> Result<i32, AppError> {
    claims
        .user_id()
        .ok_or(AppError::Unauthorized("Invalid token subject"))
}
