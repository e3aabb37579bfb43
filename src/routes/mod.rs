// src/routes/mod.rs
pub mod auth;
pub mod budget;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn create_router() -> Router {
    let protected = Router::new()
        .route("/incomes", post(budget::create_income).get(budget::list_incomes))
        .route("/expenses", post(budget::create_expense).get(budget::list_expenses))
        .route("/budget", get(budget::get_budget))
        .route_layer(middleware::from_fn(auth::auth_middleware));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(protected)
}

pub fn create_app(app_state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", create_router())
        .layer(Extension(app_state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
