// src/services/mod.rs
pub mod auth;
pub mod budget;
pub mod seed;
