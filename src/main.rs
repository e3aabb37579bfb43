// src/main.rs
mod config;
mod db;
mod error;
mod models;
mod routes;
mod services;
mod state;

use anyhow::Context;
use axum::serve;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::services::seed::{self, SeedData};
use crate::state::AppState;

#[derive(Parser, Debug)]
#[clap(name = "budgeting", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    #[clap(name = "serve")]
    Serve,
    /// Create the tables and seed an empty database with sample data
    #[clap(name = "init-db")]
    InitDb {
        /// Seed data JSON; the builtin sample set is used when omitted
        #[clap(long, env = "SEED_FILE")]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("budgeting=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load config")?;

    let pool = db::connect(&config)
        .await
        .context("failed to connect to the database")?;

    match cli.command {
        Command::InitDb { file } => {
            let data = match file {
                Some(path) => SeedData::from_file(&path)
                    .with_context(|| format!("failed to load seed data from {}", path.display()))?,
                None => SeedData::builtin()?,
            };
            let outcome = seed::seed(&pool, &data, config.bcrypt_cost).await;
            pool.close().await;
            tracing::debug!(?outcome, "init-db finished");
            outcome?;
        }
        Command::Serve => {
            db::schema::install(&pool)
                .await
                .context("failed to install the database schema")?;

            let jwt_secret = config
                .jwt_secret
                .clone()
                .context("JWT_SECRET must be set to serve the API")?;
            let app_state = AppState::new(pool, jwt_secret, config.bcrypt_cost)?;
            let app = routes::create_app(Arc::new(app_state));

            let listener = TcpListener::bind(config.bind_addr)
                .await
                .with_context(|| format!("failed to bind {}", config.bind_addr))?;
            tracing::info!("Server running on {}", config.bind_addr);
            serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}
