use crate::auth::TokenAuthority;
use crate::config::ItemsConfig;
use crate::database::ItemRepository;
use crate::database::sqlite::SqliteRepository;
use crate::measure::{FailurePolicy, HarnessConfig, TimeUnit, TimingHarness};
use anyhow::{Context, Result};
use axum::Router;
use axum::extract::FromRef;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod auth;
pub mod config;
mod database;
mod db;
mod domain;
mod features;
mod measure;
mod tracing_setup;

#[cfg(test)]
mod tests;

#[derive(Clone)]
pub struct AppState {
    pub items: Arc<dyn ItemRepository>,
    pub tokens: Arc<TokenAuthority>,
}

impl FromRef<AppState> for Arc<TokenAuthority> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

#[derive(Parser)]
#[command(name = "items-api", version, about = "CRUD API over the items table, plus query timing")]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Time select, insert, update and delete against the items table
    Measure(MeasureArgs),
    /// Print a signed access token for the given subject
    Token {
        #[arg(long)]
        subject: String,
    },
}

#[derive(Args)]
struct MeasureArgs {
    /// Record counts to measure, in order
    #[arg(long, value_delimiter = ',', default_values_t = measure::DEFAULT_RECORD_COUNTS)]
    records: Vec<usize>,

    /// Concurrent chunk workers (default: cpus + 4, at most 32)
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, value_enum, default_value_t = FailurePolicy::AbortAll)]
    policy: FailurePolicy,

    #[arg(long, value_enum, default_value_t = TimeUnit::Seconds)]
    unit: TimeUnit,

    /// Ids per concurrent update/delete statement
    #[arg(long, default_value_t = measure::DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Rows per multi-row insert statement
    #[arg(long, default_value_t = measure::DEFAULT_INSERT_BATCH_SIZE)]
    insert_batch_size: usize,
}

/// The full application: item routes plus request tracing.
pub fn app(state: AppState) -> Router {
    features::items::items_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn token_authority(config: &ItemsConfig) -> Result<TokenAuthority> {
    Ok(TokenAuthority::new(
        config.require_jwt_secret()?,
        chrono::Duration::minutes(config.token_ttl_minutes),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // determine environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    tracing_setup::init_tracing(cli.debug)?;

    let config = ItemsConfig::from_env();

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Measure(args) => run_measure(config, args).await,
        Command::Token { subject } => {
            let token = token_authority(&config)?.issue(&subject)?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve(config: ItemsConfig) -> Result<()> {
    let tokens = Arc::new(token_authority(&config)?);
    let pool = db::connect_pool(&config.database_url, config.max_connections).await?;

    let state = AppState {
        items: Arc::new(SqliteRepository::new(pool)),
        tokens,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Server listening on http://{}", config.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

async fn run_measure(config: ItemsConfig, args: MeasureArgs) -> Result<()> {
    let harness_config = HarnessConfig {
        insert_batch_size: args.insert_batch_size,
        chunk_size: args.chunk_size,
        workers: args.workers.unwrap_or_else(measure::default_workers),
        policy: args.policy,
    };

    // every worker holds a connection while its chunk runs
    let max_connections = config
        .max_connections
        .max(harness_config.workers as u32 + 1);
    let pool = db::connect_pool(&config.database_url, max_connections).await?;

    let harness = TimingHarness::new(pool, harness_config);
    let rows = measure::run_measurements(&harness, &args.records)
        .await
        .context("Measurement failed")?;

    println!("\nResults:");
    print!("{}", measure::render_table(&rows, args.unit));
    Ok(())
}
