use std::sync::Arc;

use esfinteres_api::config::{AppConfig, StoreConfig};
use esfinteres_api::state::AppState;
use esfinteres_core::store::SHEETS;
use esfinteres_sheets::{GoogleSheets, MemoryWorkbook, PgWorkbook, SheetStore};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience)
    let _ = dotenvy::dotenv();

    let config =
        AppConfig::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    tracing::info!(store = config.store.name(), "Starting esfinteres API server");
    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set, sessions are signed with the development secret");
    }
    if config.signin_callback_secret.is_none() {
        tracing::warn!("SIGNIN_CALLBACK_SECRET not set, sign-in accepts any caller");
    }
    if config.admin_token.is_none() {
        tracing::info!("ADMIN_TOKEN not set, admin routes are disabled");
    }

    let sheets = connect_store(&config.store).await?;
    let state = AppState::new(sheets, config.clone());
    let app = esfinteres_api::build_app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn connect_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn SheetStore>> {
    match config {
        StoreConfig::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryWorkbook::with_sheets(SHEETS)))
        }
        StoreConfig::Google {
            account,
            spreadsheet_id,
        } => {
            let sheets = GoogleSheets::new(account, spreadsheet_id.as_str())
                .map_err(|e| anyhow::anyhow!("Failed to set up Google Sheets client: {e}"))?;
            tracing::info!(spreadsheet_id = %spreadsheet_id, "Using Google Sheets");
            Ok(Arc::new(sheets))
        }
        StoreConfig::Postgres {
            database_url,
            max_connections,
            min_connections,
        } => {
            let pool = PgPoolOptions::new()
                .max_connections(*max_connections)
                .min_connections(*min_connections)
                .connect(database_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
            tracing::info!("Connected to PostgreSQL");

            let workbook = PgWorkbook::new(pool);
            workbook
                .migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {e}"))?;
            workbook.ensure_sheets(&SHEETS).await?;
            tracing::info!("Database migrations applied");
            Ok(Arc::new(workbook))
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("Received Ctrl+C, shutting down..."); }
        _ = terminate => { tracing::info!("Received SIGTERM, shutting down..."); }
    }
}
