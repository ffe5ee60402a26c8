use anyhow::Result;
use axum::{Router, extract::DefaultBodyLimit};
use config::{AppConfig, RunMode};
use handlers::AppState;
use services::{
    disk_store::DiskObjectStore,
    file_manager::FileManager,
    identity::JwtIdentityVerifier,
    metadata_store::{MemoryMetadataStore, SqliteMetadataStore},
    object_store::MemoryObjectStore,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;

const INIT_MIGRATION: &str = include_str!("../migrations/0001_init.sql");

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + run mode ---
    let (cfg, mode) = AppConfig::from_env_and_args()?;

    tracing::info!(
        "Starting file-manager on {} (storage {}, database {}, mode {:?})",
        cfg.addr(),
        cfg.storage_dir,
        cfg.database_url,
        mode
    );

    // --- Initialize core services ---
    let manager = if cfg.in_memory {
        tracing::warn!("Using in-memory stores; nothing will survive a restart");
        FileManager::new(
            Arc::new(MemoryObjectStore::new()),
            Arc::new(MemoryMetadataStore::new()),
        )
    } else {
        let db = open_database(&cfg).await?;

        // Schema statements are idempotent, so serving always applies them.
        run_migrations(&db).await?;
        if mode == RunMode::Migrate {
            tracing::info!("Database migration complete.");
            return Ok(());
        }

        let objects = Arc::new(DiskObjectStore::new(db.clone(), cfg.storage_dir.clone()));
        let metadata = Arc::new(SqliteMetadataStore::new(db));
        let manager = FileManager::new(objects, metadata);

        if mode == RunMode::Reconcile {
            let report = manager.reconcile().await?;
            tracing::info!(
                "Reconciliation complete: scanned {}, removed {} directory and {} file records",
                report.scanned,
                report.directories_removed,
                report.files_removed
            );
            return Ok(());
        }
        manager
    };

    let Some(secret) = cfg.jwt_secret.as_deref() else {
        anyhow::bail!("FILE_MANAGER_JWT_SECRET must be set to serve requests");
    };
    let verifier = Arc::new(JwtIdentityVerifier::new(secret, cfg.jwt_audience.as_deref()));
    let state = AppState::new(manager, verifier);

    // --- Build router ---
    let app: Router = routes::routes::routes()
        .layer(DefaultBodyLimit::max(cfg.max_upload_bytes))
        .with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Prepare the storage directory and database file, then connect.
async fn open_database(cfg: &AppConfig) -> Result<Arc<SqlitePool>> {
    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    // Create parent directory if needed
    let db_path_obj = Path::new(db_path);
    if let Some(parent) = db_path_obj.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }

    // SQLite will not create the file itself without `mode=rwc`.
    if !db_path_obj.exists() {
        match fs::OpenOptions::new().create(true).write(true).open(db_path) {
            Ok(_) => tracing::debug!("Created database file {}", db_path),
            Err(e) => tracing::warn!("Failed to create database file: {}", e),
        }
    }

    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;
    Ok(Arc::new(db))
}

/// Apply the embedded schema statement by statement.
async fn run_migrations(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = INIT_MIGRATION
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}
