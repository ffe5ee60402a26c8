use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub jwt_secret: Option<String>,
    pub jwt_audience: Option<String>,
    pub max_upload_bytes: usize,
    /// Keep objects and metadata in process memory instead of SQLite + disk.
    pub in_memory: bool,
}

/// What the process should do after loading configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Serve,
    Migrate,
    Reconcile,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Browser-based file manager over a flat object store")]
pub struct Args {
    /// Host to bind to (overrides FILE_MANAGER_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FILE_MANAGER_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where object payloads are stored (overrides FILE_MANAGER_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides FILE_MANAGER_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Expected token audience (overrides FILE_MANAGER_JWT_AUDIENCE)
    #[arg(long)]
    pub jwt_audience: Option<String>,

    /// Largest accepted upload in bytes (overrides FILE_MANAGER_MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<usize>,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long, conflicts_with_all = ["migrate", "reconcile"])]
    pub in_memory: bool,

    /// Run migrations and exit
    #[arg(long, conflicts_with = "reconcile")]
    pub migrate: bool,

    /// Drop metadata records whose objects no longer exist, then exit
    #[arg(long)]
    pub reconcile: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and run mode.
    pub fn from_env_and_args() -> Result<(Self, RunMode)> {
        Self::resolve(Args::parse(), |key| env::var(key))
    }

    /// Merge `args` over values looked up through `lookup`, then defaults.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<(Self, RunMode)>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let optional = |key: &str| -> Result<Option<String>> {
            match lookup(key) {
                Ok(value) => Ok(Some(value)),
                Err(env::VarError::NotPresent) => Ok(None),
                Err(err) => Err(err).with_context(|| format!("reading {}", key)),
            }
        };

        // --- Environment fallback ---
        let env_host = optional("FILE_MANAGER_HOST")?.unwrap_or_else(|| "0.0.0.0".into());
        let env_port = match optional("FILE_MANAGER_PORT")? {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FILE_MANAGER_PORT value `{}`", value))?,
            None => 3000,
        };
        let env_storage =
            optional("FILE_MANAGER_STORAGE_DIR")?.unwrap_or_else(|| "./data/objects".into());
        let env_db = optional("FILE_MANAGER_DATABASE_URL")?
            .unwrap_or_else(|| "sqlite://./data/meta/file_manager.db".into());
        let env_max_upload = match optional("FILE_MANAGER_MAX_UPLOAD_BYTES")? {
            Some(value) => value.parse::<usize>().with_context(|| {
                format!("parsing FILE_MANAGER_MAX_UPLOAD_BYTES value `{}`", value)
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            jwt_secret: optional("FILE_MANAGER_JWT_SECRET")?.filter(|s| !s.is_empty()),
            jwt_audience: args
                .jwt_audience
                .or(optional("FILE_MANAGER_JWT_AUDIENCE")?),
            max_upload_bytes: args.max_upload_bytes.unwrap_or(env_max_upload),
            in_memory: args.in_memory,
        };

        let mode = if args.migrate {
            RunMode::Migrate
        } else if args.reconcile {
            RunMode::Reconcile
        } else {
            RunMode::Serve
        };

        Ok((cfg, mode))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
