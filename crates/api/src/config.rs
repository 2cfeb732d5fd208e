use std::path::PathBuf;

use autofit_store::{DATA_DIR_ENV, DEFAULT_DATA_DIR};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Root directory for job records and scratch files.
    pub data_dir: PathBuf,
    /// Path of the worker binary spawned per job.
    pub runner_bin: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                              |
    /// |------------------------|--------------------------------------|
    /// | `HOST`                 | `0.0.0.0`                            |
    /// | `PORT`                 | `3000`                               |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`              |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                                 |
    /// | `AUTOFIT_DATA_DIR`     | `./autofit-data`                     |
    /// | `AUTOFIT_RUNNER_BIN`   | `autofit-runner` next to this binary |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let data_dir =
            PathBuf::from(std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.into()));

        let runner_bin = std::env::var("AUTOFIT_RUNNER_BIN")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_runner_bin());

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            data_dir,
            runner_bin,
        }
    }
}

/// Default worker binary location: `autofit-runner` in the same
/// directory as the running executable (how cargo lays out workspace
/// binaries).
fn default_runner_bin() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("autofit-runner")))
        .unwrap_or_else(|| PathBuf::from("autofit-runner"))
}
