use modelgen_core::config::GenConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// Empty means "allow any origin" (the dashboard is served from
    /// arbitrary local hosts during development).
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Uploads and
    /// submissions respond immediately; provider work happens in the
    /// background, so a short timeout is safe.
    pub request_timeout_secs: u64,
    /// Provider and pipeline configuration.
    pub gen: GenConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default     |
    /// |------------------------|-------------|
    /// | `HOST`                 | `0.0.0.0`   |
    /// | `PORT`                 | `8000`      |
    /// | `CORS_ORIGINS`         | (empty)     |
    /// | `REQUEST_TIMEOUT_SECS` | `30`        |
    ///
    /// Provider variables are documented on [`GenConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            gen: GenConfig::from_env(),
        }
    }
}
