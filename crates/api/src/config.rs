use pagespace_core::ai_undo::types::DEFAULT_REVERSAL_CONCURRENCY;
use pagespace_core::ai_undo::UndoConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except `JWT_SECRET` have defaults suitable for local
/// development.
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
    /// How long to wait for background tasks after the server stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// HS256 secret shared with the auth service that issues access tokens.
    pub jwt_secret: String,
    /// Undo engine tuning.
    pub undo: UndoConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                       |
    /// | `JWT_SECRET`                | required, non-empty        |
    /// | `UNDO_REVERSAL_CONCURRENCY` | `4` (values below 1 become 1) |
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

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let reversal_concurrency: usize = std::env::var("UNDO_REVERSAL_CONCURRENCY")
            .unwrap_or_else(|_| DEFAULT_REVERSAL_CONCURRENCY.to_string())
            .parse()
            .expect("UNDO_REVERSAL_CONCURRENCY must be a valid usize");

        let jwt_secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        assert!(!jwt_secret.is_empty(), "JWT_SECRET must not be empty");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt_secret,
            undo: UndoConfig::new(reversal_concurrency),
        }
    }
}
