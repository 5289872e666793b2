use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres connection string, e.g. "postgres://postgres@localhost/shortly"
    pub database_url: String,

    /// Host to bind the HTTP server to, e.g. "0.0.0.0"
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Public base URL used when generating short links when no forwarding
    /// headers are present, e.g. "https://go.example.com".
    /// Must NOT have a trailing slash.
    pub base_url: String,

    /// Upper bound on the connection pool
    pub max_connections: u32,

    /// How many times to attempt the initial database connection
    pub connect_attempts: u32,

    /// Fixed delay between startup connection attempts
    pub connect_retry_delay: Duration,

    /// Origins allowed by the CORS layer; "*" allows any origin
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    /// Load configuration from environment variables (populated by dotenvy before this is called).
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set in the environment or .env file")?;

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse::<u16>()
            .context("PORT must be a valid port number (1-65535)")?;

        let base_url = std::env::var("BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_owned();

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".into())
            .parse::<u32>()
            .unwrap_or(10);

        let connect_attempts = std::env::var("DB_CONNECT_ATTEMPTS")
            .unwrap_or_else(|_| "5".into())
            .parse::<u32>()
            .unwrap_or(5)
            .max(1);

        let connect_retry_delay = Duration::from_millis(
            std::env::var("DB_CONNECT_RETRY_MS")
                .unwrap_or_else(|_| "2000".into())
                .parse::<u64>()
                .unwrap_or(2000),
        );

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            base_url,
            max_connections,
            connect_attempts,
            connect_retry_delay,
            allowed_origins,
        })
    }
}
