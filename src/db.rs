use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::AppConfig;

/// Open the Postgres connection pool, retrying a bounded number of times with
/// a fixed delay. The database coming up slower than the service is the one
/// transient startup failure this absorbs; exhausting the budget is fatal.
pub async fn connect_with_retry(config: &AppConfig) -> anyhow::Result<PgPool> {
    let pool = retry(config.connect_attempts, config.connect_retry_delay, || {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(config.database_url.as_str())
    })
    .await
    .with_context(|| {
        format!(
            "could not connect to the database after {} attempt(s)",
            config.connect_attempts
        )
    })?;

    tracing::info!("Connected to database");
    Ok(pool)
}

/// Run `op` up to `attempts` times, sleeping `delay` between failures.
/// Returns the first success or the last error.
async fn retry<T, E, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                tracing::warn!("Attempt {}/{} failed: {}; retrying", attempt, attempts, e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
