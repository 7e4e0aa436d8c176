//! PostgreSQL connection pool management for shelf.

use std::time::Duration;

use anyhow::anyhow;
use shelf_kernel::settings::DatabaseSettings;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Open the process-wide pool, retrying with exponential backoff.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(settings.retry_delay_secs);

    loop {
        match try_connect(settings).await {
            Ok(pool) => {
                tracing::info!(
                    target: "shelf-db",
                    url = %sanitize_connection_url(&settings.url),
                    max = settings.max_connections,
                    min = settings.min_connections,
                    attempts = attempt + 1,
                    "database connection pool created"
                );
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > settings.max_retries {
                    tracing::error!(
                        target: "shelf-db",
                        "failed to connect to database after {} attempts: {}",
                        settings.max_retries + 1,
                        categorize_db_error(&e)
                    );
                    return Err(anyhow!(
                        "failed to connect to database at '{}': {}",
                        sanitize_connection_url(&settings.url),
                        e
                    ));
                }

                let delay = backoff_delay(base_delay, attempt);

                tracing::warn!(
                    target: "shelf-db",
                    "database connection attempt {} failed: {}. retrying in {:?}",
                    attempt,
                    categorize_db_error(&e),
                    delay
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Delay before retry number `attempt` (1-based): `base`, `2*base`, `4*base`, ...
/// Saturates instead of overflowing for large retry counts.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
}

async fn try_connect(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let pool = pool_options(settings).connect(&settings.url).await?;

    // Fail fast on unreachable servers instead of at the first request.
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

fn pool_options(settings: &DatabaseSettings) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.connection_timeout_secs))
        .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
}

/// Drain and close the pool at shutdown.
pub async fn close(pool: &PgPool) {
    pool.close().await;
    tracing::info!(target: "shelf-db", "database connection pool closed");
}

/// Sanitize connection URL for safe logging (remove password)
pub fn sanitize_connection_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let Some(at_pos) = url.rfind('@') else {
        return url.to_string();
    };
    let credentials_start = scheme_end + 3;
    if at_pos < credentials_start {
        return url.to_string();
    }

    let credentials = &url[credentials_start..at_pos];
    match credentials.find(':') {
        Some(colon) => format!(
            "{}{}:***{}",
            &url[..credentials_start],
            &credentials[..colon],
            &url[at_pos..]
        ),
        None => url.to_string(),
    }
}

/// Categorize database error for operator guidance
fn categorize_db_error(err: &sqlx::Error) -> &'static str {
    use sqlx::Error;
    match err {
        Error::Configuration(_) => "configuration error",
        Error::Database(_) => "database query error",
        Error::Io(_) => "network I/O error, check connectivity",
        Error::Tls(_) => "TLS error, check certificate configuration",
        Error::PoolTimedOut => "connection pool timeout, database may be overloaded",
        Error::PoolClosed => "connection pool closed",
        Error::WorkerCrashed => "database worker crashed",
        _ => "connection error",
    }
}
