use anyhow::{anyhow, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};

use shared_config::AppConfig;

/// Open the connection pool shared by every store in the process.
pub async fn connect(config: &AppConfig) -> Result<PgPool> {
    if !config.is_configured() {
        return Err(anyhow!("DATABASE_URL is not configured"));
    }

    debug!("Connecting to Postgres with up to {} connections", config.database_max_connections);

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    info!("Postgres pool ready");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
