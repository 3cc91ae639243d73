//! Pool wrapper and process-lifetime entry point for the MetadataStore.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};

#[derive(Clone)]
pub struct DbClient {
    pub(crate) pool: PgPool,
}

impl DbClient {
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "connected to metadata store");
        Ok(Self { pool })
    }

    /// Applies pending migrations. Called once at process startup.
    pub async fn migrate(&self) -> DbResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }

    /// Verifies connectivity without mutating state (worker selfcheck).
    pub async fn check_connectivity(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
