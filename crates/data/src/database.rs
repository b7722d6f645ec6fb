use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};

/// Shared connection pool. One instance lives for the daemon's lifetime;
/// every write in the system goes through it.
#[derive(Debug, Clone)]
pub struct DatabaseClient {
    pool: PgPool,
}

impl DatabaseClient {
    /// Connects to the configured `PostgreSQL` database.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Runs the idempotent schema migration.
    ///
    /// # Errors
    /// Returns an error if any migration statement fails.
    pub async fn migrate(&self) -> Result<()> {
        crate::schema::migrate(&self.pool).await
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Closes the pool. Called once on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
