// Database connection pooling management

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::{ApiConfig, PoolConfig};
use crate::db::error::DbError;
use crate::db::repositories::TipDepositRepository;

/// Shared SeaORM connection backing the tip deposit store
pub struct DbPool {
    pool: DatabaseConnection,
}

fn connect_options(database_url: &str, pool: &PoolConfig) -> ConnectOptions {
    let mut opts = ConnectOptions::new(database_url.to_owned());
    opts.max_connections(pool.max_connections)
        .min_connections(pool.min_connections.min(pool.max_connections))
        .connect_timeout(pool.connect_timeout)
        .acquire_timeout(pool.acquire_timeout)
        .idle_timeout(pool.idle_timeout)
        .max_lifetime(pool.max_lifetime)
        .sqlx_logging(pool.sqlx_logging);
    opts
}

impl DbPool {
    pub async fn new(config: &ApiConfig) -> Result<Self, DbError> {
        let opts = connect_options(&config.database_url, &config.pool);
        tracing::debug!(
            max_connections = config.pool.max_connections,
            min_connections = config.pool.min_connections,
            "Connecting to tip deposit database"
        );

        let pool = Database::connect(opts)
            .await
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { pool })
    }

    pub fn get_connection(&self) -> &DatabaseConnection {
        &self.pool
    }

    /// Creates the SeaORM-backed tip deposit store
    pub fn tip_deposits(&self) -> TipDepositRepository {
        TipDepositRepository::new(self.pool.clone())
    }
}
