//! MS SQL Server driver implementation

use crate::connection::{MssqlConnection, tiberius_config_from_str};
use async_trait::async_trait;
use pwprobe_core::{Connection, ConnectionConfig, DEFAULT_PORT, DatabaseDriver, Result};
use std::sync::Arc;

/// MS SQL Server database driver
pub struct MssqlDriver;

impl MssqlDriver {
    /// Create a new MS SQL Server driver instance
    pub fn new() -> Self {
        tracing::debug!("MS SQL Server driver initialized");
        Self
    }
}

impl Default for MssqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for MssqlDriver {
    fn id(&self) -> &'static str {
        "mssql"
    }

    fn display_name(&self) -> &'static str {
        "MS SQL Server"
    }

    fn default_port(&self) -> u16 {
        DEFAULT_PORT
    }

    #[tracing::instrument(skip(self, config), fields(server = %config.server, database = %config.database))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let connection = MssqlConnection::connect(config).await?;
        Ok(Arc::new(connection))
    }

    /// Hand the string to tiberius's own parser instead of the shared one
    #[tracing::instrument(skip_all)]
    async fn connect_str(&self, conn_str: &str) -> Result<Arc<dyn Connection>> {
        let tds = tiberius_config_from_str(conn_str)?;
        let connection = MssqlConnection::connect_with(tds).await?;
        Ok(Arc::new(connection))
    }
}
