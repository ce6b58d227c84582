//! Database driver and connection traits

use crate::{ConnectionConfig, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// A single cell value returned by a probe query
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            Value::Bool(v) => Some(*v as i64),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
        }
    }
}

/// Rows returned by a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// First column of the first row, if any
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// An open database connection
#[async_trait]
pub trait Connection: Send + Sync {
    /// Driver that opened this connection
    fn driver_name(&self) -> &str;

    /// Run a query and collect its first result set
    async fn query(&self, sql: &str) -> Result<QueryResult>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// A database adapter that turns a config or connection string into a connection
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier (e.g. "mssql")
    fn id(&self) -> &'static str;

    /// Human readable name
    fn display_name(&self) -> &'static str;

    fn default_port(&self) -> u16;

    /// Open a connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;

    /// Parse a connection string into a configuration
    fn parse_connection_string(&self, conn_str: &str) -> Result<ConnectionConfig> {
        Ok(crate::parse_connection_string(conn_str)?)
    }

    /// Open a connection from a connection string.
    ///
    /// The default parses with [`DatabaseDriver::parse_connection_string`].
    /// Drivers whose client library reads connection strings itself should
    /// hand the string over untouched.
    async fn connect_str(&self, conn_str: &str) -> Result<Arc<dyn Connection>> {
        let config = self.parse_connection_string(conn_str)?;
        self.connect(&config).await
    }

    /// Connect and run the driver's liveness query
    async fn test_connection(&self, config: &ConnectionConfig) -> Result<QueryResult> {
        liveness(self.connect(config).await?).await
    }

    /// Like [`DatabaseDriver::test_connection`], starting from a connection string
    async fn test_connection_str(&self, conn_str: &str) -> Result<QueryResult> {
        liveness(self.connect_str(conn_str).await?).await
    }
}

async fn liveness(conn: Arc<dyn Connection>) -> Result<QueryResult> {
    let result = conn.query("SELECT 1 AS ok").await;
    conn.close().await?;
    result
}
