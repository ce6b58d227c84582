//! MS SQL Server connection implementation using tiberius

use async_trait::async_trait;
use pwprobe_core::{
    Connection, ConnectionConfig, ConnectionStyle, ProbeError, QueryResult, Result, Value,
    detect_style, parse_connection_string,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, Row as TiberiusRow};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// SQL Server error number for a rejected login
const LOGIN_FAILED: u32 = 18456;

/// MS SQL Server connection errors
#[derive(Debug, thiserror::Error)]
pub enum MssqlConnectionError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("tiberius rejected the connection string: {0}")]
    InvalidConnectionString(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MssqlConnectionError {
    /// Sort a tiberius error into login rejection or plain connection failure
    pub(crate) fn from_login(err: tiberius::error::Error) -> Self {
        match &err {
            tiberius::error::Error::Server(token) if token.code() == LOGIN_FAILED => {
                MssqlConnectionError::AuthenticationFailed(token.message().to_string())
            }
            _ => MssqlConnectionError::ConnectionFailed(err.to_string()),
        }
    }
}

impl From<MssqlConnectionError> for ProbeError {
    fn from(err: MssqlConnectionError) -> Self {
        match err {
            MssqlConnectionError::AuthenticationFailed(msg) => ProbeError::Authentication(msg),
            MssqlConnectionError::QueryFailed(msg) => ProbeError::Query(msg),
            MssqlConnectionError::InvalidConnectionString(msg) => ProbeError::Configuration(msg),
            MssqlConnectionError::Io(e) => ProbeError::Io(e),
            other => ProbeError::Connection(other.to_string()),
        }
    }
}

/// Build the tiberius config for a structured connection config
pub(crate) fn tiberius_config(config: &ConnectionConfig) -> Config {
    let mut tds = Config::new();
    tds.host(&config.server);
    tds.port(config.port);

    if !config.database.is_empty() {
        tds.database(&config.database);
    }

    if config.options.trust_server_certificate {
        tds.trust_cert();
    }

    tds.encryption(if config.options.encrypt {
        EncryptionLevel::Required
    } else {
        EncryptionLevel::Off
    });

    tds.authentication(AuthMethod::sql_server(&config.user, &config.password));
    tds
}

/// Build the tiberius config from a connection string.
///
/// Strings with a `scheme://` prefix go through tiberius's JDBC parser and
/// bare `key=value` strings through its ADO.NET parser, so brace escapes are
/// undone by the client library itself. tiberius reads no URLs; those are
/// decoded by the shared parser first.
pub(crate) fn tiberius_config_from_str(conn_str: &str) -> Result<Config> {
    let conn_str = conn_str.trim();
    if detect_style(conn_str) == ConnectionStyle::Url {
        return Ok(tiberius_config(&parse_connection_string(conn_str)?));
    }

    let parsed = if conn_str.contains("://") {
        Config::from_jdbc_string(&format!("jdbc:{}", conn_str))
    } else {
        Config::from_ado_string(conn_str)
    };
    parsed.map_err(|e| MssqlConnectionError::InvalidConnectionString(e.to_string()).into())
}

/// MS SQL Server connection using tiberius
pub struct MssqlConnection {
    client: Mutex<Client<Compat<TcpStream>>>,
    closed: AtomicBool,
    addr: String,
}

impl MssqlConnection {
    /// Open a connection with the raw password from `config`
    pub async fn connect(
        config: &ConnectionConfig,
    ) -> std::result::Result<Self, MssqlConnectionError> {
        Self::connect_with(tiberius_config(config)).await
    }

    /// Open a connection from an already built tiberius config
    #[tracing::instrument(skip(tds), fields(addr = %tds.get_addr()))]
    pub async fn connect_with(tds: Config) -> std::result::Result<Self, MssqlConnectionError> {
        tracing::debug!("connecting to MS SQL Server");

        let addr = tds.get_addr();
        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| MssqlConnectionError::ConnectionFailed(e.to_string()))?;

        tcp.set_nodelay(true)?;

        let client = Client::connect(tds, tcp.compat_write())
            .await
            .map_err(MssqlConnectionError::from_login)?;

        tracing::debug!("successfully connected to MS SQL Server");

        Ok(Self {
            client: Mutex::new(client),
            closed: AtomicBool::new(false),
            addr,
        })
    }

    fn ensure_not_closed(&self) -> std::result::Result<(), MssqlConnectionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MssqlConnectionError::ConnectionClosed);
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MssqlConnection {
    fn driver_name(&self) -> &str {
        "mssql"
    }

    async fn query(&self, sql: &str) -> Result<QueryResult> {
        self.ensure_not_closed()?;
        let start = std::time::Instant::now();

        let mut client = self.client.lock().await;

        let stream = client
            .simple_query(sql)
            .await
            .map_err(|e| MssqlConnectionError::QueryFailed(e.to_string()))?;

        let tib_rows = stream
            .into_first_result()
            .await
            .map_err(|e| MssqlConnectionError::QueryFailed(e.to_string()))?;

        let columns = tib_rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows = tib_rows.into_iter().map(tiberius_row_to_values).collect();

        let execution_time_ms = start.elapsed().as_millis() as u64;
        tracing::debug!(duration_ms = execution_time_ms, "query completed");

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms,
        })
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("MS SQL Server connection closed");
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn tiberius_row_to_values(row: TiberiusRow) -> Vec<Value> {
    row.into_iter().map(column_data_to_value).collect()
}

/// Convert tiberius ColumnData to a probe Value
pub(crate) fn column_data_to_value(col_data: ColumnData<'static>) -> Value {
    match col_data {
        ColumnData::Bit(Some(v)) => Value::Bool(v),
        ColumnData::U8(Some(v)) => Value::Int64(v as i64),
        ColumnData::I16(Some(v)) => Value::Int64(v as i64),
        ColumnData::I32(Some(v)) => Value::Int64(v as i64),
        ColumnData::I64(Some(v)) => Value::Int64(v),
        ColumnData::F32(Some(v)) => Value::Float64(v as f64),
        ColumnData::F64(Some(v)) => Value::Float64(v),
        ColumnData::String(Some(v)) => Value::String(v.into_owned()),
        ColumnData::Guid(Some(v)) => Value::String(v.to_string()),
        ColumnData::Numeric(Some(v)) => Value::String(v.to_string()),
        ColumnData::Xml(Some(v)) => Value::String(v.into_owned().into_string()),
        // Probe queries only select scalars; anything else is reported by type
        ColumnData::Binary(Some(v)) => Value::String(format!("<{} bytes>", v.len())),
        ColumnData::DateTime(Some(_))
        | ColumnData::SmallDateTime(Some(_))
        | ColumnData::DateTime2(Some(_))
        | ColumnData::DateTimeOffset(Some(_))
        | ColumnData::Date(Some(_))
        | ColumnData::Time(Some(_)) => Value::String("<temporal>".to_string()),
        _ => Value::Null,
    }
}

impl std::fmt::Debug for MssqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MssqlConnection")
            .field("addr", &self.addr)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
