//! PostgreSQL gateway over `tokio-postgres`.

use super::PersistenceGateway;
use crate::error::{OrmError, OrmResult};
use crate::qb::placeholder;
use crate::value::{Value, ValueRow};
use std::time::{Duration, Instant};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{GenericClient, Row};

/// Configuration for [`PgGateway`].
#[derive(Debug, Clone, Default)]
pub struct PgGatewayConfig {
    /// Per-statement timeout.
    pub query_timeout: Option<Duration>,
    /// Emit elapsed time and row count at `debug` after each statement.
    ///
    /// The statement text itself is logged once, by [`Statement`](crate::qb::Statement).
    pub log_timing: bool,
}

impl PgGatewayConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set query timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.query_timeout = Some(duration);
        self
    }

    /// Enable per-statement timing logs.
    pub fn log_timing(mut self, enabled: bool) -> Self {
        self.log_timing = enabled;
        self
    }
}

/// Executes statements on a `tokio_postgres` client or transaction.
///
/// `?` placeholders are renumbered to `$1, $2, ...` and [`Value`] parameters
/// are bound through their `ToSql` impl.
///
/// ```ignore
/// let (client, conn) = tokio_postgres::connect(&url, NoTls).await?;
/// tokio::spawn(conn);
/// let gateway = PgGateway::new(&client);
/// record.save(&gateway).await?;
/// ```
pub struct PgGateway<'a, C> {
    client: &'a C,
    config: PgGatewayConfig,
}

impl<'a, C> PgGateway<'a, C>
where
    C: GenericClient + Sync,
{
    pub fn new(client: &'a C) -> Self {
        Self::with_config(client, PgGatewayConfig::default())
    }

    pub fn with_config(client: &'a C, config: PgGatewayConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PgGatewayConfig {
        &self.config
    }

    fn log_completed(&self, op: &'static str, started: Instant, rows: u64) {
        if self.config.log_timing {
            tracing::debug!(
                target: "datamapper.sql",
                op,
                rows,
                elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
                "completed"
            );
        }
    }

    /// Apply the configured timeout, leaving driver errors unmapped.
    async fn timed<T, F>(&self, fut: F) -> OrmResult<Result<T, tokio_postgres::Error>>
    where
        F: std::future::Future<Output = Result<T, tokio_postgres::Error>>,
    {
        match self.config.query_timeout {
            Some(d) => tokio::time::timeout(d, fut)
                .await
                .map_err(|_| OrmError::Timeout(d)),
            None => Ok(fut.await),
        }
    }

    async fn with_timeout<T, F>(&self, fut: F) -> OrmResult<T>
    where
        F: std::future::Future<Output = Result<T, tokio_postgres::Error>>,
    {
        self.timed(fut).await?.map_err(OrmError::from_db_error)
    }
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn decode_row(row: &Row) -> OrmResult<ValueRow> {
    let mut out = ValueRow::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value: Value = row
            .try_get(idx)
            .map_err(|e| OrmError::decode(column.name(), e.to_string()))?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

impl<C> PersistenceGateway for PgGateway<'_, C>
where
    C: GenericClient + Sync,
{
    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let exec_sql = placeholder::to_numbered(sql);
        let refs = param_refs(params);
        let started = Instant::now();
        let affected = self
            .with_timeout(self.client.execute(exec_sql.as_str(), &refs))
            .await?;
        self.log_completed("execute", started, affected);
        Ok(affected)
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<ValueRow>> {
        let exec_sql = placeholder::to_numbered(sql);
        let refs = param_refs(params);
        let started = Instant::now();
        let rows = self
            .with_timeout(self.client.query(exec_sql.as_str(), &refs))
            .await?;
        self.log_completed("query", started, rows.len() as u64);
        rows.iter().map(decode_row).collect()
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        match self.timed(self.client.query_one("SELECT lastval()", &[])).await? {
            Ok(row) => Ok(Some(
                row.try_get::<_, Value>(0)
                    .map_err(|e| OrmError::decode("lastval", e.to_string()))?,
            )),
            // no sequence used in this session
            Err(e) if e.code() == Some(&SqlState::OBJECT_NOT_IN_PREREQUISITE_STATE) => Ok(None),
            Err(e) => Err(OrmError::from_db_error(e)),
        }
    }
}
