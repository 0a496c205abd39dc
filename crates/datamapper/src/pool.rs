//! Connection pool helper (feature `pool`).

use crate::error::{OrmError, OrmResult};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::NoTls;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

/// Pool sizing and recycling.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_size: usize,
    /// Run a test query before handing out a recycled connection.
    pub verify_on_recycle: bool,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 16,
            verify_on_recycle: false,
        }
    }
}

impl PoolOptions {
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn verify_on_recycle(mut self, verify: bool) -> Self {
        self.verify_on_recycle = verify;
        self
    }
}

/// Create a `NoTls` pool from a database URL with default options.
///
/// ```ignore
/// let pool = datamapper::pool::create_pool(&std::env::var("DATABASE_URL")?)?;
/// let client = pool.get().await?;
/// let gateway = PgGateway::new(&**client);
/// ```
pub fn create_pool(database_url: &str) -> OrmResult<Pool> {
    create_pool_with_options(database_url, NoTls, PoolOptions::default())
}

/// Create a pool with a custom TLS connector and options.
pub fn create_pool_with_options<T>(
    database_url: &str,
    tls: T,
    options: PoolOptions,
) -> OrmResult<Pool>
where
    T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
    T::Stream: Sync + Send,
    T::TlsConnect: Sync + Send,
    <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
{
    let pg_config: tokio_postgres::Config = database_url
        .parse()
        .map_err(|e: tokio_postgres::Error| OrmError::Connection(e.to_string()))?;

    let recycling_method = if options.verify_on_recycle {
        RecyclingMethod::Verified
    } else {
        RecyclingMethod::Fast
    };
    let manager = Manager::from_config(pg_config, tls, ManagerConfig { recycling_method });

    tracing::debug!(
        target: "datamapper.sql",
        max_size = options.max_size,
        "creating connection pool"
    );
    Pool::builder(manager)
        .max_size(options.max_size)
        .build()
        .map_err(|e| OrmError::Pool(e.to_string()))
}
