//! Persistence gateway: the boundary between the core and a backing store.
//!
//! The core only ever hands over compiled statements (`?` placeholders plus
//! ordered [`Value`] parameters). Errors raised by an implementation are
//! propagated unchanged.

mod pg;
mod recording;

pub use pg::{PgGateway, PgGatewayConfig};
pub use recording::{RecordedStatement, RecordingGateway};

use crate::error::OrmResult;
use crate::value::{Value, ValueRow};

/// A backing store able to execute compiled statements.
///
/// Implemented by [`PgGateway`] for PostgreSQL and by [`RecordingGateway`] for
/// tests. Any type used by records and mappers must be shareable across tasks.
pub trait PersistenceGateway: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = OrmResult<Vec<ValueRow>>> + Send;

    /// Key generated by the store for the most recent insert, if any.
    fn last_insert_id(&self) -> impl std::future::Future<Output = OrmResult<Option<Value>>> + Send;
}
