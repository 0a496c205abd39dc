//! In-memory gateway that records statements instead of executing them.

use super::PersistenceGateway;
use crate::error::{OrmError, OrmResult};
use crate::value::{Value, ValueRow};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// One statement seen by a [`RecordingGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Default)]
struct State {
    statements: Vec<RecordedStatement>,
    rows: VecDeque<Vec<ValueRow>>,
    affected: VecDeque<u64>,
    insert_ids: VecDeque<Value>,
    failure: Option<String>,
    insert_id_failure: Option<String>,
}

/// Test double for [`PersistenceGateway`].
///
/// Every `execute`/`query` call is appended to [`statements`](Self::statements).
/// Results are scripted ahead of time: queued row sets for `query`, affected
/// counts for `execute` (default 1), and ids for `last_insert_id`.
///
/// ```ignore
/// let gateway = RecordingGateway::new();
/// gateway.push_insert_id(42);
/// record.save(&gateway).await?;
/// assert_eq!(gateway.statements()[0].sql, r#"INSERT INTO "users" ("email") VALUES (?)"#);
/// ```
#[derive(Debug, Default)]
pub struct RecordingGateway {
    state: Mutex<State>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the result set for the next `query` call.
    pub fn push_rows(&self, rows: Vec<ValueRow>) {
        self.state().rows.push_back(rows);
    }

    /// Queue the affected-row count for the next `execute` call.
    pub fn push_affected(&self, count: u64) {
        self.state().affected.push_back(count);
    }

    /// Queue the id returned by the next `last_insert_id` call.
    pub fn push_insert_id(&self, id: impl Into<Value>) {
        self.state().insert_ids.push_back(id.into());
    }

    /// Make the next `execute` or `query` call fail with [`OrmError::Gateway`].
    ///
    /// The failing statement is still recorded.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state().failure = Some(message.into());
    }

    /// Make the next `last_insert_id` call fail with [`OrmError::Gateway`].
    pub fn fail_next_insert_id(&self, message: impl Into<String>) {
        self.state().insert_id_failure = Some(message.into());
    }

    /// Snapshot of all recorded statements, oldest first.
    pub fn statements(&self) -> Vec<RecordedStatement> {
        self.state().statements.clone()
    }

    pub fn last_statement(&self) -> Option<RecordedStatement> {
        self.state().statements.last().cloned()
    }

    /// Forget recorded statements and any queued results.
    pub fn clear(&self) {
        *self.state() = State::default();
    }

    fn record(&self, sql: &str, params: &[Value]) -> OrmResult<MutexGuard<'_, State>> {
        let mut state = self.state();
        state.statements.push(RecordedStatement {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match state.failure.take() {
            Some(message) => Err(OrmError::Gateway(message)),
            None => Ok(state),
        }
    }
}

impl PersistenceGateway for RecordingGateway {
    async fn execute(&self, sql: &str, params: &[Value]) -> OrmResult<u64> {
        let mut state = self.record(sql, params)?;
        Ok(state.affected.pop_front().unwrap_or(1))
    }

    async fn query(&self, sql: &str, params: &[Value]) -> OrmResult<Vec<ValueRow>> {
        let mut state = self.record(sql, params)?;
        Ok(state.rows.pop_front().unwrap_or_default())
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        let mut state = self.state();
        match state.insert_id_failure.take() {
            Some(message) => Err(OrmError::Gateway(message)),
            None => Ok(state.insert_ids.pop_front()),
        }
    }
}
