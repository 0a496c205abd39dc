//! Compiled statement: SQL text with `?` placeholders plus its parameters.

use crate::error::OrmResult;
use crate::gateway::PersistenceGateway;
use crate::value::{Value, ValueRow};
use std::fmt;

/// A compiled statement ready to hand to a [`PersistenceGateway`].
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    /// Execute and return the number of affected rows.
    pub async fn execute(&self, gateway: &impl PersistenceGateway) -> OrmResult<u64> {
        tracing::debug!(
            target: "datamapper.sql",
            sql = %self.sql,
            param_count = self.params.len(),
            "execute"
        );
        gateway.execute(&self.sql, &self.params).await
    }

    /// Execute and return all rows.
    pub async fn query(&self, gateway: &impl PersistenceGateway) -> OrmResult<Vec<ValueRow>> {
        tracing::debug!(
            target: "datamapper.sql",
            sql = %self.sql,
            param_count = self.params.len(),
            "query"
        );
        gateway.query(&self.sql, &self.params).await
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
