//! Per record type configuration: collection, schema, options and clock.

use crate::clock::{Clock, SystemClock};
use crate::error::{OrmError, OrmResult};
use crate::gateway::PersistenceGateway;
use crate::qb::placeholder::quote_ident;
use crate::qb::{self, Select};
use crate::record::{Record, RecordId, RecordOptions};
use crate::schema::AttributeSchema;
use crate::value::{Value, ValueRow};
use std::sync::Arc;

/// Everything records of one type share.
///
/// A mapper is built once and wrapped in an `Arc`; every [`Record`] keeps a
/// handle to it.
///
/// ```ignore
/// let users = Arc::new(Mapper::new("users", schema));
/// let mut user = users.create([("email", "alice@example.com")])?;
/// user.save(&gateway).await?;
///
/// let found = users.find(&gateway, RecordId::from(Value::Int(1))).await?;
/// ```
#[derive(Debug)]
pub struct Mapper {
    collection: String,
    schema: AttributeSchema,
    readonly: bool,
    clock: Arc<dyn Clock>,
}

impl Mapper {
    pub fn new(collection: impl Into<String>, schema: AttributeSchema) -> Self {
        Self {
            collection: collection.into(),
            schema,
            readonly: false,
            clock: Arc::new(SystemClock),
        }
    }

    /// Refuse `save` and `destroy` on records of this type.
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Clock used to resolve `CURRENT_*` defaults.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    // ==================== Records ====================

    /// Build a fresh record from caller-supplied values.
    pub fn create<I, K, V>(self: &Arc<Self>, values: I) -> OrmResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Record::new(Arc::clone(self), values, RecordOptions::default())
    }

    /// Build a persisted record from a row read back from the store.
    pub fn load(self: &Arc<Self>, row: ValueRow) -> Record {
        Record::from_row(Arc::clone(self), row)
    }

    // ==================== Queries ====================

    /// A `SELECT *` builder on this mapper's collection.
    pub fn select(&self) -> Select {
        qb::select(&self.collection)
    }

    /// Restrict `select` to the row identified by `id`.
    ///
    /// Fails when a key is missing or null, since `key = NULL` never matches.
    pub fn where_id(&self, select: Select, id: &RecordId) -> OrmResult<Select> {
        let keys = self.schema.primary_keys();
        match id {
            RecordId::Single(value) => {
                let [key] = keys else {
                    return Err(OrmError::logic(format!(
                        "{} has a composite primary key",
                        self.collection
                    )));
                };
                if value.is_null() {
                    return Err(null_key(key));
                }
                Ok(select.and_where_one(&format!("{} = ?", quote_ident(key)), value.clone()))
            }
            RecordId::Composite(values) => {
                let mut select = select;
                for key in keys {
                    let value = values.get(key).ok_or_else(|| {
                        OrmError::logic(format!("missing primary key '{}'", key))
                    })?;
                    if value.is_null() {
                        return Err(null_key(key));
                    }
                    select =
                        select.and_where_one(&format!("{} = ?", quote_ident(key)), value.clone());
                }
                Ok(select)
            }
        }
    }

    /// Load the record with the given primary key, if it exists.
    pub async fn find(
        self: &Arc<Self>,
        gateway: &impl PersistenceGateway,
        id: RecordId,
    ) -> OrmResult<Option<Record>> {
        let stmt = self.where_id(self.select(), &id)?.limit(1).compile()?;
        let rows = stmt.query(gateway).await?;
        Ok(rows.into_iter().next().map(|row| self.load(row)))
    }

    /// Run `select` and load every returned row as a persisted record.
    pub async fn fetch_all(
        self: &Arc<Self>,
        gateway: &impl PersistenceGateway,
        select: &Select,
    ) -> OrmResult<Vec<Record>> {
        let stmt = select.compile()?;
        let rows = stmt.query(gateway).await?;
        Ok(rows.into_iter().map(|row| self.load(row)).collect())
    }
}

fn null_key(key: &str) -> OrmError {
    OrmError::logic(format!("primary key '{}' is null", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttrType, AttributeDefinition};
    use crate::gateway::RecordingGateway;
    use std::collections::BTreeMap;

    fn users() -> Arc<Mapper> {
        let schema = AttributeSchema::build([
            (
                "id",
                AttributeDefinition::new(AttrType::Integer)
                    .primary_key()
                    .auto_generate(),
            ),
            ("email", AttributeDefinition::new(AttrType::String)),
        ])
        .unwrap();
        Arc::new(Mapper::new("users", schema))
    }

    fn memberships() -> Arc<Mapper> {
        let schema = AttributeSchema::build([
            ("user_id", AttributeDefinition::new(AttrType::Integer).primary_key()),
            ("group_id", AttributeDefinition::new(AttrType::Integer).primary_key()),
        ])
        .unwrap();
        Arc::new(Mapper::new("memberships", schema))
    }

    #[test]
    fn test_where_id_single() {
        let mapper = users();
        let stmt = mapper
            .where_id(mapper.select(), &RecordId::from(Value::Int(3)))
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM \"users\" WHERE (\"id\" = ?)");
        assert_eq!(stmt.params, vec![Value::Int(3)]);
    }

    #[test]
    fn test_where_id_composite() {
        let mapper = memberships();
        let id = RecordId::Composite(BTreeMap::from([
            ("group_id".to_string(), Value::Int(2)),
            ("user_id".to_string(), Value::Int(1)),
        ]));
        let stmt = mapper
            .where_id(mapper.select(), &id)
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM \"memberships\" WHERE (\"user_id\" = ?) AND (\"group_id\" = ?)"
        );
        assert_eq!(stmt.params, vec![Value::Int(1), Value::Int(2)]);

        let err = mapper
            .where_id(mapper.select(), &RecordId::from(Value::Int(1)))
            .unwrap_err();
        assert!(err.is_logic());

        let partial = RecordId::Composite(BTreeMap::from([
            ("group_id".to_string(), Value::Null),
            ("user_id".to_string(), Value::Int(1)),
        ]));
        let err = mapper.where_id(mapper.select(), &partial).unwrap_err();
        assert!(err.is_logic());
        assert!(err.to_string().contains("group_id"));
    }

    #[tokio::test]
    async fn test_null_id_never_queried() {
        let mapper = users();
        let gateway = RecordingGateway::new();

        let err = mapper
            .where_id(mapper.select(), &RecordId::from(Value::Null))
            .unwrap_err();
        assert!(err.is_logic());
        assert!(err.to_string().contains("is null"));

        let err = mapper
            .find(&gateway, RecordId::from(Value::Null))
            .await
            .unwrap_err();
        assert!(err.is_logic());
        assert!(gateway.statements().is_empty());
    }

    #[tokio::test]
    async fn test_find() {
        let mapper = users();
        let gateway = RecordingGateway::new();
        gateway.push_rows(vec![ValueRow::from([
            ("id".to_string(), Value::Int(5)),
            ("email".to_string(), Value::from("a@example.com")),
        ])]);

        let record = mapper
            .find(&gateway, RecordId::from(Value::Int(5)))
            .await
            .unwrap()
            .unwrap();
        assert!(!record.is_fresh());
        assert!(!record.is_dirty());
        assert_eq!(record.get("email").unwrap(), &Value::from("a@example.com"));

        let stmt = gateway.last_statement().unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM \"users\" WHERE (\"id\" = ?) LIMIT 1");

        let missing = mapper
            .find(&gateway, RecordId::from(Value::Int(6)))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_fetch_all() {
        let mapper = users();
        let gateway = RecordingGateway::new();
        gateway.push_rows(vec![
            ValueRow::from([("id".to_string(), Value::Int(1))]),
            ValueRow::from([("id".to_string(), Value::Int(2))]),
        ]);

        let select = mapper.select().order("id");
        let records = mapper.fetch_all(&gateway, &select).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id(), RecordId::Single(Value::Int(2)));
    }
}
