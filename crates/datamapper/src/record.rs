//! Schema-driven records with dirty tracking.
//!
//! A [`Record`] holds the current attribute values of one row, remembers which
//! attributes changed since the last persist and enforces the per-attribute
//! mutation policy of its [`Mapper`]'s schema.
//!
//! # Lifecycle
//!
//! ```text
//! Fresh --save--> Persisted --set/merge--> Persisted (dirty) --save--> Persisted
//!                     |
//!                  destroy
//!                     v
//!                 Destroyed
//! ```

use crate::coerce;
use crate::error::{OrmError, OrmResult};
use crate::gateway::PersistenceGateway;
use crate::mapper::Mapper;
use crate::qb;
use crate::value::{Value, ValueRow};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

static NULL: Value = Value::Null;

/// Options for [`Record::new`].
#[derive(Debug, Clone, Copy)]
pub struct RecordOptions {
    /// `true` for a record that has never been persisted.
    pub fresh: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self { fresh: true }
    }
}

impl RecordOptions {
    /// Options for a record whose values came from the store.
    pub fn persisted() -> Self {
        Self { fresh: false }
    }
}

/// Options for [`Record::set`].
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// Fail on unknown attributes and honor attributes declared `strict`.
    ///
    /// With `strict = false` (bulk mode) both are silently skipped.
    pub strict: bool,
    /// Bypass the primary-key, `refuse_update` and `auto_generate` guards.
    pub force: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            strict: true,
            force: false,
        }
    }
}

impl SetOptions {
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Primary-key value of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordId {
    /// Schema with exactly one primary key.
    Single(Value),
    /// Schema with several primary keys: name → value.
    Composite(BTreeMap<String, Value>),
}

impl From<Value> for RecordId {
    fn from(value: Value) -> Self {
        RecordId::Single(value)
    }
}

impl From<BTreeMap<String, Value>> for RecordId {
    fn from(values: BTreeMap<String, Value>) -> Self {
        RecordId::Composite(values)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Single(v) => write!(f, "{}", v),
            RecordId::Composite(values) => {
                for (i, (k, v)) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Fresh,
    Persisted,
    Destroyed,
}

/// One row of a mapper's collection.
#[derive(Debug, Clone)]
pub struct Record {
    mapper: Arc<Mapper>,
    values: BTreeMap<String, Value>,
    dirty: BTreeSet<String>,
    origin: Origin,
    /// Primary key as of the last successful persist; keys UPDATE and DELETE.
    persisted_id: Option<RecordId>,
}

impl Record {
    /// Build a record.
    ///
    /// Names outside the schema are skipped. A fresh record coerces every
    /// provided value and marks it dirty; otherwise values are loaded as-is
    /// from the store and nothing is dirty. Attributes not provided receive
    /// their default, dirty only when fresh.
    pub fn new<I, K, V>(mapper: Arc<Mapper>, values: I, options: RecordOptions) -> OrmResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        if !options.fresh {
            return Ok(Self::from_row(mapper, values));
        }

        let mut record = Self::empty(mapper, Origin::Fresh);
        let mapper = Arc::clone(&record.mapper);
        let mut provided = BTreeSet::new();
        for (name, raw) in values {
            let name = name.as_ref();
            let Some(def) = mapper.schema().get(name) else {
                continue;
            };
            let value = coerce::coerce(name, def, raw.into())?;
            record.store(name, value);
            record.dirty.insert(name.to_string());
            provided.insert(name.to_string());
        }
        record.apply_defaults(&provided, true);
        Ok(record)
    }

    /// Build a persisted record from store values without running coercion
    /// checks.
    pub(crate) fn from_row<I, K, V>(mapper: Arc<Mapper>, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut record = Self::empty(mapper, Origin::Persisted);
        let provided = record.load_values(values);
        record.apply_defaults(&provided, false);
        record.persisted_id = Some(record.id());
        record
    }

    fn empty(mapper: Arc<Mapper>, origin: Origin) -> Self {
        Self {
            mapper,
            values: BTreeMap::new(),
            dirty: BTreeSet::new(),
            origin,
            persisted_id: None,
        }
    }

    /// Load store values and return the schema names seen.
    fn load_values<I, K, V>(&mut self, values: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mapper = Arc::clone(&self.mapper);
        let mut loaded = BTreeSet::new();
        for (name, raw) in values {
            let name = name.as_ref();
            if let Some(def) = mapper.schema().get(name) {
                self.store(name, coerce::load(def, raw.into()));
                loaded.insert(name.to_string());
            }
        }
        loaded
    }

    fn apply_defaults(&mut self, provided: &BTreeSet<String>, mark_dirty: bool) {
        let mapper = Arc::clone(&self.mapper);
        for (name, def) in mapper.schema().iter() {
            if provided.contains(name) {
                continue;
            }
            let Some(default) = &def.default else {
                continue;
            };
            let value = coerce::load(def, default.resolve(mapper.clock()));
            if value.is_null() {
                continue;
            }
            self.values.insert(name.to_string(), value);
            if mark_dirty {
                self.dirty.insert(name.to_string());
            }
        }
    }

    /// Store `value`, removing the entry for null.
    fn store(&mut self, name: &str, value: Value) {
        if value.is_null() {
            self.values.remove(name);
        } else {
            self.values.insert(name.to_string(), value);
        }
    }

    pub fn mapper(&self) -> &Arc<Mapper> {
        &self.mapper
    }

    // ==================== Read ====================

    /// Current value of `name`; `Value::Null` when absent.
    pub fn get(&self, name: &str) -> OrmResult<&Value> {
        if !self.mapper.schema().contains(name) {
            return Err(OrmError::undefined(name));
        }
        Ok(self.values.get(name).unwrap_or(&NULL))
    }

    /// Whether `name` holds a non-null value.
    pub fn has(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|v| !v.is_null())
    }

    /// Primary-key value(s) as currently held.
    pub fn id(&self) -> RecordId {
        let keys = self.mapper.schema().primary_keys();
        if let [key] = keys {
            return RecordId::Single(self.values.get(key).cloned().unwrap_or_default());
        }
        RecordId::Composite(
            keys.iter()
                .map(|k| (k.clone(), self.values.get(k).cloned().unwrap_or_default()))
                .collect(),
        )
    }

    /// Values for `names`, in the order requested; unknown names are dropped.
    ///
    /// With no names, every present attribute that is neither a primary key
    /// nor `protected`, in declaration order.
    pub fn pick(&self, names: &[&str]) -> Vec<(String, Value)> {
        let schema = self.mapper.schema();
        if names.is_empty() {
            return schema
                .iter()
                .filter(|(_, def)| !def.primary_key && !def.protected)
                .filter_map(|(name, _)| self.values.get(name).map(|v| (name.to_string(), v.clone())))
                .collect();
        }
        names
            .iter()
            .filter(|name| schema.contains(name))
            .map(|name| {
                let value = self.values.get(*name).cloned().unwrap_or_default();
                (name.to_string(), value)
            })
            .collect()
    }

    /// Every present attribute.
    pub fn to_map(&self) -> ValueRow {
        self.values.clone()
    }

    pub fn is_fresh(&self) -> bool {
        self.origin == Origin::Fresh
    }

    pub fn is_destroyed(&self) -> bool {
        self.origin == Origin::Destroyed
    }

    /// Whether any attribute changed since the last persist.
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_dirty_attr(&self, name: &str) -> bool {
        self.dirty.contains(name)
    }

    /// Dirty attribute names in declaration order.
    pub fn dirty_attributes(&self) -> Vec<&str> {
        self.mapper
            .schema()
            .names()
            .filter(|name| self.dirty.contains(*name))
            .collect()
    }

    // ==================== Write ====================

    /// Assign one attribute.
    ///
    /// Assigning the value already held (absent counts as null) leaves the
    /// dirty set untouched.
    pub fn set(&mut self, name: &str, value: impl Into<Value>, options: SetOptions) -> OrmResult<()> {
        let mapper = Arc::clone(&self.mapper);
        let Some(def) = mapper.schema().get(name) else {
            if options.strict {
                return Err(OrmError::undefined(name));
            }
            return Ok(());
        };

        if def.strict && !options.strict {
            return Ok(());
        }

        if !options.force {
            let locked = match self.origin {
                Origin::Fresh => def.auto_generate,
                Origin::Persisted | Origin::Destroyed => def.primary_key || def.refuse_update,
            };
            if locked {
                return Err(OrmError::refuse_update(name));
            }
        }

        let value = coerce::coerce(name, def, value.into())?;
        if self.values.get(name).unwrap_or(&NULL) == &value {
            return Ok(());
        }

        self.store(name, value);
        self.dirty.insert(name.to_string());
        Ok(())
    }

    /// `set` with default options.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> OrmResult<()> {
        self.set(name, value, SetOptions::default())
    }

    /// Bulk assignment: unknown and `strict` attributes are skipped.
    ///
    /// Stops at the first failure; earlier entries stay applied.
    pub fn merge<I, K, V>(&mut self, values: I) -> OrmResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let options = SetOptions::default().strict(false);
        for (name, value) in values {
            self.set(name.as_ref(), value, options)?;
        }
        Ok(())
    }

    /// Alias of [`merge`](Self::merge).
    pub fn set_props<I, K, V>(&mut self, values: I) -> OrmResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.merge(values)
    }

    /// Check that every non-nullable attribute holds a value.
    ///
    /// Store-generated attributes are not required before the first persist.
    pub fn validate(&self) -> OrmResult<()> {
        for (name, def) in self.mapper.schema().iter() {
            if def.allow_null || (def.auto_generate && self.is_fresh()) {
                continue;
            }
            if !self.has(name) {
                return Err(OrmError::null_not_allowed(name));
            }
        }
        Ok(())
    }

    // ==================== Persistence ====================

    fn ensure_writable(&self, op: &str) -> OrmResult<()> {
        if self.mapper.is_readonly() {
            return Err(OrmError::logic(format!(
                "{} is readonly, cannot {}",
                self.mapper.collection(),
                op
            )));
        }
        if self.is_destroyed() {
            return Err(OrmError::logic(format!("cannot {} a destroyed record", op)));
        }
        Ok(())
    }

    fn persisted_key(&self) -> RecordId {
        self.persisted_id.clone().unwrap_or_else(|| self.id())
    }

    /// Insert a fresh record or write the dirty attributes of a persisted one.
    ///
    /// In-memory state only changes once the write succeeded. If the INSERT
    /// succeeds but the generated key cannot be read back, the record is
    /// still persisted and the lookup error is returned. Its key stays
    /// unset, so later writes on it fail before reaching the gateway.
    pub async fn save(&mut self, gateway: &impl PersistenceGateway) -> OrmResult<()> {
        self.ensure_writable("save")?;
        self.validate()?;

        if self.is_fresh() {
            self.insert(gateway).await
        } else {
            self.update(gateway).await
        }
    }

    async fn insert(&mut self, gateway: &impl PersistenceGateway) -> OrmResult<()> {
        let mapper = Arc::clone(&self.mapper);
        let schema = mapper.schema();

        let values: Vec<(&str, Value)> = schema
            .iter()
            .filter_map(|(name, _)| self.values.get(name).map(|v| (name, v.clone())))
            .collect();
        qb::insert(mapper.collection(), values)
            .execute(gateway)
            .await?;

        // the row exists from here on; a failed key lookup must not reopen it
        // to a second INSERT
        self.dirty.clear();
        self.origin = Origin::Persisted;
        self.persisted_id = Some(self.id());

        let generated = schema
            .iter()
            .find(|(name, def)| def.primary_key && def.auto_generate && !self.values.contains_key(*name));
        if let Some((name, def)) = generated {
            match gateway.last_insert_id().await {
                Ok(Some(id)) => {
                    self.store(name, coerce::load(def, id));
                    self.persisted_id = Some(self.id());
                }
                Ok(None) => tracing::warn!(
                    target: "datamapper.record",
                    collection = %mapper.collection(),
                    attribute = name,
                    "no generated key returned after insert"
                ),
                Err(e) => {
                    tracing::warn!(
                        target: "datamapper.record",
                        collection = %mapper.collection(),
                        attribute = name,
                        error = %e,
                        "generated key lookup failed after insert"
                    );
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            target: "datamapper.record",
            collection = %mapper.collection(),
            id = %self.id(),
            "insert"
        );
        Ok(())
    }

    async fn update(&mut self, gateway: &impl PersistenceGateway) -> OrmResult<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }

        let mapper = Arc::clone(&self.mapper);
        let key = self.persisted_key();
        let values: Vec<(&str, Value)> = self
            .dirty_attributes()
            .into_iter()
            .map(|name| (name, self.values.get(name).cloned().unwrap_or_default()))
            .collect();
        let stmt = mapper.where_id(mapper.select(), &key)?.update(values)?;
        stmt.execute(gateway).await?;

        tracing::debug!(
            target: "datamapper.record",
            collection = %mapper.collection(),
            id = %key,
            attributes = self.dirty.len(),
            "update"
        );
        self.dirty.clear();
        self.persisted_id = Some(self.id());
        Ok(())
    }

    /// Delete the persisted row. The record cannot be saved afterwards.
    pub async fn destroy(&mut self, gateway: &impl PersistenceGateway) -> OrmResult<()> {
        self.ensure_writable("destroy")?;
        if self.is_fresh() {
            return Err(OrmError::logic("cannot destroy a fresh record"));
        }

        let key = self.persisted_key();
        let stmt = self.mapper.where_id(self.mapper.select(), &key)?.delete()?;
        stmt.execute(gateway).await?;

        tracing::debug!(
            target: "datamapper.record",
            collection = %self.mapper.collection(),
            id = %key,
            "delete"
        );
        self.origin = Origin::Destroyed;
        Ok(())
    }

    /// Reload every attribute from the store and discard local changes.
    pub async fn refresh(&mut self, gateway: &impl PersistenceGateway) -> OrmResult<()> {
        if self.is_fresh() || self.is_destroyed() {
            return Err(OrmError::logic("only persisted records can be refreshed"));
        }

        let key = self.persisted_key();
        let stmt = self
            .mapper
            .where_id(self.mapper.select(), &key)?
            .limit(1)
            .compile()?;
        let row = stmt.query(gateway).await?.into_iter().next().ok_or_else(|| {
            OrmError::not_found(format!("{} {}", self.mapper.collection(), key))
        })?;

        self.values.clear();
        self.dirty.clear();
        self.load_values(row);
        self.persisted_id = Some(self.id());
        Ok(())
    }
}

/// Serializes every present attribute in declaration order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let schema = self.mapper.schema();
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for name in schema.names() {
            if let Some(value) = self.values.get(name) {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}
