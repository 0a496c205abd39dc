//! # datamapper
//!
//! Schema-driven records and a guarded SQL query builder for PostgreSQL.
//!
//! ## Features
//!
//! - **Declared attributes**: every record type has an [`AttributeSchema`] with
//!   types, defaults, nullability and mutation policy
//! - **Dirty tracking**: records remember what changed and only write that
//! - **Coercion on write**: values are converted to the declared type and
//!   checked against optional patterns
//! - **Safe defaults**: UPDATE and DELETE refuse to build without WHERE, or with
//!   LIMIT/OFFSET/GROUP BY
//! - **Pluggable store**: records talk to a [`PersistenceGateway`]; a
//!   `tokio-postgres` adapter and an in-memory recorder are included
//!
//! ## Records
//!
//! ```ignore
//! use datamapper::{AttrType, AttributeDefinition, AttributeSchema, Mapper, PgGateway};
//! use std::sync::Arc;
//!
//! let schema = AttributeSchema::build([
//!     ("id", AttributeDefinition::new(AttrType::Integer).primary_key().auto_generate()),
//!     ("email", AttributeDefinition::new(AttrType::String).refuse_update()),
//!     ("name", AttributeDefinition::new(AttrType::String).allow_null()),
//! ])?;
//! let users = Arc::new(Mapper::new("users", schema));
//!
//! let gateway = PgGateway::new(&client);
//! let mut user = users.create([("email", "alice@example.com")])?;
//! user.save(&gateway).await?;
//!
//! user.set_value("name", "Alice")?;
//! user.save(&gateway).await?; // UPDATE "users" SET "name" = $1 WHERE ("id" = $2)
//! ```
//!
//! ## Query Builder (qb)
//!
//! ```ignore
//! use datamapper::qb;
//!
//! let stmt = qb::select("users")
//!     .and_where("name = ?", ["alice"])
//!     .and_in("id", qb::select("orders").set_cols(["user_id"]))
//!     .order("id desc")
//!     .limit(10)
//!     .compile()?;
//! let rows = stmt.query(&gateway).await?;
//! ```

pub mod attribute;
pub mod clock;
pub mod coerce;
pub mod error;
pub mod gateway;
pub mod mapper;
pub mod qb;
pub mod record;
pub mod schema;
pub mod value;

pub use attribute::{AttrType, AttributeDefinition, DefaultValue};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{OrmError, OrmResult};
pub use gateway::{
    PersistenceGateway, PgGateway, PgGatewayConfig, RecordedStatement, RecordingGateway,
};
pub use mapper::Mapper;
pub use qb::{Expr, InList, Select, Statement, select};
pub use record::{Record, RecordId, RecordOptions, SetOptions};
pub use schema::AttributeSchema;
pub use value::{Value, ValueRow};

#[cfg(feature = "pool")]
pub mod pool;
