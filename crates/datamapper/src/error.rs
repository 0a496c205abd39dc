//! Error types for datamapper

use thiserror::Error;

/// Result type alias for datamapper operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for schema, record and database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Invalid attribute schema (no primary key, missing type, bad pattern)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Attribute name not declared in the schema
    #[error("Undefined property: {attribute}")]
    UndefinedProperty { attribute: String },

    /// Null (or empty string) assigned to an attribute that does not allow null
    #[error("Property '{attribute}' does not allow null")]
    NullNotAllowed { attribute: String },

    /// Write-once attribute changed after the record was persisted
    #[error("Property '{attribute}' refuse update")]
    RefuseUpdate { attribute: String },

    /// Value could not be converted or failed the attribute pattern
    #[error("Unexpected value for '{attribute}': {message}")]
    UnexpectedValue { attribute: String, message: String },

    /// Statement or lifecycle misuse, rejected before touching the store
    #[error("Logic error: {0}")]
    Logic(String),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Pool error
    #[cfg(feature = "pool")]
    #[error("Pool error: {0}")]
    Pool(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Error reported by a non-Postgres gateway implementation
    #[error("Gateway error: {0}")]
    Gateway(String),
}

impl OrmError {
    /// Create an undefined property error
    pub fn undefined(attribute: impl Into<String>) -> Self {
        Self::UndefinedProperty {
            attribute: attribute.into(),
        }
    }

    /// Create a null-not-allowed error
    pub fn null_not_allowed(attribute: impl Into<String>) -> Self {
        Self::NullNotAllowed {
            attribute: attribute.into(),
        }
    }

    /// Create a refuse-update error
    pub fn refuse_update(attribute: impl Into<String>) -> Self {
        Self::RefuseUpdate {
            attribute: attribute.into(),
        }
    }

    /// Create an unexpected value error
    pub fn unexpected(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create a logic error
    pub fn logic(message: impl Into<String>) -> Self {
        Self::Logic(message.into())
    }

    /// Create a schema error
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema(_))
    }

    pub fn is_undefined_property(&self) -> bool {
        matches!(self, Self::UndefinedProperty { .. })
    }

    pub fn is_null_not_allowed(&self) -> bool {
        matches!(self, Self::NullNotAllowed { .. })
    }

    pub fn is_refuse_update(&self) -> bool {
        matches!(self, Self::RefuseUpdate { .. })
    }

    pub fn is_unexpected_value(&self) -> bool {
        matches!(self, Self::UnexpectedValue { .. })
    }

    pub fn is_logic(&self) -> bool {
        matches!(self, Self::Logic(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(feature = "pool")]
impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
