//! Attribute definitions: the per-column metadata a schema is built from.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Declared type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrType {
    Integer,
    Float,
    String,
    Boolean,
    Datetime,
    Date,
    Time,
    Json,
}

impl AttrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Date => "date",
            Self::Time => "time",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttrType {
    type Err = OrmError;

    fn from_str(s: &str) -> OrmResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "integer" | "int" => Ok(Self::Integer),
            "float" | "double" | "numeric" => Ok(Self::Float),
            "string" | "text" => Ok(Self::String),
            "boolean" | "bool" => Ok(Self::Boolean),
            "datetime" | "timestamp" => Ok(Self::Datetime),
            "date" => Ok(Self::Date),
            "time" => Ok(Self::Time),
            "json" => Ok(Self::Json),
            other => Err(OrmError::schema(format!("unknown attribute type '{other}'"))),
        }
    }
}

/// How an unset attribute is filled when a record is constructed.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Literal(Value),
    /// `YYYY-MM-DD HH:MM:SS`
    CurrentDatetime,
    /// Unix timestamp as an integer
    CurrentTimestamp,
    /// `YYYY-MM-DD`
    CurrentDate,
    /// `HH:MM:SS`
    CurrentTime,
}

impl DefaultValue {
    /// Sentinel names accepted in JSON schemas.
    pub fn from_sentinel(s: &str) -> Option<Self> {
        match s {
            "CURRENT_DATETIME" => Some(Self::CurrentDatetime),
            "CURRENT_TIMESTAMP" => Some(Self::CurrentTimestamp),
            "CURRENT_DATE" => Some(Self::CurrentDate),
            "CURRENT_TIME" => Some(Self::CurrentTime),
            _ => None,
        }
    }
}

/// Metadata for one attribute.
///
/// Built with chained setters:
///
/// ```ignore
/// let email = AttributeDefinition::new(AttrType::String)
///     .refuse_update()
///     .pattern(r"^[^@\s]+@[^@\s]+$")?;
/// ```
#[derive(Debug, Clone)]
pub struct AttributeDefinition {
    pub ty: AttrType,
    pub primary_key: bool,
    pub auto_generate: bool,
    pub allow_null: bool,
    pub default: Option<DefaultValue>,
    pub strict: bool,
    pub refuse_update: bool,
    pub protected: bool,
    pattern: Option<Regex>,
}

impl AttributeDefinition {
    pub fn new(ty: AttrType) -> Self {
        Self {
            ty,
            primary_key: false,
            auto_generate: false,
            allow_null: false,
            default: None,
            strict: false,
            refuse_update: false,
            protected: false,
            pattern: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Value is assigned by the backing store (serial / identity column).
    pub fn auto_generate(mut self) -> Self {
        self.auto_generate = true;
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Literal default.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Default resolved from the clock when the record is constructed.
    pub fn default_with(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Exclude from bulk assignment (`merge` / `set_props`).
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Write-once after the record has been persisted.
    pub fn refuse_update(mut self) -> Self {
        self.refuse_update = true;
        self
    }

    /// Hidden from `pick()` without arguments.
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// Constrain coerced values to a regular expression.
    pub fn pattern(mut self, pattern: &str) -> OrmResult<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| OrmError::schema(format!("invalid pattern {pattern:?}: {e}")))?;
        self.pattern = Some(re);
        Ok(self)
    }

    pub fn pattern_regex(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }
}

/// Raw, not yet validated form of a definition as it appears in JSON.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDefinition {
    #[serde(rename = "type")]
    ty: Option<String>,
    #[serde(default)]
    primary_key: bool,
    #[serde(default, alias = "auto_increase")]
    auto_generate: bool,
    #[serde(default)]
    allow_null: bool,
    #[serde(default)]
    default: Option<serde_json::Value>,
    #[serde(default)]
    strict: bool,
    #[serde(default)]
    refuse_update: bool,
    #[serde(default)]
    protected: bool,
    #[serde(default)]
    pattern: Option<String>,
}

impl RawDefinition {
    pub(crate) fn normalize(self, name: &str) -> OrmResult<AttributeDefinition> {
        let ty = self
            .ty
            .ok_or_else(|| OrmError::schema(format!("attribute '{name}' has no type")))?
            .parse::<AttrType>()?;

        let mut def = AttributeDefinition::new(ty);
        def.primary_key = self.primary_key;
        def.auto_generate = self.auto_generate;
        def.allow_null = self.allow_null;
        def.strict = self.strict;
        def.refuse_update = self.refuse_update;
        def.protected = self.protected;
        def.default = match self.default {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(
                DefaultValue::from_sentinel(&s).unwrap_or(DefaultValue::Literal(Value::Text(s))),
            ),
            Some(other) => Some(DefaultValue::Literal(Value::from_json(&other))),
        };
        match self.pattern {
            Some(p) => def.pattern(&p),
            None => Ok(def),
        }
    }
}
