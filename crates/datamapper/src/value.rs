//! Scalar value cell shared by records and statement parameters.
//!
//! [`Value`] is deliberately small: datetimes travel as canonical text
//! (`YYYY-MM-DD HH:MM:SS`) and are converted to real PostgreSQL types only at
//! the wire boundary (see the [`ToSql`] impl below).

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};

/// Canonical layout for `datetime` attributes.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Canonical layout for `date` attributes.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical layout for `time` attributes.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One row as returned by a gateway: column name → value.
pub type ValueRow = BTreeMap<String, Value>;

/// A dynamically typed scalar.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a value.
    ///
    /// Arrays and objects are kept as their JSON text.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Render as an inline SQL literal.
    ///
    /// Text is single-quoted with embedded quotes doubled.
    pub fn sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) if f.is_finite() => f.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Text(v.format(DATETIME_FORMAT).to_string())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Text(v.format(DATE_FORMAT).to_string())
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Text(v.format(TIME_FORMAT).to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ─── PostgreSQL wire conversions ────────────────────────────────────────────

fn text_to_sql(
    s: &str,
    ty: &Type,
    out: &mut BytesMut,
) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
    if *ty == Type::TIMESTAMP {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)?.to_sql(ty, out)
    } else if *ty == Type::TIMESTAMPTZ {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)?
            .and_utc()
            .to_sql(ty, out)
    } else if *ty == Type::DATE {
        NaiveDate::parse_from_str(s, DATE_FORMAT)?.to_sql(ty, out)
    } else if *ty == Type::TIME {
        NaiveTime::parse_from_str(s, TIME_FORMAT)?.to_sql(ty, out)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
    } else if *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8 {
        Value::Int(s.trim().parse()?).to_sql(ty, out)
    } else if *ty == Type::FLOAT4 || *ty == Type::FLOAT8 {
        Value::Float(s.trim().parse()?).to_sql(ty, out)
    } else {
        s.to_sql(ty, out)
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(i) => {
                if *ty == Type::INT2 {
                    i16::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*i)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*i as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*i as f64).to_sql(ty, out)
                } else if *ty == Type::TIMESTAMP || *ty == Type::TIMESTAMPTZ {
                    let ts = DateTime::<Utc>::from_timestamp(*i, 0)
                        .ok_or_else(|| format!("timestamp out of range: {}", i))?;
                    if *ty == Type::TIMESTAMP {
                        ts.naive_utc().to_sql(ty, out)
                    } else {
                        ts.to_sql(ty, out)
                    }
                } else if *ty == Type::INT8 {
                    i.to_sql(ty, out)
                } else {
                    text_to_sql(&i.to_string(), ty, out)
                }
            }
            Value::Float(f) => {
                if *ty == Type::FLOAT4 {
                    (*f as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    f.to_sql(ty, out)
                } else {
                    text_to_sql(&f.to_string(), ty, out)
                }
            }
            Value::Text(s) => text_to_sql(s, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let value = if *ty == Type::BOOL {
            Value::Bool(bool::from_sql(ty, raw)?)
        } else if *ty == Type::INT2 {
            Value::Int(i16::from_sql(ty, raw)?.into())
        } else if *ty == Type::INT4 {
            Value::Int(i32::from_sql(ty, raw)?.into())
        } else if *ty == Type::INT8 {
            Value::Int(i64::from_sql(ty, raw)?)
        } else if *ty == Type::OID {
            Value::Int(u32::from_sql(ty, raw)?.into())
        } else if *ty == Type::FLOAT4 {
            Value::Float(f32::from_sql(ty, raw)?.into())
        } else if *ty == Type::FLOAT8 {
            Value::Float(f64::from_sql(ty, raw)?)
        } else if *ty == Type::TIMESTAMP {
            NaiveDateTime::from_sql(ty, raw)?.into()
        } else if *ty == Type::TIMESTAMPTZ {
            DateTime::<Utc>::from_sql(ty, raw)?.naive_utc().into()
        } else if *ty == Type::DATE {
            NaiveDate::from_sql(ty, raw)?.into()
        } else if *ty == Type::TIME {
            NaiveTime::from_sql(ty, raw)?.into()
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            Value::Text(serde_json::Value::from_sql(ty, raw)?.to_string())
        } else {
            Value::Text(std::str::from_utf8(raw)?.to_string())
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}
