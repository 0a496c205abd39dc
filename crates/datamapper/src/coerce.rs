//! Value coercion: convert raw input to an attribute's declared type.
//!
//! [`coerce`] runs on every explicit assignment and enforces null and pattern
//! rules. [`load`] is the lenient variant used for rows read back from the
//! store.
//!
//! Datetimes are canonicalized in UTC: offset-bearing input is converted, and
//! integers are read as Unix timestamps.

use crate::attribute::{AttrType, AttributeDefinition};
use crate::error::{OrmError, OrmResult};
use crate::value::{DATE_FORMAT, DATETIME_FORMAT, TIME_FORMAT, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

/// Layouts accepted for datetime input, tried in order.
const DATETIME_INPUTS: &[&str] = &[
    DATETIME_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Coerce `raw` for assignment to attribute `name`.
///
/// An empty string means null. Null is rejected unless the attribute allows
/// it; non-null results must match the attribute pattern, if any.
pub fn coerce(name: &str, def: &AttributeDefinition, raw: Value) -> OrmResult<Value> {
    let raw = match raw {
        Value::Text(s) if s.is_empty() => Value::Null,
        other => other,
    };

    if raw.is_null() {
        if def.allow_null {
            return Ok(Value::Null);
        }
        return Err(OrmError::null_not_allowed(name));
    }

    let value = convert(def.ty, raw).map_err(|message| OrmError::unexpected(name, message))?;

    if let Some(re) = def.pattern_regex() {
        let text = value.to_string();
        if !re.is_match(&text) {
            return Err(OrmError::unexpected(
                name,
                format!("{text:?} does not match pattern {}", re.as_str()),
            ));
        }
    }

    Ok(value)
}

/// Normalize a value read from the store.
///
/// No null or pattern checks; a value that cannot be converted is kept as-is.
pub fn load(def: &AttributeDefinition, raw: Value) -> Value {
    if raw.is_null() {
        return Value::Null;
    }
    convert(def.ty, raw.clone()).unwrap_or(raw)
}

fn convert(ty: AttrType, raw: Value) -> Result<Value, String> {
    match ty {
        AttrType::Integer => to_integer(raw),
        AttrType::Float => to_float(raw),
        AttrType::String | AttrType::Json => Ok(Value::Text(raw.to_string())),
        AttrType::Boolean => to_boolean(raw),
        AttrType::Datetime => to_datetime(raw).map(Value::from),
        AttrType::Date => to_datetime(raw).map(|dt| Value::from(dt.date())),
        AttrType::Time => to_time(raw).map(Value::from),
    }
}

fn to_integer(raw: Value) -> Result<Value, String> {
    match raw {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Float(f) => float_to_i64(f)
            .map(Value::Int)
            .ok_or_else(|| format!("{f} is not an integer")),
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| format!("{s:?} is not an integer")),
        other => Err(format!("{other:?} is not an integer")),
    }
}

/// Exact conversion of a whole float to `i64`; `None` when out of range.
pub(crate) fn float_to_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn to_float(raw: Value) -> Result<Value, String> {
    match raw {
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| format!("{s:?} is not a number")),
        other => Err(format!("{other:?} is not a number")),
    }
}

fn to_boolean(raw: Value) -> Result<Value, String> {
    match raw {
        Value::Bool(b) => Ok(Value::Bool(b)),
        Value::Int(i) => Ok(Value::Bool(i != 0)),
        Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" | "t" | "y" => Ok(Value::Bool(true)),
            "0" | "false" | "no" | "off" | "f" | "n" => Ok(Value::Bool(false)),
            _ => Err(format!("{s:?} is not a boolean")),
        },
        other => Err(format!("{other:?} is not a boolean")),
    }
}

fn to_datetime(raw: Value) -> Result<NaiveDateTime, String> {
    match raw {
        Value::Int(ts) => DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| format!("timestamp {ts} out of range")),
        Value::Text(s) => parse_datetime(s.trim()).ok_or_else(|| format!("{s:?} is not a datetime")),
        other => Err(format!("{other:?} is not a datetime")),
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for layout in DATETIME_INPUTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn to_time(raw: Value) -> Result<NaiveTime, String> {
    if let Value::Text(s) = &raw {
        let s = s.trim();
        if let Ok(t) = NaiveTime::parse_from_str(s, TIME_FORMAT) {
            return Ok(t);
        }
        if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
            return Ok(t);
        }
    }
    to_datetime(raw).map(|dt| dt.time())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(ty: AttrType) -> AttributeDefinition {
        AttributeDefinition::new(ty)
    }

    #[test]
    fn empty_string_is_null_intent() {
        let nullable = def(AttrType::String).allow_null();
        assert_eq!(coerce("foo", &nullable, Value::from("")).unwrap(), Value::Null);

        let err = coerce("bar", &def(AttrType::Integer), Value::from("")).unwrap_err();
        assert!(err.is_null_not_allowed());
        assert!(err.to_string().contains("not allow null"));
    }

    #[test]
    fn null_rejected_unless_allowed() {
        assert!(coerce("x", &def(AttrType::String), Value::Null)
            .unwrap_err()
            .is_null_not_allowed());
        assert_eq!(
            coerce("x", &def(AttrType::String).allow_null(), Value::Null).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn integer_conversion() {
        let d = def(AttrType::Integer);
        assert_eq!(coerce("n", &d, Value::from(" 42 ")).unwrap(), Value::Int(42));
        assert_eq!(coerce("n", &d, Value::Float(3.0)).unwrap(), Value::Int(3));
        assert_eq!(coerce("n", &d, Value::Bool(true)).unwrap(), Value::Int(1));
        assert!(coerce("n", &d, Value::from("abc")).unwrap_err().is_unexpected_value());
        assert!(coerce("n", &d, Value::Float(3.5)).unwrap_err().is_unexpected_value());
    }

    #[test]
    fn integer_rejects_out_of_range_floats() {
        let d = def(AttrType::Integer);
        assert!(coerce("n", &d, Value::Float(1e30)).unwrap_err().is_unexpected_value());
        assert!(coerce("n", &d, Value::Float(-1e30)).unwrap_err().is_unexpected_value());
        assert!(coerce("n", &d, Value::Float(9_223_372_036_854_775_808.0)).is_err());
        assert!(coerce("n", &d, Value::Float(f64::NAN)).is_err());
        assert!(coerce("n", &d, Value::Float(f64::INFINITY)).is_err());
        assert_eq!(
            coerce("n", &d, Value::Float(-9_223_372_036_854_775_808.0)).unwrap(),
            Value::Int(i64::MIN)
        );
        assert_eq!(load(&d, Value::Float(1e30)), Value::Float(1e30));
    }

    #[test]
    fn boolean_normalization() {
        let d = def(AttrType::Boolean);
        assert_eq!(coerce("b", &d, Value::from("Yes")).unwrap(), Value::Bool(true));
        assert_eq!(coerce("b", &d, Value::from("0")).unwrap(), Value::Bool(false));
        assert_eq!(coerce("b", &d, Value::Int(5)).unwrap(), Value::Bool(true));
        assert!(coerce("b", &d, Value::from("maybe")).is_err());
    }

    #[test]
    fn string_renders_scalars() {
        let d = def(AttrType::String);
        assert_eq!(coerce("s", &d, Value::Int(7)).unwrap(), Value::from("7"));
        assert_eq!(coerce("s", &d, Value::Bool(false)).unwrap(), Value::from("false"));
    }

    #[test]
    fn datetime_canonicalized() {
        let d = def(AttrType::Datetime);
        assert_eq!(
            coerce("t", &d, Value::from("2024-02-03T04:05:06")).unwrap(),
            Value::from("2024-02-03 04:05:06")
        );
        assert_eq!(
            coerce("t", &d, Value::from("2024-02-03")).unwrap(),
            Value::from("2024-02-03 00:00:00")
        );
        assert_eq!(
            coerce("t", &d, Value::Int(0)).unwrap(),
            Value::from("1970-01-01 00:00:00")
        );
        assert_eq!(
            coerce("t", &def(AttrType::Date), Value::from("2024-02-03 10:00:00")).unwrap(),
            Value::from("2024-02-03")
        );
        assert_eq!(
            coerce("t", &def(AttrType::Time), Value::from("10:15")).unwrap(),
            Value::from("10:15:00")
        );
        assert!(coerce("t", &d, Value::from("yesterday")).is_err());
    }

    #[test]
    fn datetime_offsets_normalized_to_utc() {
        let d = def(AttrType::Datetime);
        let from_offset = coerce("t", &d, Value::from("2024-05-01T12:30:05+08:00")).unwrap();
        let from_utc = coerce("t", &d, Value::from("2024-05-01T04:30:05Z")).unwrap();
        let from_timestamp = coerce("t", &d, Value::Int(1_714_537_805)).unwrap();
        assert_eq!(from_offset, Value::from("2024-05-01 04:30:05"));
        assert_eq!(from_offset, from_utc);
        assert_eq!(from_offset, from_timestamp);
        assert_eq!(
            coerce("t", &def(AttrType::Date), Value::from("2024-05-01T02:00:00+08:00")).unwrap(),
            Value::from("2024-04-30")
        );
    }

    #[test]
    fn pattern_checked_after_conversion() {
        let d = def(AttrType::String)
            .pattern(r"(?i)^([a-z0-9_\-\.])+@([a-z0-9_\-\.])+\.([a-z]{2,4})$")
            .unwrap();
        let err = coerce("email", &d, Value::from("yangyi")).unwrap_err();
        assert!(err.is_unexpected_value());
        assert_eq!(
            coerce("email", &d, Value::from("someone@example.com")).unwrap(),
            Value::from("someone@example.com")
        );
    }

    #[test]
    fn pattern_skipped_for_null() {
        let d = def(AttrType::String).allow_null().pattern("^x$").unwrap();
        assert_eq!(coerce("s", &d, Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn load_is_lenient() {
        let d = def(AttrType::Integer);
        assert_eq!(load(&d, Value::from("12")), Value::Int(12));
        assert_eq!(load(&d, Value::from("junk")), Value::from("junk"));
        assert_eq!(load(&d, Value::Null), Value::Null);
    }
}
