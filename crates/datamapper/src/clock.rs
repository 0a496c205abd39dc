//! Clock abstraction used to resolve dynamic attribute defaults.

use crate::attribute::DefaultValue;
use crate::value::{DATE_FORMAT, DATETIME_FORMAT, TIME_FORMAT, Value};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;

/// Source of "now".
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().fixed_offset()
    }
}

/// A clock frozen at one instant. Useful in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl FixedClock {
    /// Parse an RFC 3339 instant, e.g. `2024-05-01T12:30:00+00:00`.
    pub fn parse(rfc3339: &str) -> Result<Self, chrono::ParseError> {
        DateTime::parse_from_rfc3339(rfc3339).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl DefaultValue {
    /// Produce the concrete value for this default at the clock's current instant.
    ///
    /// Text sentinels render the instant in UTC, whatever offset the clock
    /// reports, so they agree with coerced datetime input.
    pub fn resolve(&self, clock: &dyn Clock) -> Value {
        let now = clock.now().naive_utc();
        match self {
            DefaultValue::Literal(v) => v.clone(),
            DefaultValue::CurrentDatetime => Value::Text(now.format(DATETIME_FORMAT).to_string()),
            DefaultValue::CurrentTimestamp => Value::Int(clock.now().timestamp()),
            DefaultValue::CurrentDate => Value::Text(now.format(DATE_FORMAT).to_string()),
            DefaultValue::CurrentTime => Value::Text(now.format(TIME_FORMAT).to_string()),
        }
    }
}
