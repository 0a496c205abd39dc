//! INSERT statement builder.

use crate::qb::placeholder::quote_ident;
use crate::qb::statement::Statement;
use crate::value::Value;

/// Build `INSERT INTO "table" ("a", "b") VALUES (?, ?)`.
///
/// With no values this renders `INSERT INTO "table" DEFAULT VALUES`.
pub fn insert<I, K, V>(table: &str, values: I) -> Statement
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    let mut cols = Vec::new();
    let mut params = Vec::new();
    for (col, value) in values {
        cols.push(quote_ident(col.as_ref()));
        params.push(value.into());
    }

    if cols.is_empty() {
        return Statement::new(
            format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table)),
            params,
        );
    }

    let placeholders = vec!["?"; cols.len()].join(", ");
    Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            cols.join(", "),
            placeholders
        ),
        params,
    )
}
