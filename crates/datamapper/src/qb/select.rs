//! SELECT builder with guarded UPDATE / DELETE on the same predicates.

use crate::error::{OrmError, OrmResult};
use crate::qb::placeholder::quote_ident;
use crate::qb::predicate::{InList, PredicateList};
use crate::qb::statement::Statement;
use crate::value::Value;
use std::fmt;

/// A raw SQL expression, passed through verbatim (e.g. `count(1)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr(String);

impl Expr {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A projected column: a name (quoted) or a raw expression (verbatim).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Name(String),
    Expr(Expr),
}

impl Column {
    fn render(&self) -> String {
        match self {
            Column::Name(name) => quote_ident(name),
            Column::Expr(expr) => expr.0.clone(),
        }
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::Name(name.to_string())
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::Name(name)
    }
}

impl From<&String> for Column {
    fn from(name: &String) -> Self {
        Column::Name(name.clone())
    }
}

impl From<Expr> for Column {
    fn from(expr: Expr) -> Self {
        Column::Expr(expr)
    }
}

/// SELECT query builder over a single table.
///
/// ```ignore
/// let stmt = Select::new("users")
///     .set_cols(["id", "email"])
///     .and_where("name = ?", ["yangyi"])
///     .order("id desc")
///     .limit(10)
///     .compile()?;
/// ```
///
/// The same predicates drive [`Select::update`] and [`Select::delete`], which
/// refuse to build without a WHERE clause or with LIMIT/OFFSET/GROUP BY set.
#[derive(Debug, Clone)]
pub struct Select {
    table: String,
    cols: Vec<Column>,
    predicates: PredicateList,
    group: Option<String>,
    order: Option<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Select {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            cols: Vec::new(),
            predicates: PredicateList::new(),
            group: None,
            order: None,
            limit: None,
            offset: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    // ==================== Columns ====================

    /// Replace the projection. An empty list selects `*`.
    pub fn set_cols<I, C>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.cols = cols.into_iter().map(Into::into).collect();
        self
    }

    // ==================== WHERE ====================

    /// Add `(fragment)` with positional `?` parameters, combined with `AND`.
    pub fn and_where<I, V>(mut self, fragment: &str, params: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.predicates
            .push(fragment, params.into_iter().map(Into::into).collect());
        self
    }

    /// Add `(fragment)` with exactly one parameter.
    pub fn and_where_one(self, fragment: &str, param: impl Into<Value>) -> Self {
        self.and_where(fragment, [param.into()])
    }

    /// Add `(fragment)` without parameters.
    pub fn and_where_raw(self, fragment: &str) -> Self {
        self.and_where(fragment, Vec::<Value>::new())
    }

    /// Add `"column" IN (...)` from literal values or a sub-select.
    pub fn and_in(mut self, column: &str, list: impl Into<InList>) -> Self {
        self.predicates.push_in(column, list.into(), false);
        self
    }

    /// Add `"column" NOT IN (...)`.
    pub fn and_not_in(mut self, column: &str, list: impl Into<InList>) -> Self {
        self.predicates.push_in(column, list.into(), true);
        self
    }

    pub fn has_where(&self) -> bool {
        !self.predicates.is_empty()
    }

    // ==================== Modifiers ====================

    /// Set `ORDER BY` (raw). An empty string clears it.
    pub fn order(mut self, spec: &str) -> Self {
        self.order = non_empty(spec);
        self
    }

    /// Set `GROUP BY` (raw). An empty string clears it.
    pub fn group(mut self, spec: &str) -> Self {
        self.group = non_empty(spec);
        self
    }

    /// Set `LIMIT`. Anything but a positive integer clears it.
    pub fn limit(mut self, n: impl Into<Value>) -> Self {
        self.limit = positive_int(n.into());
        self
    }

    /// Set `OFFSET`. Anything but a positive integer clears it.
    pub fn offset(mut self, n: impl Into<Value>) -> Self {
        self.offset = positive_int(n.into());
        self
    }

    // ==================== Build ====================

    fn check_build_error(&self) -> OrmResult<()> {
        match self.predicates.build_error() {
            Some(err) => Err(OrmError::logic(err.to_string())),
            None => Ok(()),
        }
    }

    fn render_select(&self, params: &mut Vec<Value>) -> String {
        let cols = if self.cols.is_empty() {
            "*".to_string()
        } else {
            self.cols
                .iter()
                .map(Column::render)
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", cols, quote_ident(&self.table));

        let where_sql = self.predicates.build_into(params);
        if !where_sql.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        if let Some(group) = &self.group {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }
        if let Some(order) = &self.order {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        sql
    }

    /// Compile to SQL text and the ordered parameter list.
    pub fn compile(&self) -> OrmResult<Statement> {
        self.check_build_error()?;
        let mut params = Vec::new();
        let sql = self.render_select(&mut params);
        Ok(Statement::new(sql, params))
    }

    fn guard_mutation(&self, op: &str) -> OrmResult<()> {
        self.check_build_error()?;

        let reason = if self.predicates.is_empty() {
            Some("without where")
        } else if self.limit.is_some() {
            Some("with limit")
        } else if self.offset.is_some() {
            Some("with offset")
        } else if self.group.is_some() {
            Some("with group by")
        } else {
            None
        };

        match reason {
            Some(reason) => {
                tracing::warn!(
                    target: "datamapper.sql",
                    table = %self.table,
                    op,
                    reason,
                    "rejected destructive statement"
                );
                Err(OrmError::logic(format!("{} {}", op, reason)))
            }
            None => Ok(()),
        }
    }

    /// Build `UPDATE "table" SET ... WHERE ...` over this builder's predicates.
    ///
    /// Fails with [`OrmError::Logic`] without a WHERE clause, with
    /// LIMIT/OFFSET/GROUP BY set, or with nothing to set.
    pub fn update<I, K, V>(&self, values: I) -> OrmResult<Statement>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.guard_mutation("update")?;

        let mut params = Vec::new();
        let mut sets = Vec::new();
        for (col, value) in values {
            sets.push(format!("{} = ?", quote_ident(col.as_ref())));
            params.push(value.into());
        }
        if sets.is_empty() {
            return Err(OrmError::logic("update without values"));
        }

        let where_sql = self.predicates.build_into(&mut params);
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            quote_ident(&self.table),
            sets.join(", "),
            where_sql
        );
        Ok(Statement::new(sql, params))
    }

    /// Build `DELETE FROM "table" WHERE ...` over this builder's predicates.
    ///
    /// Same guard as [`Select::update`].
    pub fn delete(&self) -> OrmResult<Statement> {
        self.guard_mutation("delete")?;

        let mut params = Vec::new();
        let where_sql = self.predicates.build_into(&mut params);
        let sql = format!("DELETE FROM {} WHERE {}", quote_ident(&self.table), where_sql);
        Ok(Statement::new(sql, params))
    }
}

/// Renders the SELECT with `?` placeholders in place, for diagnostics.
impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params = Vec::new();
        f.write_str(&self.render_select(&mut params))
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

fn positive_int(v: Value) -> Option<u64> {
    match v {
        Value::Int(i) if i > 0 => Some(i as u64),
        Value::Float(f) => crate::coerce::float_to_i64(f)
            .filter(|n| *n > 0)
            .map(|n| n as u64),
        Value::Text(s) => s.trim().parse::<u64>().ok().filter(|n| *n > 0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_int_policy() {
        assert_eq!(positive_int(Value::Int(10)), Some(10));
        assert_eq!(positive_int(Value::from("20")), Some(20));
        assert_eq!(positive_int(Value::from("a")), None);
        assert_eq!(positive_int(Value::Int(0)), None);
        assert_eq!(positive_int(Value::Int(-3)), None);
        assert_eq!(positive_int(Value::Null), None);
        assert_eq!(positive_int(Value::Float(5.0)), Some(5));
        assert_eq!(positive_int(Value::Float(2.5)), None);
        assert_eq!(positive_int(Value::Float(1e30)), None);
        assert_eq!(positive_int(Value::Float(f64::INFINITY)), None);
    }

    #[test]
    fn update_puts_set_params_before_where_params() {
        let stmt = Select::new("users")
            .and_where_one("id = ?", 7)
            .update([("name", Value::from("alice")), ("age", Value::Int(30))])
            .unwrap();
        assert_eq!(
            stmt.sql,
            "UPDATE \"users\" SET \"name\" = ?, \"age\" = ? WHERE (id = ?)"
        );
        assert_eq!(
            stmt.params,
            vec![Value::from("alice"), Value::Int(30), Value::Int(7)]
        );
    }

    #[test]
    fn update_without_values_rejected() {
        let err = Select::new("users")
            .and_where_raw("id = 1")
            .update(Vec::<(&str, Value)>::new())
            .unwrap_err();
        assert!(err.is_logic());
    }

    #[test]
    fn delete_renders_where() {
        let stmt = Select::new("users")
            .and_in("id", vec![1, 2])
            .delete()
            .unwrap();
        assert_eq!(stmt.sql, "DELETE FROM \"users\" WHERE (\"id\" IN (1,2))");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn group_renders_before_order() {
        let sql = Select::new("t")
            .set_cols([Column::from("email"), Expr::new("count(1)").into()])
            .group("email")
            .order("email")
            .to_string();
        assert_eq!(
            sql,
            "SELECT \"email\", count(1) FROM \"t\" GROUP BY email ORDER BY email"
        );
    }
}
