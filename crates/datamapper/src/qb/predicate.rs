//! Ordered WHERE predicate accumulation.

use crate::qb::placeholder::{self, quote_ident};
use crate::qb::select::Select;
use crate::qb::statement::Statement;
use crate::value::Value;

/// Right-hand side of an `IN` predicate.
#[derive(Debug, Clone)]
pub enum InList {
    /// Literal values, inlined into the SQL text.
    ///
    /// Only pass trusted (ideally numeric) values: text is escaped but not bound.
    Values(Vec<Value>),
    /// A sub-select whose own parameters are spliced into the parent's.
    Subquery(Box<Select>),
}

impl<T: Into<Value>> From<Vec<T>> for InList {
    fn from(values: Vec<T>) -> Self {
        InList::Values(values.into_iter().map(Into::into).collect())
    }
}

impl From<Select> for InList {
    fn from(select: Select) -> Self {
        InList::Subquery(Box::new(select))
    }
}

#[derive(Debug, Clone)]
enum Predicate {
    Fragment {
        sql: String,
        params: Vec<Value>,
    },
    In {
        column: String,
        negated: bool,
        values: Vec<Value>,
    },
    InSubquery {
        column: String,
        negated: bool,
        sub: Statement,
    },
}

/// WHERE predicates combined with `AND`, each rendered in parentheses.
///
/// The parameter stream always lines up with the `?` placeholders across all
/// predicates in the order they were added. A fragment whose placeholder count
/// does not match its parameters is not added; the mismatch is kept as a build
/// error and reported when the owning statement is compiled.
#[derive(Debug, Clone, Default)]
pub struct PredicateList {
    predicates: Vec<Predicate>,
    build_error: Option<String>,
}

impl PredicateList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// First build error recorded, if any.
    pub fn build_error(&self) -> Option<&str> {
        self.build_error.as_deref()
    }

    fn record_error(&mut self, message: String) {
        if self.build_error.is_none() {
            self.build_error = Some(message);
        }
    }

    /// Add `(fragment)` with its positional parameters.
    pub fn push(&mut self, fragment: &str, params: Vec<Value>) {
        let placeholder_count = placeholder::count(fragment);
        if placeholder_count != params.len() {
            self.record_error(format!(
                "predicate param mismatch: '{}' has {} '?', but {} values provided",
                fragment,
                placeholder_count,
                params.len()
            ));
            return;
        }
        self.predicates.push(Predicate::Fragment {
            sql: fragment.to_string(),
            params,
        });
    }

    /// Add `"column" [NOT] IN (...)`.
    pub fn push_in(&mut self, column: &str, list: InList, negated: bool) {
        match list {
            InList::Values(values) => self.predicates.push(Predicate::In {
                column: column.to_string(),
                negated,
                values,
            }),
            InList::Subquery(select) => match select.compile() {
                Ok(sub) => self.predicates.push(Predicate::InSubquery {
                    column: column.to_string(),
                    negated,
                    sub,
                }),
                Err(e) => self.record_error(format!("subquery for '{}': {}", column, e)),
            },
        }
    }

    /// Render the predicates joined by `AND` (without the `WHERE` keyword) and
    /// append their parameters to `params`.
    pub fn build_into(&self, params: &mut Vec<Value>) -> String {
        let mut parts = Vec::with_capacity(self.predicates.len());

        for predicate in &self.predicates {
            match predicate {
                Predicate::Fragment { sql, params: p } => {
                    parts.push(format!("({})", sql));
                    params.extend(p.iter().cloned());
                }
                Predicate::In {
                    column,
                    negated,
                    values,
                } => {
                    let list = if values.is_empty() {
                        "NULL".to_string()
                    } else {
                        values
                            .iter()
                            .map(Value::sql_literal)
                            .collect::<Vec<_>>()
                            .join(",")
                    };
                    parts.push(format!(
                        "({} {} ({}))",
                        quote_ident(column),
                        in_keyword(*negated),
                        list
                    ));
                }
                Predicate::InSubquery {
                    column,
                    negated,
                    sub,
                } => {
                    parts.push(format!(
                        "({} {} ({}))",
                        quote_ident(column),
                        in_keyword(*negated),
                        sub.sql
                    ));
                    params.extend(sub.params.iter().cloned());
                }
            }
        }

        parts.join(" AND ")
    }

    /// Render and collect parameters into a fresh list.
    pub fn build(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let sql = self.build_into(&mut params);
        (sql, params)
    }
}

fn in_keyword(negated: bool) -> &'static str {
    if negated { "NOT IN" } else { "IN" }
}
