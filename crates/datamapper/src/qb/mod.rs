//! Query builder: predicate accumulation, compilation and guarded mutations.
//!
//! Statements use `?` positional placeholders and `"`-quoted identifiers. The
//! Postgres gateway renumbers placeholders to `$1, $2, ...` at execution time.
//!
//! # Usage
//!
//! ```ignore
//! use datamapper::qb::{self, Expr};
//!
//! let stmt = qb::select("users")
//!     .set_cols(["id", "email"])
//!     .and_where("name = ?", ["yangyi"])
//!     .order("id desc")
//!     .limit(10)
//!     .compile()?;
//!
//! let count = qb::select("users").set_cols([Expr::new("count(1)")]).compile()?;
//!
//! // UPDATE / DELETE refuse to build without WHERE
//! qb::select("users")
//!     .and_where_one("id = ?", 1)
//!     .update([("name", "alice")])?
//!     .execute(&gateway)
//!     .await?;
//! ```

mod insert;
pub mod placeholder;
mod predicate;
mod select;
mod statement;

pub use insert::insert;
pub use predicate::{InList, PredicateList};
pub use select::{Column, Expr, Select};
pub use statement::Statement;

/// Create a SELECT query builder for the given table.
pub fn select(table: &str) -> Select {
    Select::new(table)
}

#[cfg(test)]
mod tests;
