//! Dialect hooks: everything target-specific the compiler delegates.
//!
//! The compiler itself is dialect-agnostic; anything that differs between
//! SQL targets (placeholder syntax, quoting, join keywords, locking,
//! pagination) goes through [`Dialect`].

use std::fmt;

use crate::model::JoinKind;

/// Where a `FOR UPDATE`-style locking clause is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockPlacement {
    /// Directly after the table reference (e.g. SQL Server table hints)
    AfterTable,
    /// At the end of the statement
    AtEnd,
}

/// Rendering rules for one SQL-like target.
///
/// Default methods describe plain ANSI behavior; dialects override the
/// points where they differ.
pub trait Dialect: fmt::Debug {
    /// Dialect name for diagnostics.
    fn name(&self) -> &'static str;

    /// Positional placeholder text for a 1-based index.
    fn placeholder(&self, index: usize) -> String;

    /// Quote an identifier.
    fn quote(&self, ident: &str) -> String {
        format!("\"{ident}\"")
    }

    /// Keyword for a join type.
    fn join_keyword(&self, kind: JoinKind) -> &'static str {
        match kind {
            JoinKind::Inner | JoinKind::Fetch => "INNER JOIN",
            JoinKind::Left | JoinKind::LeftFetch => "LEFT JOIN",
            JoinKind::Right | JoinKind::RightFetch => "RIGHT JOIN",
            JoinKind::Outer => "FULL OUTER JOIN",
        }
    }

    /// Native case-insensitive match operator, if the dialect has one.
    fn case_insensitive_like(&self) -> Option<&'static str> {
        None
    }

    /// Whether the dialect treats blank strings as NULL (changes string
    /// emptiness checks).
    fn treats_blank_as_null(&self) -> bool {
        false
    }

    /// List-emptiness expression for a collection-valued column.
    fn collection_is_empty(&self, column: &str) -> String {
        format!("({column} IS NULL OR CARDINALITY({column}) = 0)")
    }

    /// Inverse of [`Dialect::collection_is_empty`].
    fn collection_is_not_empty(&self, column: &str) -> String {
        format!("({column} IS NOT NULL AND CARDINALITY({column}) > 0)")
    }

    /// Whether pessimistic locking is supported.
    fn supports_for_update(&self) -> bool {
        true
    }

    /// Locking clause and its position.
    fn for_update_clause(&self) -> (LockPlacement, &'static str) {
        (LockPlacement::AtEnd, " FOR UPDATE")
    }

    /// Whether batch UPDATE/DELETE statements use a table alias. When they
    /// do not, columns are qualified by the table name itself.
    fn uses_alias_in_batch(&self) -> bool {
        false
    }

    /// Whether the target addresses columns by logical property path
    /// instead of a physical table alias (no physical aliases exist).
    fn computes_property_paths(&self) -> bool {
        false
    }

    /// String concatenation syntax, as open/separator/close pieces so the
    /// compiler can interleave placeholders with literal fragments.
    fn concat_open(&self) -> &'static str {
        "CONCAT("
    }
    fn concat_separator(&self) -> &'static str {
        ","
    }
    fn concat_close(&self) -> &'static str {
        ")"
    }

    /// Pagination clause for the given limit/offset, with a leading space.
    fn limit_offset(&self, limit: Option<i64>, offset: Option<i64>) -> String {
        let mut out = String::new();
        if let Some(limit) = limit {
            out.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            out.push_str(&format!(" OFFSET {offset}"));
        }
        out
    }
}

/// Plain ANSI SQL. `?` placeholders, `LOWER()` case folding, no pessimistic
/// locking guarantees.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ansi;

impl Dialect for Ansi {
    fn name(&self) -> &'static str {
        "ANSI"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn supports_for_update(&self) -> bool {
        false
    }
}

/// PostgreSQL. `$n` placeholders, native `ILIKE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "POSTGRES"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn case_insensitive_like(&self) -> Option<&'static str> {
        Some("ILIKE")
    }
}

/// Oracle. `?` placeholders, blank strings are NULL, `||` concatenation,
/// `OFFSET .. FETCH` pagination.
#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl Dialect for Oracle {
    fn name(&self) -> &'static str {
        "ORACLE"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn treats_blank_as_null(&self) -> bool {
        true
    }

    fn concat_open(&self) -> &'static str {
        "("
    }
    fn concat_separator(&self) -> &'static str {
        " || "
    }
    fn concat_close(&self) -> &'static str {
        ")"
    }

    fn limit_offset(&self, limit: Option<i64>, offset: Option<i64>) -> String {
        let mut out = String::new();
        if let Some(offset) = offset {
            out.push_str(&format!(" OFFSET {offset} ROWS"));
        }
        if let Some(limit) = limit {
            out.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
        out
    }
}
