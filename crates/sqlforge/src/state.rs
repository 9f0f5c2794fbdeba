//! Per-compilation query state.
//!
//! A [`QueryState`] is created at the top of each `build_*` call and dropped
//! when it returns; it is never shared across compilations. It owns the live
//! text buffer, the ordered parts list split around placeholders, the
//! placeholder position counter, the parameter bindings, the applied-join
//! registry and the additional named parameters.
//!
//! The parts/placeholder split mirrors the interleaved representation used
//! for prepared statements: allocating a placeholder snapshots the
//! accumulated text into the parts list and resets the buffer, so the final
//! statement is `parts[0] ph[0] parts[1] ph[1] ... parts[n]`.

use crate::dialect::Dialect;
use crate::entity::DataType;
use crate::model::{JoinKind, QueryModel};
use crate::result::QueryResult;

/// A rendered placeholder: dialect-specific text plus a stable lookup key.
#[derive(Debug, Clone)]
pub struct Placeholder {
    /// Dialect-rendered text, e.g. `?` or `$3`
    pub name: String,
    /// Stable lookup key (the 1-based position as a string)
    pub key: String,
    /// 1-based position
    pub index: usize,
}

/// A runtime parameter slot recorded during compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameterBinding {
    /// Placeholder lookup key
    pub key: String,
    /// 1-based placeholder position
    pub index: usize,
    pub data_type: DataType,
    /// Dotted path of the incoming method parameter supplying the value
    pub parameter_path: Option<String>,
    /// Dotted path of the persisted property the value targets; may differ
    /// from the parameter path under converters
    pub property_path: Option<String>,
    /// Collection-valued binding whose final placeholder count is known
    /// only at execution time
    pub expandable: bool,
    /// Value is produced by the persistence layer
    pub auto_populated: bool,
    /// Execution must supply the pre-update value (optimistic locking)
    pub requires_previous_value: bool,
}

/// A join applied during compilation: logical path, alias and join type.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedJoin {
    pub path: String,
    pub alias: String,
    pub kind: JoinKind,
}

/// Single-owner compilation context passed by reference through the
/// recursive descent.
pub struct QueryState<'a> {
    model: &'a QueryModel,
    dialect: &'a dyn Dialect,
    root_alias: String,
    allow_joins: bool,
    escape: bool,
    position: usize,
    query: String,
    parts: Vec<String>,
    placeholder_names: Vec<String>,
    bindings: Vec<QueryParameterBinding>,
    additional: Vec<(String, String)>,
    joins: Vec<AppliedJoin>,
    join_clauses: Vec<String>,
}

impl<'a> QueryState<'a> {
    pub(crate) fn new(
        model: &'a QueryModel,
        dialect: &'a dyn Dialect,
        root_alias: String,
        allow_joins: bool,
    ) -> Self {
        Self {
            escape: model.entity.escape,
            model,
            dialect,
            root_alias,
            allow_joins,
            position: 0,
            query: String::new(),
            parts: Vec::new(),
            placeholder_names: Vec::new(),
            bindings: Vec::new(),
            additional: Vec::new(),
            joins: Vec::new(),
            join_clauses: Vec::new(),
        }
    }

    /// The query model being compiled.
    pub fn model(&self) -> &'a QueryModel {
        self.model
    }

    /// The active dialect.
    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    /// Alias qualifying root-entity columns.
    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    /// Whether this compilation mode permits joins.
    pub fn allow_joins(&self) -> bool {
        self.allow_joins
    }

    /// Append literal SQL to the live buffer.
    pub fn push(&mut self, sql: &str) {
        self.query.push_str(sql);
    }

    /// Quote an identifier when the entity's escape policy asks for it.
    pub fn quote_ident(&self, ident: &str) -> String {
        if self.escape {
            self.dialect.quote(ident)
        } else {
            ident.to_string()
        }
    }

    /// Qualify a column with a table alias.
    pub fn qualify(&self, alias: &str, column: &str) -> String {
        format!("{alias}.{}", self.quote_ident(column))
    }

    /// Allocate the next positional placeholder.
    ///
    /// Snapshots the accumulated text into the parts list and resets the
    /// live buffer.
    pub fn next_placeholder(&mut self) -> Placeholder {
        self.position += 1;
        let name = self.dialect.placeholder(self.position);
        self.parts.push(std::mem::take(&mut self.query));
        self.placeholder_names.push(name.clone());
        Placeholder {
            name,
            key: self.position.to_string(),
            index: self.position,
        }
    }

    /// Record a parameter binding for the most recent placeholder.
    pub fn bind(&mut self, binding: QueryParameterBinding) {
        self.bindings.push(binding);
    }

    /// Record an additional named parameter resolved by name at execution
    /// time. Shares the placeholder counter with positional bindings.
    pub fn add_additional_parameter(&mut self, name: &str, key: String) {
        self.additional.push((name.to_string(), key));
    }

    /// Alias of an already-applied join path.
    pub fn join_alias(&self, path: &str) -> Option<&str> {
        self.joins
            .iter()
            .find(|j| j.path == path)
            .map(|j| j.alias.as_str())
    }

    /// Record an applied join and its rendered clause.
    pub fn record_join(&mut self, join: AppliedJoin, clause: String) {
        self.joins.push(join);
        self.join_clauses.push(clause);
    }

    /// Applied joins, in application order.
    pub fn joins(&self) -> &[AppliedJoin] {
        &self.joins
    }

    /// Rendered join clauses, in application order.
    pub fn join_clauses(&self) -> &[String] {
        &self.join_clauses
    }

    /// Assemble the final result: `head` is prepended to the first literal
    /// fragment, then fragments and placeholders are interleaved.
    pub(crate) fn finish(
        mut self,
        head: String,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> QueryResult {
        self.parts.push(std::mem::take(&mut self.query));
        self.parts[0] = format!("{head}{}", self.parts[0]);

        let mut query = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            query.push_str(part);
            if let Some(name) = self.placeholder_names.get(i) {
                query.push_str(name);
            }
        }

        QueryResult::new(
            query,
            self.parts,
            self.bindings,
            self.additional,
            self.joins,
            limit,
            offset,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Ansi, Postgres};
    use crate::entity::PersistentEntity;
    use crate::model::QueryModel;
    use std::sync::Arc;

    fn model() -> QueryModel {
        QueryModel::from(Arc::new(PersistentEntity::new("Book")))
    }

    fn scalar_binding(ph: &Placeholder) -> QueryParameterBinding {
        QueryParameterBinding {
            key: ph.key.clone(),
            index: ph.index,
            data_type: DataType::String,
            parameter_path: Some("p".into()),
            property_path: Some("title".into()),
            expandable: false,
            auto_populated: false,
            requires_previous_value: false,
        }
    }

    #[test]
    fn placeholders_interleave_with_parts() {
        let m = model();
        let mut state = QueryState::new(&m, &Ansi, "book_".into(), true);
        state.push("title = ");
        let ph = state.next_placeholder();
        let b = scalar_binding(&ph);
        state.bind(b);
        state.push(" AND pages > ");
        let ph = state.next_placeholder();
        let b = scalar_binding(&ph);
        state.bind(b);

        let result = state.finish("SELECT 1 WHERE ".into(), None, None);
        assert_eq!(result.query(), "SELECT 1 WHERE title = ? AND pages > ?");
        assert_eq!(
            result.query_parts(),
            &["SELECT 1 WHERE title = ".to_string(), " AND pages > ".into(), "".into()]
        );
        assert_eq!(result.parameter_bindings().len(), 2);
        assert_eq!(result.parameter_bindings()[0].key, "1");
        assert_eq!(result.parameter_bindings()[1].index, 2);
    }

    #[test]
    fn postgres_placeholders_are_numbered() {
        let m = model();
        let mut state = QueryState::new(&m, &Postgres, "book_".into(), true);
        state.push("a = ");
        state.next_placeholder();
        state.push(" AND b = ");
        state.next_placeholder();
        let result = state.finish("".into(), None, None);
        assert_eq!(result.query(), "a = $1 AND b = $2");
    }

    #[test]
    fn additional_parameters_share_the_counter() {
        let m = model();
        let mut state = QueryState::new(&m, &Postgres, "book_".into(), true);
        state.push("a = ");
        state.next_placeholder();
        state.push(" AND tenant = ");
        let ph = state.next_placeholder();
        state.add_additional_parameter("tenant", ph.key);
        let result = state.finish("".into(), None, None);
        assert_eq!(result.query(), "a = $1 AND tenant = $2");
        assert_eq!(
            result.additional_required_parameters(),
            &[("tenant".to_string(), "2".to_string())]
        );
    }
}
