//! The SQL builders: entry points turning a [`QueryModel`](crate::model::QueryModel)
//! into a [`QueryResult`](crate::result::QueryResult).
//!
//! One [`SqlQueryBuilder`] is constructed per dialect and reused across
//! compilations; all per-call state lives in a
//! [`QueryState`](crate::state::QueryState) created at the top of each
//! `build_*` method.

mod criteria;
mod delete;
mod order_by;
mod select;
mod update;


use std::sync::LazyLock;

use regex::Regex;

use crate::dialect::{Ansi, Dialect, Oracle, Postgres};
use crate::error::{BuildError, BuildResult};
use crate::model::{Criterion, CriterionKind};
use crate::path::{entity_at_path, resolve_property_path};
use crate::state::QueryState;

pub use criteria::{CriteriaRenderer, CriterionHandler};

/// `:name` tokens inside externally supplied row filters. The first
/// alternative swallows `::type` casts so they are not read as parameters.
static NAMED_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"::[A-Za-z_][A-Za-z0-9_]*|:([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

/// Compiles query models into dialect-specific parameterized SQL.
///
/// Construction fixes the dialect and the criterion handler overrides; the
/// builder itself is immutable afterwards and can be shared freely.
pub struct SqlQueryBuilder {
    dialect: Box<dyn Dialect>,
    overrides: criteria::HandlerMap,
}

impl SqlQueryBuilder {
    /// A builder for the given dialect.
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self {
            dialect: Box::new(dialect),
            overrides: criteria::HandlerMap::new(),
        }
    }

    /// Plain ANSI SQL builder.
    pub fn ansi() -> Self {
        Self::new(Ansi)
    }

    /// PostgreSQL builder.
    pub fn postgres() -> Self {
        Self::new(Postgres)
    }

    /// Oracle builder.
    pub fn oracle() -> Self {
        Self::new(Oracle)
    }

    /// The dialect this builder targets.
    pub fn dialect(&self) -> &dyn Dialect {
        &*self.dialect
    }

    /// Replace the generation routine for one criterion kind.
    pub fn with_handler(mut self, kind: CriterionKind, handler: CriterionHandler) -> Self {
        self.overrides.insert(kind, handler);
        self
    }

    /// Reject a criterion kind at compile time instead of rendering it.
    pub fn without_criterion(self, kind: CriterionKind) -> Self {
        self.with_handler(kind, |_, criterion| {
            Err(BuildError::UnsupportedCriterion(
                criterion.kind().to_string(),
            ))
        })
    }

    /// Append the WHERE clause: the model's criteria tree plus any external
    /// row filters declared on the root entity or on joined entities.
    fn append_where(&self, state: &mut QueryState<'_>) -> BuildResult<()> {
        let model = state.model();
        let mut wrote = false;

        if let Some(criteria) = &model.criteria {
            state.push(" WHERE ");
            wrote = true;
            let mut renderer = CriteriaRenderer::new(state, &self.overrides);
            if criteria.is_junction() {
                renderer.render(criteria)?;
            } else {
                // a bare criterion still renders parenthesized
                renderer.render(&Criterion::Conjunction(vec![criteria.clone()]))?;
            }
        }

        // row filters, root first then joins in application order
        let mut filters = Vec::new();
        if let Some(fragment) = &model.entity.where_fragment {
            filters.push((state.root_alias().to_string(), fragment.clone()));
        }
        for join in state.joins().to_vec() {
            let entity = entity_at_path(&model.entity, &join.path)?;
            if let Some(fragment) = &entity.where_fragment {
                filters.push((join.alias, fragment.clone()));
            }
        }
        for (alias, fragment) in filters {
            if wrote {
                state.push(" AND ");
            } else {
                state.push(" WHERE ");
                wrote = true;
            }
            push_row_filter(state, &fragment, &alias);
        }
        Ok(())
    }
}

/// Append a row filter, substituting `@.` with the table alias and turning
/// `:name` tokens into placeholders recorded as additional required
/// parameters.
fn push_row_filter(state: &mut QueryState<'_>, fragment: &str, alias: &str) {
    let text = fragment.replace("@.", &format!("{alias}."));
    let mut last = 0;
    for caps in NAMED_PARAM.captures_iter(&text) {
        let Some(name) = caps.get(1) else {
            // a `::type` cast, not a parameter token
            continue;
        };
        let token = caps.get(0).unwrap();
        state.push(&text[last..token.start()]);
        let ph = state.next_placeholder();
        state.add_additional_parameter(name.as_str(), ph.key);
        last = token.end();
    }
    state.push(&text[last..]);
}

/// Append ` ORDER BY ...` for the model's sort orders, if any.
fn append_order_by(state: &mut QueryState<'_>) -> BuildResult<()> {
    let sort = state.model().sort.clone();
    if sort.is_empty() {
        return Ok(());
    }
    state.push(" ORDER BY ");
    for (i, order) in sort.iter().enumerate() {
        if i > 0 {
            state.push(",");
        }
        let rp = resolve_property_path(state, &order.property)?;
        let col = rp.column_ref(state);
        if order.ignore_case {
            state.push("LOWER(");
            state.push(&col);
            state.push(")");
        } else {
            state.push(&col);
        }
        state.push(" ");
        state.push(order.direction.keyword());
    }
    Ok(())
}
