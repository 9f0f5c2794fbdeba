//! SELECT compilation.

use std::sync::Arc;

use crate::dialect::LockPlacement;
use crate::entity::{PersistentEntity, PersistentProperty, PropertyKind};
use crate::error::{BuildError, BuildResult};
use crate::model::{JoinPath, Projection, QueryModel};
use crate::path::{apply_join_path, foreign_key_column, resolve_property_path};
use crate::result::QueryResult;
use crate::state::QueryState;

use super::SqlQueryBuilder;

impl SqlQueryBuilder {
    /// Compile a SELECT statement for `model`.
    ///
    /// Declared joins are applied depth-first in a stable order; joins
    /// required by criteria, projections or sort orders are applied on
    /// demand as those paths resolve.
    pub fn build_select(&self, model: &QueryModel) -> BuildResult<QueryResult> {
        let root_alias = model.entity.alias_name();
        let mut state = QueryState::new(model, &*self.dialect, root_alias, true);

        let mut declared: Vec<&JoinPath> = model.joins.iter().collect();
        declared.sort_by_key(|j| (j.path.matches('.').count(), j.path.clone()));
        for join in declared {
            apply_join_path(&mut state, &join.path)?;
        }
        // joins required by sort keys and projections must exist before the
        // WHERE clause renders, so their row filters are picked up there
        prepare_path_joins(&mut state)?;

        self.append_where(&mut state)?;
        super::append_order_by(&mut state)?;

        let pagination = self.dialect.limit_offset(model.limit, model.offset);
        state.push(&pagination);

        let mut lock_after_table = "";
        if model.for_update {
            if !self.dialect.supports_for_update() {
                return Err(BuildError::illegal_state(format!(
                    "Dialect {} does not support FOR UPDATE queries",
                    self.dialect.name()
                )));
            }
            let (placement, clause) = self.dialect.for_update_clause();
            match placement {
                LockPlacement::AfterTable => lock_after_table = clause,
                LockPlacement::AtEnd => state.push(clause),
            }
        }

        // the select list is assembled last so joins discovered while
        // rendering the WHERE clause still land in the head
        let (distinct, list) = self.select_list(&mut state)?;

        let mut head = String::from("SELECT ");
        if distinct {
            head.push_str("DISTINCT ");
        }
        head.push_str(&list.join(","));
        head.push_str(" FROM ");
        head.push_str(&state.quote_ident(&model.entity.table_name()));
        head.push(' ');
        head.push_str(state.root_alias());
        head.push_str(lock_after_table);
        for clause in state.join_clauses() {
            head.push(' ');
            head.push_str(clause);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(dialect = self.dialect.name(), entity = %model.entity.name, "built select query");

        Ok(state.finish(head, model.limit, model.offset))
    }

    fn select_list(&self, state: &mut QueryState<'_>) -> BuildResult<(bool, Vec<String>)> {
        let model = state.model();
        let mut distinct = false;
        let mut list = Vec::new();

        let explicit: Vec<&Projection> = model
            .projections
            .iter()
            .filter(|p| {
                if matches!(p, Projection::Distinct) {
                    distinct = true;
                    false
                } else {
                    true
                }
            })
            .collect();

        if explicit.is_empty() {
            entity_columns(state, &model.entity, state.root_alias(), "", &mut list)?;
            let fetched: Vec<_> = state
                .joins()
                .iter()
                .filter(|j| j.kind.is_fetch())
                .map(|j| (j.path.clone(), j.alias.clone()))
                .collect();
            for (path, alias) in fetched {
                let entity = crate::path::entity_at_path(&model.entity, &path)?;
                entity_columns(state, &entity, &alias, "", &mut list)?;
            }
            return Ok((distinct, list));
        }

        for projection in explicit {
            match projection {
                Projection::Distinct => {}
                Projection::Literal(sql) => list.push(sql.clone()),
                Projection::Count => list.push("COUNT(*)".to_string()),
                Projection::CountDistinct(path) => {
                    let rp = resolve_property_path(state, path)?;
                    let col = rp.column_ref(state);
                    list.push(format!("COUNT(DISTINCT {col})"));
                }
                Projection::Id => {
                    let entity = model.entity.clone();
                    if !entity.has_identity() {
                        return Err(BuildError::illegal_state(format!(
                            "Entity '{}' has no identity",
                            entity.name
                        )));
                    }
                    for id in &entity.identity {
                        list.push(scalar_ref(state, &entity, state.root_alias(), "", id));
                    }
                }
                Projection::Property(path) => {
                    if let Some(target) = association_target(&model.entity, path) {
                        // association projections expand to the joined table's
                        // columns, plus any fetch joins nested under the path
                        let alias = apply_join_path(state, path)?;
                        entity_columns(state, &target, &alias, "", &mut list)?;
                        let nested_prefix = format!("{path}.");
                        let nested: Vec<_> = state
                            .joins()
                            .iter()
                            .filter(|j| j.kind.is_fetch() && j.path.starts_with(&nested_prefix))
                            .map(|j| (j.path.clone(), j.alias.clone()))
                            .collect();
                        for (nested_path, nested_alias) in nested {
                            let entity = crate::path::entity_at_path(&model.entity, &nested_path)?;
                            entity_columns(state, &entity, &nested_alias, "", &mut list)?;
                        }
                    } else {
                        let rp = resolve_property_path(state, path)?;
                        let col = rp.column_ref(state);
                        list.push(apply_read_transform(&rp.property, &col));
                    }
                }
                Projection::Sum(path) => list.push(self.aggregate(state, "SUM", path)?),
                Projection::Avg(path) => list.push(self.aggregate(state, "AVG", path)?),
                Projection::Min(path) => list.push(self.aggregate(state, "MIN", path)?),
                Projection::Max(path) => list.push(self.aggregate(state, "MAX", path)?),
            }
        }
        Ok((distinct, list))
    }

    fn aggregate(
        &self,
        state: &mut QueryState<'_>,
        function: &str,
        path: &str,
    ) -> BuildResult<String> {
        let rp = resolve_property_path(state, path)?;
        let col = rp.column_ref(state);
        Ok(format!("{function}({col})"))
    }
}

/// Resolve every property path the model's sort orders and projections
/// reference, for the joins this applies as a side effect. Rendering later
/// reuses the applied joins.
fn prepare_path_joins(state: &mut QueryState<'_>) -> BuildResult<()> {
    let model = state.model();
    for order in &model.sort {
        resolve_property_path(state, &order.property)?;
    }
    for projection in &model.projections {
        match projection {
            Projection::Property(path) => {
                if association_target(&model.entity, path).is_some() {
                    apply_join_path(state, path)?;
                } else {
                    resolve_property_path(state, path)?;
                }
            }
            Projection::CountDistinct(path)
            | Projection::Sum(path)
            | Projection::Avg(path)
            | Projection::Min(path)
            | Projection::Max(path) => {
                resolve_property_path(state, path)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Whether `path` names an association property, returning its target.
fn association_target(
    root: &Arc<PersistentEntity>,
    path: &str,
) -> Option<Arc<PersistentEntity>> {
    let mut entity = root.clone();
    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        let property = entity.property(segment)?;
        match &property.kind {
            PropertyKind::Association(a) => {
                let target = a.target.clone();
                if i + 1 == segments.len() {
                    return Some(target);
                }
                entity = target;
            }
            _ => return None,
        }
    }
    None
}

fn apply_read_transform(property: &PersistentProperty, column_ref: &str) -> String {
    match &property.read_transform {
        Some(template) => template.replacen('?', column_ref, 1),
        None => column_ref.to_string(),
    }
}

fn scalar_ref(
    state: &QueryState<'_>,
    entity: &PersistentEntity,
    alias: &str,
    prefix: &str,
    property: &PersistentProperty,
) -> String {
    let column = match &property.column {
        Some(column) => column.clone(),
        None => {
            let own = property.column_name(entity.naming);
            if prefix.is_empty() {
                own
            } else {
                format!("{prefix}_{own}")
            }
        }
    };
    apply_read_transform(property, &state.qualify(alias, &column))
}

/// All selectable columns of `entity` under `alias`: identity, version, then
/// declared properties. Embedded properties flatten with a column prefix;
/// owning associations contribute their foreign-key column; target-owned
/// associations have no local column and are skipped.
fn entity_columns(
    state: &QueryState<'_>,
    entity: &PersistentEntity,
    alias: &str,
    prefix: &str,
    out: &mut Vec<String>,
) -> BuildResult<()> {
    for id in &entity.identity {
        out.push(scalar_ref(state, entity, alias, prefix, id));
    }
    if let Some(version) = &entity.version {
        out.push(scalar_ref(state, entity, alias, prefix, version));
    }
    for property in &entity.properties {
        match &property.kind {
            PropertyKind::Scalar => {
                out.push(scalar_ref(state, entity, alias, prefix, property));
            }
            PropertyKind::Embedded(embedded) => {
                let own = entity.naming.mapped_name(&property.name);
                let nested = if prefix.is_empty() {
                    own
                } else {
                    format!("{prefix}_{own}")
                };
                entity_columns(state, embedded, alias, &nested, out)?;
            }
            PropertyKind::Association(association) => {
                if association.is_foreign_key() {
                    continue;
                }
                let column = foreign_key_column(property, entity, &association.target)?;
                out.push(state.qualify(alias, &column));
            }
        }
    }
    Ok(())
}
