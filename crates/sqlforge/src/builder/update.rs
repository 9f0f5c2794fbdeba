//! UPDATE compilation.

use crate::entity::{PersistentEntity, PropertyKind};
use crate::error::{BuildError, BuildResult};
use crate::model::{QueryModel, QueryValue};
use crate::path::resolve_property_path;
use crate::result::QueryResult;
use crate::state::{QueryParameterBinding, QueryState};

use super::SqlQueryBuilder;

impl SqlQueryBuilder {
    /// Compile an UPDATE statement setting `update` properties on rows
    /// matching the model's criteria.
    ///
    /// Batch statements only carry a table alias on dialects that support
    /// one; otherwise columns are qualified by the table name and join
    /// paths are rejected.
    pub fn build_update(
        &self,
        model: &QueryModel,
        update: &[(String, QueryValue)],
    ) -> BuildResult<QueryResult> {
        if update.is_empty() {
            return Err(BuildError::invalid_argument(
                "No update properties specified",
            ));
        }

        let allow_joins = self.dialect.uses_alias_in_batch();
        let root_alias = if allow_joins {
            model.entity.alias_name()
        } else {
            model.entity.table_name()
        };
        let mut state = QueryState::new(model, &*self.dialect, root_alias, allow_joins);

        state.push(" SET ");
        for (i, (path, value)) in update.iter().enumerate() {
            if i > 0 {
                state.push(",");
            }
            self.append_assignment(&mut state, path, value)?;
        }
        self.append_where(&mut state)?;

        let mut head = String::from("UPDATE ");
        head.push_str(&state.quote_ident(&model.entity.table_name()));
        if allow_joins {
            head.push(' ');
            head.push_str(state.root_alias());
            for clause in state.join_clauses() {
                head.push(' ');
                head.push_str(clause);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(dialect = self.dialect.name(), entity = %model.entity.name, "built update query");

        Ok(state.finish(head, None, None))
    }

    fn append_assignment(
        &self,
        state: &mut QueryState<'_>,
        path: &str,
        value: &QueryValue,
    ) -> BuildResult<()> {
        let entity = state.model().entity.clone();
        match entity.property(path).map(|p| &p.kind) {
            Some(PropertyKind::Association(association)) if association.is_foreign_key() => {
                return Err(BuildError::invalid_argument(format!(
                    "Cannot update association '{path}': entity '{}' does not own its foreign key",
                    entity.name
                )));
            }
            Some(PropertyKind::Embedded(embedded)) => {
                // compound values expand to one assignment per leaf column,
                // each bound to a sub-path of the same incoming value
                let QueryValue::Parameter(p) = value else {
                    return Err(BuildError::invalid_argument(format!(
                        "Embedded property '{path}' requires a parameter value"
                    )));
                };
                let mut leaves = Vec::new();
                embedded_leaves(embedded, path, &p.name, &mut leaves);
                if leaves.is_empty() {
                    return Err(BuildError::invalid_argument(format!(
                        "Embedded property '{path}' has no persistable columns"
                    )));
                }
                for (i, (leaf_path, parameter_path)) in leaves.iter().enumerate() {
                    if i > 0 {
                        state.push(",");
                    }
                    self.append_leaf(state, leaf_path, value, Some(parameter_path.clone()))?;
                }
                return Ok(());
            }
            _ => {}
        }
        self.append_leaf(state, path, value, None)
    }

    fn append_leaf(
        &self,
        state: &mut QueryState<'_>,
        path: &str,
        value: &QueryValue,
        parameter_path: Option<String>,
    ) -> BuildResult<()> {
        let entity = state.model().entity.clone();
        // no joins in batch mode, so this only walks local and embedded columns
        let rp = resolve_property_path(state, path)?;
        let column = state.quote_ident(&rp.column);
        state.push(&column);
        state.push(" = ");

        let template = match &rp.property.write_transform {
            Some(template) => {
                if template.matches('?').count() != 1 {
                    return Err(BuildError::invalid_argument(format!(
                        "Write transform for property '{path}' must contain exactly one '?' marker"
                    )));
                }
                Some(template.clone())
            }
            None => None,
        };

        match value {
            QueryValue::Parameter(p) => {
                let (pre, post) = match &template {
                    Some(template) => template.split_once('?').unwrap_or(("", "")),
                    None => ("", ""),
                };
                state.push(pre);
                let ph = state.next_placeholder();
                let is_version = entity
                    .version
                    .as_ref()
                    .is_some_and(|version| version.name == path);
                state.bind(QueryParameterBinding {
                    key: ph.key,
                    index: ph.index,
                    data_type: rp.property.data_type.clone(),
                    parameter_path: Some(parameter_path.unwrap_or_else(|| p.name.clone())),
                    property_path: Some(rp.path.clone()),
                    expandable: false,
                    auto_populated: rp.property.auto_populated,
                    requires_previous_value: is_version,
                });
                state.push(post);
            }
            QueryValue::Literal(literal) => {
                let rendered = literal.to_string();
                match &template {
                    Some(template) => state.push(&template.replacen('?', &rendered, 1)),
                    None => state.push(&rendered),
                }
            }
        }
        Ok(())
    }
}

/// Collect the assignable leaves of an embedded entity as
/// `(property path, parameter sub-path)` pairs, recursing through nested
/// embedded compounds. Target-owned associations have no local column.
fn embedded_leaves(
    entity: &PersistentEntity,
    path: &str,
    parameter: &str,
    out: &mut Vec<(String, String)>,
) {
    for property in &entity.properties {
        let leaf_path = format!("{path}.{}", property.name);
        let sub_path = format!("{parameter}.{}", property.name);
        match &property.kind {
            PropertyKind::Scalar => out.push((leaf_path, sub_path)),
            PropertyKind::Embedded(nested) => {
                embedded_leaves(nested, &leaf_path, &sub_path, out);
            }
            PropertyKind::Association(association) => {
                if !association.is_foreign_key() {
                    out.push((leaf_path, sub_path));
                }
            }
        }
    }
}
