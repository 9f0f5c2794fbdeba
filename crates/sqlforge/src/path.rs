//! Dotted property path resolution and join application.
//!
//! Paths are resolved against the entity/association graph relative to the
//! compilation's root alias. Crossing an embedded segment flattens into the
//! owner's table; crossing an association applies a join, except when only
//! the identity of an owning association is needed (the identity value is
//! locally embedded as the foreign-key column).

use std::sync::Arc;

use crate::entity::{Association, AssociationKind, PersistentEntity, PersistentProperty, PropertyKind};
use crate::error::{BuildError, BuildResult};
use crate::model::JoinKind;
use crate::state::{AppliedJoin, QueryState};

/// A property path resolved to a concrete column reference.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    /// The leaf property (for association identity shortcuts, the target's
    /// identity property)
    pub property: PersistentProperty,
    /// The logical dotted path as written
    pub path: String,
    /// Table alias qualifying the column
    pub alias: String,
    /// Unquoted column name (embedded prefixes already applied)
    pub column: String,
}

impl ResolvedPath {
    /// The qualified, quoted column reference for this path.
    ///
    /// Dialects that compute property paths instead of physical aliases get
    /// the logical dotted path under the root alias.
    pub fn column_ref(&self, state: &QueryState<'_>) -> String {
        if state.dialect().computes_property_paths() {
            format!("{}.{}", state.root_alias(), self.path)
        } else {
            state.qualify(&self.alias, &self.column)
        }
    }
}

/// Foreign-key column name for an owning association property.
pub(crate) fn foreign_key_column(
    property: &PersistentProperty,
    owner: &PersistentEntity,
    target: &PersistentEntity,
) -> BuildResult<String> {
    if let Some(column) = &property.column {
        return Ok(column.clone());
    }
    let id = target.identity_single().ok_or_else(|| {
        BuildError::illegal_state(format!(
            "Association '{}' targets entity '{}' without a simple identity",
            property.name, target.name
        ))
    })?;
    Ok(format!(
        "{}_{}",
        owner.naming.mapped_name(&property.name),
        id.column_name(target.naming)
    ))
}

fn join_alias_for(root_alias: &str, path: &str) -> String {
    let mut alias = format!("{root_alias}{}_", path.replace('.', "_"));
    while alias.contains("__") {
        alias = alias.replace("__", "_");
    }
    alias
}

/// Entity metadata at the end of an association path.
pub(crate) fn entity_at_path(
    root: &Arc<PersistentEntity>,
    path: &str,
) -> BuildResult<Arc<PersistentEntity>> {
    let mut entity = root.clone();
    for segment in path.split('.') {
        let assoc = entity
            .property(segment)
            .and_then(|p| p.as_association())
            .cloned()
            .ok_or_else(|| BuildError::unknown_property(&root.name, path))?;
        entity = assoc.target;
    }
    Ok(entity)
}

fn join_condition(
    state: &QueryState<'_>,
    owner: &PersistentEntity,
    owner_alias: &str,
    property: &PersistentProperty,
    association: &Association,
    target: &PersistentEntity,
    alias: &str,
) -> BuildResult<String> {
    if association.is_foreign_key() {
        // foreign key lives on the target table
        let owner_id = owner.identity_single().ok_or_else(|| {
            BuildError::illegal_state(format!(
                "Joins from entity '{}' require a simple identity",
                owner.name
            ))
        })?;
        let back_column = match &association.mapped_by {
            Some(mapped_by) => {
                let back = target.property(mapped_by).ok_or_else(|| {
                    BuildError::unknown_property(&target.name, mapped_by.clone())
                })?;
                foreign_key_column(back, target, owner)?
            }
            None => format!(
                "{}_{}",
                target.naming.mapped_name(&owner.name),
                owner_id.column_name(owner.naming)
            ),
        };
        Ok(format!(
            "{} = {}",
            state.qualify(owner_alias, &owner_id.column_name(owner.naming)),
            state.qualify(alias, &back_column)
        ))
    } else {
        let target_id = target.identity_single().ok_or_else(|| {
            BuildError::illegal_state(format!(
                "Joins into entity '{}' require a simple identity",
                target.name
            ))
        })?;
        Ok(format!(
            "{} = {}",
            state.qualify(owner_alias, &foreign_key_column(property, owner, target)?),
            state.qualify(alias, &target_id.column_name(target.naming))
        ))
    }
}

/// Apply all joins needed to reach `path`, reusing already-applied prefixes
/// and declared join metadata. Returns the alias of the deepest joined table.
pub fn apply_join_path(state: &mut QueryState<'_>, path: &str) -> BuildResult<String> {
    if let Some(alias) = state.join_alias(path) {
        return Ok(alias.to_string());
    }
    if !state.allow_joins() {
        return Err(BuildError::invalid_argument(format!(
            "Joins cannot be used in this query: {path}"
        )));
    }

    let model = state.model();
    let mut owner: Arc<PersistentEntity> = model.entity.clone();
    let mut owner_alias = state.root_alias().to_string();
    let mut current = String::new();

    for segment in path.split('.') {
        if !current.is_empty() {
            current.push('.');
        }
        current.push_str(segment);

        let property = owner
            .property(segment)
            .cloned()
            .ok_or_else(|| BuildError::unknown_property(&model.entity.name, path))?;
        let association = property.as_association().cloned().ok_or_else(|| {
            BuildError::invalid_argument(format!(
                "Segment '{segment}' of join path '{path}' is not an association"
            ))
        })?;
        if matches!(association.kind, AssociationKind::ManyToMany) {
            return Err(BuildError::illegal_state(format!(
                "Many-to-many join paths are not supported: {path}"
            )));
        }
        let target = association.target.clone();

        if let Some(alias) = state.join_alias(&current) {
            owner_alias = alias.to_string();
        } else {
            // a declared join path keeps its requested type and alias
            let declared = model.declared_join(&current);
            let kind = declared.map(|j| j.kind).unwrap_or(JoinKind::Inner);
            let alias = declared
                .and_then(|j| j.alias.clone())
                .or_else(|| association.alias.clone())
                .unwrap_or_else(|| join_alias_for(state.root_alias(), &current));
            let on = join_condition(
                state,
                &owner,
                &owner_alias,
                &property,
                &association,
                &target,
                &alias,
            )?;
            let clause = format!(
                "{} {} {} ON {}",
                state.dialect().join_keyword(kind),
                state.quote_ident(&target.table_name()),
                alias,
                on
            );
            state.record_join(
                AppliedJoin {
                    path: current.clone(),
                    alias: alias.clone(),
                    kind,
                },
                clause,
            );
            owner_alias = alias;
        }
        owner = target;
    }
    Ok(owner_alias)
}

/// Resolve a dotted property path to a column reference, applying joins as
/// required.
pub fn resolve_property_path(
    state: &mut QueryState<'_>,
    path: &str,
) -> BuildResult<ResolvedPath> {
    let model = state.model();
    let mut entity: Arc<PersistentEntity> = model.entity.clone();
    let mut alias = state.root_alias().to_string();
    let mut column_prefix = String::new();

    let unknown = || BuildError::unknown_property(&model.entity.name, path);

    let segments: Vec<&str> = path.split('.').collect();
    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();
        let property = entity.property(segment).cloned().ok_or_else(unknown)?;

        if last {
            let column = property.column.clone().unwrap_or_else(|| {
                let own = property.column_name(entity.naming);
                if column_prefix.is_empty() {
                    own
                } else {
                    format!("{column_prefix}_{own}")
                }
            });
            if let Some(association) = property.as_association() {
                let target = association.target.clone();
                if association.is_foreign_key() {
                    // no local column; reach the target identity through a join
                    let join_alias = apply_join_path(state, path)?;
                    let id = target.identity_single().cloned().ok_or_else(|| {
                        BuildError::illegal_state(format!(
                            "Association '{path}' targets entity '{}' without a simple identity",
                            target.name
                        ))
                    })?;
                    let column = id.column_name(target.naming);
                    return Ok(ResolvedPath {
                        property: id,
                        path: path.to_string(),
                        alias: join_alias,
                        column,
                    });
                }
                let column = foreign_key_column(&property, &entity, &target)?;
                let id = target.identity_single().cloned().ok_or_else(|| {
                    BuildError::illegal_state(format!(
                        "Association '{path}' targets entity '{}' without a simple identity",
                        target.name
                    ))
                })?;
                return Ok(ResolvedPath {
                    property: PersistentProperty {
                        data_type: id.data_type,
                        ..property
                    },
                    path: path.to_string(),
                    alias,
                    column,
                });
            }
            return Ok(ResolvedPath {
                property,
                path: path.to_string(),
                alias,
                column,
            });
        }

        match &property.kind {
            PropertyKind::Embedded(embedded) => {
                let own = entity.naming.mapped_name(&property.name);
                if column_prefix.is_empty() {
                    column_prefix = own;
                } else {
                    column_prefix = format!("{column_prefix}_{own}");
                }
                entity = embedded.clone();
            }
            PropertyKind::Association(association) => {
                let target = association.target.clone();
                let remaining = &segments[i + 1..];
                let identity_only = remaining.len() == 1
                    && target
                        .identity_single()
                        .is_some_and(|id| remaining[0] == "id" || remaining[0] == id.name);
                if identity_only && !association.is_foreign_key() {
                    // identity is locally embedded as the foreign-key column
                    let id = target
                        .identity_single()
                        .cloned()
                        .ok_or_else(unknown)?;
                    let column = foreign_key_column(&property, &entity, &target)?;
                    return Ok(ResolvedPath {
                        property: id,
                        path: path.to_string(),
                        alias,
                        column,
                    });
                }
                let join_path = segments[..=i].join(".");
                alias = apply_join_path(state, &join_path)?;
                entity = target;
            }
            PropertyKind::Scalar => return Err(unknown()),
        }
    }
    Err(unknown())
}
