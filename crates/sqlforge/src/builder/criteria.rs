//! Criterion rendering: the dispatch from criterion kind to SQL fragment.
//!
//! Dispatch is an exhaustive match over the [`Criterion`] tagged union, with
//! a per-builder override map keyed by [`CriterionKind`] checked first. The
//! override map is built once at builder construction and read-only
//! afterwards.
//!
//! Nested association criteria are handled by prefixing child property names
//! with the association path and re-dispatching through the same renderer.

use std::collections::HashMap;
use std::sync::Arc;

use crate::entity::PersistentEntity;
use crate::error::{BuildError, BuildResult};
use crate::model::{Criterion, CriterionKind, Literal, QueryValue};
use crate::path::{resolve_property_path, ResolvedPath};
use crate::state::{QueryParameterBinding, QueryState};

/// A criterion generation routine. Appends to the active buffer through the
/// renderer; returning an error aborts the compilation.
pub type CriterionHandler =
    fn(&mut CriteriaRenderer<'_, '_>, &Criterion) -> BuildResult<()>;

pub(crate) type HandlerMap = HashMap<CriterionKind, CriterionHandler>;

/// Recursive-descent renderer for a criteria tree.
pub struct CriteriaRenderer<'a, 'b> {
    state: &'b mut QueryState<'a>,
    overrides: &'b HandlerMap,
    /// Association path prefix for nested criteria
    prefix: String,
}

impl<'a, 'b> CriteriaRenderer<'a, 'b> {
    pub(crate) fn new(state: &'b mut QueryState<'a>, overrides: &'b HandlerMap) -> Self {
        Self {
            state,
            overrides,
            prefix: String::new(),
        }
    }

    /// The compilation state, for override handlers.
    pub fn state(&mut self) -> &mut QueryState<'a> {
        self.state
    }

    /// Entity metadata of the current association scope.
    fn scoped_entity(&self) -> BuildResult<Arc<PersistentEntity>> {
        let root = self.state.model().entity.clone();
        if self.prefix.is_empty() {
            Ok(root)
        } else {
            crate::path::entity_at_path(&root, self.prefix.trim_end_matches('.'))
        }
    }

    /// Resolve a property name in the current association scope.
    pub fn resolve(&mut self, property: &str) -> BuildResult<ResolvedPath> {
        let qualified = if self.prefix.is_empty() {
            property.to_string()
        } else {
            format!("{}{}", self.prefix, property)
        };
        resolve_property_path(self.state, &qualified)
    }

    /// Render one criterion, override map first.
    pub fn render(&mut self, criterion: &Criterion) -> BuildResult<()> {
        if let Some(&handler) = self.overrides.get(&criterion.kind()) {
            return handler(self, criterion);
        }
        self.render_builtin(criterion)
    }

    /// The built-in generation routine for `criterion`.
    pub fn render_builtin(&mut self, criterion: &Criterion) -> BuildResult<()> {
        match criterion {
            Criterion::Conjunction(children) => self.junction(children, " AND ", false),
            Criterion::Disjunction(children) => self.junction(children, " OR ", false),
            Criterion::Negation(children) => self.junction(children, " AND ", true),

            Criterion::Equals { property, value, ignore_case } => {
                self.comparison(property, "=", value, *ignore_case)
            }
            Criterion::NotEquals { property, value, ignore_case } => {
                self.comparison(property, "!=", value, *ignore_case)
            }
            Criterion::GreaterThan { property, value } => {
                self.comparison(property, ">", value, false)
            }
            Criterion::GreaterThanEquals { property, value } => {
                self.comparison(property, ">=", value, false)
            }
            Criterion::LessThan { property, value } => {
                self.comparison(property, "<", value, false)
            }
            Criterion::LessThanEquals { property, value } => {
                self.comparison(property, "<=", value, false)
            }

            Criterion::EqualsProperty { property, other } => {
                self.property_comparison(property, "=", other)
            }
            Criterion::NotEqualsProperty { property, other } => {
                self.property_comparison(property, "!=", other)
            }
            Criterion::GreaterThanProperty { property, other } => {
                self.property_comparison(property, ">", other)
            }
            Criterion::GreaterThanEqualsProperty { property, other } => {
                self.property_comparison(property, ">=", other)
            }
            Criterion::LessThanProperty { property, other } => {
                self.property_comparison(property, "<", other)
            }
            Criterion::LessThanEqualsProperty { property, other } => {
                self.property_comparison(property, "<=", other)
            }

            Criterion::IsNull(property) => self.suffix(property, " IS NULL"),
            Criterion::IsNotNull(property) => self.suffix(property, " IS NOT NULL"),
            Criterion::IsTrue(property) => self.suffix(property, " = TRUE"),
            Criterion::IsFalse(property) => self.suffix(property, " = FALSE"),

            Criterion::IsEmpty(property) => self.emptiness(property, true),
            Criterion::IsNotEmpty(property) => self.emptiness(property, false),

            Criterion::IdEquals { value } => self.id_equals(value),
            Criterion::VersionEquals { value } => self.version_equals(value),

            Criterion::Between { property, from, to } => self.between(property, from, to),

            Criterion::Like { property, value } => {
                let rp = self.resolve(property)?;
                let col = rp.column_ref(self.state);
                self.state.push(&col);
                self.state.push(" LIKE ");
                self.value(&rp, value)
            }
            Criterion::ILike { property, value } => self.ilike(property, value),

            Criterion::StartsWith { property, value, ignore_case } => {
                self.pattern(property, value, *ignore_case, false, true)
            }
            Criterion::EndsWith { property, value, ignore_case } => {
                self.pattern(property, value, *ignore_case, true, false)
            }
            Criterion::Contains { property, value, ignore_case } => {
                self.pattern(property, value, *ignore_case, true, true)
            }

            Criterion::In { property, value } => self.in_list(property, value, false),
            Criterion::NotIn { property, value } => self.in_list(property, value, true),

            Criterion::AssociationQuery { association, criteria } => {
                self.association_query(association, criteria)
            }
        }
    }

    fn junction(
        &mut self,
        children: &[Criterion],
        separator: &str,
        negated: bool,
    ) -> BuildResult<()> {
        if children.is_empty() {
            return Err(BuildError::invalid_argument(
                "Junction requires at least one criterion",
            ));
        }
        self.state.push(if negated { "NOT(" } else { "(" });
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.state.push(separator);
            }
            self.render(child)?;
        }
        self.state.push(")");
        Ok(())
    }

    /// Bind a parameter or inline a literal after the operator.
    fn value(&mut self, rp: &ResolvedPath, value: &QueryValue) -> BuildResult<()> {
        self.value_with(rp, value, false, None)
    }

    fn value_with(
        &mut self,
        rp: &ResolvedPath,
        value: &QueryValue,
        expandable: bool,
        parameter_path: Option<String>,
    ) -> BuildResult<()> {
        match value {
            QueryValue::Parameter(p) => {
                let ph = self.state.next_placeholder();
                self.state.bind(QueryParameterBinding {
                    key: ph.key,
                    index: ph.index,
                    data_type: rp.property.data_type.clone(),
                    parameter_path: Some(parameter_path.unwrap_or_else(|| p.name.clone())),
                    property_path: Some(rp.path.clone()),
                    expandable,
                    auto_populated: rp.property.auto_populated,
                    requires_previous_value: false,
                });
                Ok(())
            }
            QueryValue::Literal(literal) => {
                self.state.push(&literal.to_string());
                Ok(())
            }
        }
    }

    fn comparison(
        &mut self,
        property: &str,
        op: &str,
        value: &QueryValue,
        ignore_case: bool,
    ) -> BuildResult<()> {
        let rp = self.resolve(property)?;
        let col = rp.column_ref(self.state);
        if ignore_case {
            self.state.push("LOWER(");
            self.state.push(&col);
            self.state.push(") ");
            self.state.push(op);
            self.state.push(" LOWER(");
            self.value(&rp, value)?;
            self.state.push(")");
        } else {
            self.state.push(&col);
            self.state.push(" ");
            self.state.push(op);
            self.state.push(" ");
            self.value(&rp, value)?;
        }
        Ok(())
    }

    fn property_comparison(&mut self, property: &str, op: &str, other: &str) -> BuildResult<()> {
        let left = self.resolve(property)?;
        let right = self.resolve(other)?;
        let left = left.column_ref(self.state);
        let right = right.column_ref(self.state);
        self.state.push(&left);
        self.state.push(" ");
        self.state.push(op);
        self.state.push(" ");
        self.state.push(&right);
        Ok(())
    }

    fn suffix(&mut self, property: &str, suffix: &str) -> BuildResult<()> {
        let rp = self.resolve(property)?;
        let col = rp.column_ref(self.state);
        self.state.push(&col);
        self.state.push(suffix);
        Ok(())
    }

    fn emptiness(&mut self, property: &str, empty: bool) -> BuildResult<()> {
        let rp = self.resolve(property)?;
        let col = rp.column_ref(self.state);
        let data_type = &rp.property.data_type;
        if data_type.is_string() {
            let blank_is_null = self.state.dialect().treats_blank_as_null();
            let fragment = match (empty, blank_is_null) {
                (true, true) => format!("{col} IS NULL"),
                (true, false) => format!("({col} IS NULL OR {col} = '')"),
                (false, true) => format!("{col} IS NOT NULL"),
                (false, false) => format!("({col} IS NOT NULL AND {col} <> '')"),
            };
            self.state.push(&fragment);
            Ok(())
        } else if data_type.is_collection() {
            let fragment = if empty {
                self.state.dialect().collection_is_empty(&col)
            } else {
                self.state.dialect().collection_is_not_empty(&col)
            };
            self.state.push(&fragment);
            Ok(())
        } else {
            Err(BuildError::invalid_argument(format!(
                "IsEmpty is not supported for property '{property}' of type {data_type:?}"
            )))
        }
    }

    fn id_equals(&mut self, value: &QueryValue) -> BuildResult<()> {
        let entity = self.scoped_entity()?;
        if !entity.has_identity() {
            return Err(BuildError::illegal_state(format!(
                "Entity '{}' has no identity",
                entity.name
            )));
        }
        if entity.has_composite_identity() {
            let QueryValue::Parameter(p) = value else {
                return Err(BuildError::invalid_argument(
                    "Composite identity criteria require a parameter value",
                ));
            };
            self.state.push("(");
            let identity = entity.identity.clone();
            for (i, id) in identity.iter().enumerate() {
                if i > 0 {
                    self.state.push(" AND ");
                }
                let rp = self.resolve(&id.name)?;
                let col = rp.column_ref(self.state);
                self.state.push(&col);
                self.state.push(" = ");
                // each column binds a sub-path of the same incoming value
                self.value_with(&rp, value, false, Some(format!("{}.{}", p.name, id.name)))?;
            }
            self.state.push(")");
            Ok(())
        } else {
            let id = entity.identity[0].name.clone();
            self.comparison(&id, "=", value, false)
        }
    }

    fn version_equals(&mut self, value: &QueryValue) -> BuildResult<()> {
        let entity = self.scoped_entity()?;
        let version = entity.version.as_ref().ok_or_else(|| {
            BuildError::illegal_state(format!(
                "Entity '{}' has no version property",
                entity.name
            ))
        })?;
        self.comparison(&version.name.clone(), "=", value, false)
    }

    fn between(&mut self, property: &str, from: &QueryValue, to: &QueryValue) -> BuildResult<()> {
        let rp = self.resolve(property)?;
        let col = rp.column_ref(self.state);
        self.state.push("(");
        self.state.push(&col);
        self.state.push(" >= ");
        self.value(&rp, from)?;
        self.state.push(" AND ");
        self.state.push(&col);
        self.state.push(" <= ");
        self.value(&rp, to)?;
        self.state.push(")");
        Ok(())
    }

    fn ilike(&mut self, property: &str, value: &QueryValue) -> BuildResult<()> {
        let rp = self.resolve(property)?;
        let col = rp.column_ref(self.state);
        if let Some(op) = self.state.dialect().case_insensitive_like() {
            self.state.push(&col);
            self.state.push(" ");
            self.state.push(op);
            self.state.push(" ");
            self.value(&rp, value)
        } else {
            self.state.push("LOWER(");
            self.state.push(&col);
            self.state.push(") LIKE LOWER(");
            self.value(&rp, value)?;
            self.state.push(")");
            Ok(())
        }
    }

    /// StartsWith / Contains / EndsWith: the bound value flanked by wildcard
    /// literals inside the dialect's concatenation syntax.
    fn pattern(
        &mut self,
        property: &str,
        value: &QueryValue,
        ignore_case: bool,
        leading: bool,
        trailing: bool,
    ) -> BuildResult<()> {
        let rp = self.resolve(property)?;
        let col = rp.column_ref(self.state);
        let dialect = self.state.dialect();
        let native = dialect.case_insensitive_like();
        let (open, sep, close) = (
            dialect.concat_open(),
            dialect.concat_separator(),
            dialect.concat_close(),
        );

        let fold = ignore_case && native.is_none();
        if fold {
            self.state.push("LOWER(");
            self.state.push(&col);
            self.state.push(") LIKE LOWER(");
        } else {
            self.state.push(&col);
            self.state.push(" ");
            self.state
                .push(if ignore_case { native.unwrap_or("LIKE") } else { "LIKE" });
            self.state.push(" ");
        }
        self.state.push(open);
        if leading {
            self.state.push("'%'");
            self.state.push(sep);
        }
        self.value(&rp, value)?;
        if trailing {
            self.state.push(sep);
            self.state.push("'%'");
        }
        self.state.push(close);
        if fold {
            self.state.push(")");
        }
        Ok(())
    }

    fn in_list(&mut self, property: &str, value: &QueryValue, negated: bool) -> BuildResult<()> {
        let rp = self.resolve(property)?;
        let col = rp.column_ref(self.state);
        match value {
            QueryValue::Parameter(_) => {
                self.state.push(&col);
                self.state.push(if negated { " NOT IN (" } else { " IN (" });
                // one expandable placeholder regardless of element count
                self.value_with(&rp, value, true, None)?;
                self.state.push(")");
                Ok(())
            }
            QueryValue::Literal(Literal::List(items)) => {
                if items.is_empty() {
                    self.state.push(if negated { "1=1" } else { "1=0" });
                    return Ok(());
                }
                self.state.push(&col);
                self.state.push(if negated { " NOT IN (" } else { " IN (" });
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.state.push(",");
                    }
                    self.state.push(&item.to_string());
                }
                self.state.push(")");
                Ok(())
            }
            QueryValue::Literal(_) => Err(BuildError::invalid_argument(format!(
                "In criterion on '{property}' requires a collection value"
            ))),
        }
    }

    fn association_query(&mut self, association: &str, criteria: &Criterion) -> BuildResult<()> {
        // verify the association exists before re-scoping
        let qualified = if self.prefix.is_empty() {
            association.to_string()
        } else {
            format!("{}{}", self.prefix, association)
        };
        crate::path::entity_at_path(&self.state.model().entity, &qualified)?;

        let saved = self.prefix.len();
        self.prefix.push_str(association);
        self.prefix.push('.');
        let result = self.render(criteria);
        self.prefix.truncate(saved);
        result
    }
}
