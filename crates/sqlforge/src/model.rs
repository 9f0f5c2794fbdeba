//! The declarative query model consumed by the builders.
//!
//! A [`QueryModel`] bundles a root entity with a criteria tree, projections,
//! join requests, sort orders and pagination. It is a pure description: the
//! builders walk it without mutating it.

use std::fmt;
use std::sync::Arc;

use crate::entity::PersistentEntity;

/// A value position in a criterion or update map: either a runtime parameter
/// to bind, or a literal to inline.
#[derive(Debug, Clone)]
pub enum QueryValue {
    Parameter(BindingParameter),
    Literal(Literal),
}

impl QueryValue {
    /// Reference a runtime parameter by name.
    pub fn param(name: impl Into<String>) -> Self {
        Self::Parameter(BindingParameter { name: name.into() })
    }

    /// Inline a literal.
    pub fn literal(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

/// A reference to an incoming runtime parameter.
///
/// `name` is the dotted path of the method parameter that will supply the
/// value at execution time.
#[derive(Debug, Clone)]
pub struct BindingParameter {
    pub name: String,
}

/// A literal value inlined into the generated SQL.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            // single quotes escaped by doubling
            Self::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Stable tag for a criterion variant, used as the dispatch and override key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriterionKind {
    Conjunction,
    Disjunction,
    Negation,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEquals,
    LessThan,
    LessThanEquals,
    EqualsProperty,
    NotEqualsProperty,
    GreaterThanProperty,
    GreaterThanEqualsProperty,
    LessThanProperty,
    LessThanEqualsProperty,
    IsNull,
    IsNotNull,
    IsTrue,
    IsFalse,
    IsEmpty,
    IsNotEmpty,
    IdEquals,
    VersionEquals,
    Between,
    Like,
    ILike,
    StartsWith,
    Contains,
    EndsWith,
    In,
    NotIn,
    AssociationQuery,
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One filter condition, or a boolean combinator over child conditions.
#[derive(Debug, Clone)]
pub enum Criterion {
    /// Children joined with AND, parenthesized
    Conjunction(Vec<Criterion>),
    /// Children joined with OR, parenthesized
    Disjunction(Vec<Criterion>),
    /// NOT over children joined with AND
    Negation(Vec<Criterion>),

    Equals { property: String, value: QueryValue, ignore_case: bool },
    NotEquals { property: String, value: QueryValue, ignore_case: bool },
    GreaterThan { property: String, value: QueryValue },
    GreaterThanEquals { property: String, value: QueryValue },
    LessThan { property: String, value: QueryValue },
    LessThanEquals { property: String, value: QueryValue },

    EqualsProperty { property: String, other: String },
    NotEqualsProperty { property: String, other: String },
    GreaterThanProperty { property: String, other: String },
    GreaterThanEqualsProperty { property: String, other: String },
    LessThanProperty { property: String, other: String },
    LessThanEqualsProperty { property: String, other: String },

    IsNull(String),
    IsNotNull(String),
    IsTrue(String),
    IsFalse(String),
    IsEmpty(String),
    IsNotEmpty(String),

    /// Identity equality; expands composite identities to per-column equals
    IdEquals { value: QueryValue },
    /// Version property equality
    VersionEquals { value: QueryValue },

    Between { property: String, from: QueryValue, to: QueryValue },

    Like { property: String, value: QueryValue },
    ILike { property: String, value: QueryValue },
    StartsWith { property: String, value: QueryValue, ignore_case: bool },
    Contains { property: String, value: QueryValue, ignore_case: bool },
    EndsWith { property: String, value: QueryValue, ignore_case: bool },

    In { property: String, value: QueryValue },
    NotIn { property: String, value: QueryValue },

    /// Criteria on a joined association, re-scoped under its path
    AssociationQuery { association: String, criteria: Box<Criterion> },
}

impl Criterion {
    /// The stable kind tag of this criterion.
    pub fn kind(&self) -> CriterionKind {
        match self {
            Self::Conjunction(_) => CriterionKind::Conjunction,
            Self::Disjunction(_) => CriterionKind::Disjunction,
            Self::Negation(_) => CriterionKind::Negation,
            Self::Equals { .. } => CriterionKind::Equals,
            Self::NotEquals { .. } => CriterionKind::NotEquals,
            Self::GreaterThan { .. } => CriterionKind::GreaterThan,
            Self::GreaterThanEquals { .. } => CriterionKind::GreaterThanEquals,
            Self::LessThan { .. } => CriterionKind::LessThan,
            Self::LessThanEquals { .. } => CriterionKind::LessThanEquals,
            Self::EqualsProperty { .. } => CriterionKind::EqualsProperty,
            Self::NotEqualsProperty { .. } => CriterionKind::NotEqualsProperty,
            Self::GreaterThanProperty { .. } => CriterionKind::GreaterThanProperty,
            Self::GreaterThanEqualsProperty { .. } => CriterionKind::GreaterThanEqualsProperty,
            Self::LessThanProperty { .. } => CriterionKind::LessThanProperty,
            Self::LessThanEqualsProperty { .. } => CriterionKind::LessThanEqualsProperty,
            Self::IsNull(_) => CriterionKind::IsNull,
            Self::IsNotNull(_) => CriterionKind::IsNotNull,
            Self::IsTrue(_) => CriterionKind::IsTrue,
            Self::IsFalse(_) => CriterionKind::IsFalse,
            Self::IsEmpty(_) => CriterionKind::IsEmpty,
            Self::IsNotEmpty(_) => CriterionKind::IsNotEmpty,
            Self::IdEquals { .. } => CriterionKind::IdEquals,
            Self::VersionEquals { .. } => CriterionKind::VersionEquals,
            Self::Between { .. } => CriterionKind::Between,
            Self::Like { .. } => CriterionKind::Like,
            Self::ILike { .. } => CriterionKind::ILike,
            Self::StartsWith { .. } => CriterionKind::StartsWith,
            Self::Contains { .. } => CriterionKind::Contains,
            Self::EndsWith { .. } => CriterionKind::EndsWith,
            Self::In { .. } => CriterionKind::In,
            Self::NotIn { .. } => CriterionKind::NotIn,
            Self::AssociationQuery { .. } => CriterionKind::AssociationQuery,
        }
    }

    /// Whether this criterion is a boolean combinator.
    pub fn is_junction(&self) -> bool {
        matches!(
            self,
            Self::Conjunction(_) | Self::Disjunction(_) | Self::Negation(_)
        )
    }

    /// Equality on `property` against a named parameter.
    pub fn eq_param(property: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::Equals {
            property: property.into(),
            value: QueryValue::param(parameter),
            ignore_case: false,
        }
    }
}

/// A requested output column or expression.
#[derive(Debug, Clone)]
pub enum Projection {
    /// Raw SQL text, inlined as-is
    Literal(String),
    /// `COUNT(*)`
    Count,
    /// `COUNT(DISTINCT col)`
    CountDistinct(String),
    /// Prefix the select list with DISTINCT
    Distinct,
    /// The entity identity (one column per identity property)
    Id,
    /// A named property; association properties expand to the joined
    /// alias's full column list
    Property(String),
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

/// Join type requested for an association traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
    /// Inner join whose columns are fetched into the select list
    Fetch,
    LeftFetch,
    RightFetch,
}

impl JoinKind {
    /// Whether the joined columns participate in the select list.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch | Self::LeftFetch | Self::RightFetch)
    }
}

/// A declared association traversal with join type and optional alias.
#[derive(Debug, Clone)]
pub struct JoinPath {
    /// Dotted association path relative to the root entity
    pub path: String,
    pub kind: JoinKind,
    /// Explicit alias override for the deepest joined table
    pub alias: Option<String>,
}

impl JoinPath {
    pub fn new(path: impl Into<String>, kind: JoinKind) -> Self {
        Self {
            path: path.into(),
            kind,
            alias: None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ORDER BY key.
#[derive(Debug, Clone)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
    pub ignore_case: bool,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Asc,
            ignore_case: false,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: Direction::Desc,
            ignore_case: false,
        }
    }

    /// Sort case-insensitively (wraps the key in `LOWER()`).
    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }
}

/// A complete declarative query over a root entity.
#[derive(Debug, Clone)]
pub struct QueryModel {
    pub entity: Arc<PersistentEntity>,
    pub criteria: Option<Criterion>,
    pub projections: Vec<Projection>,
    pub joins: Vec<JoinPath>,
    pub sort: Vec<Order>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub for_update: bool,
}

impl QueryModel {
    /// Create an empty query over `entity`.
    pub fn from(entity: Arc<PersistentEntity>) -> Self {
        Self {
            entity,
            criteria: None,
            projections: Vec::new(),
            joins: Vec::new(),
            sort: Vec::new(),
            limit: None,
            offset: None,
            for_update: false,
        }
    }

    /// Set the criteria tree.
    pub fn criteria(mut self, criterion: Criterion) -> Self {
        self.criteria = Some(criterion);
        self
    }

    /// Append a projection.
    pub fn project(mut self, projection: Projection) -> Self {
        self.projections.push(projection);
        self
    }

    /// Declare a join path.
    pub fn join(mut self, join: JoinPath) -> Self {
        self.joins.push(join);
        self
    }

    /// Append a sort order.
    pub fn order_by(mut self, order: Order) -> Self {
        self.sort.push(order);
        self
    }

    /// Limit the number of rows.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` rows.
    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Request pessimistic locking.
    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    /// Look up a declared join path.
    pub fn declared_join(&self, path: &str) -> Option<&JoinPath> {
        self.joins.iter().find(|j| j.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_rendering() {
        assert_eq!(Literal::Null.to_string(), "NULL");
        assert_eq!(Literal::Bool(true).to_string(), "TRUE");
        assert_eq!(Literal::Int(42).to_string(), "42");
        assert_eq!(Literal::Str("it's".into()).to_string(), "'it''s'");
        assert_eq!(
            Literal::List(vec![Literal::Int(1), Literal::Int(2)]).to_string(),
            "1,2"
        );
    }

    #[test]
    fn criterion_kind_is_stable() {
        let c = Criterion::eq_param("title", "t");
        assert_eq!(c.kind(), CriterionKind::Equals);
        assert_eq!(c.kind().to_string(), "Equals");
        assert!(Criterion::Conjunction(vec![]).is_junction());
        assert!(!c.is_junction());
    }
}
