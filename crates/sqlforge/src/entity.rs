//! Entity metadata: the schema side of query compilation.
//!
//! This module defines the metadata contract consumed by the builders:
//! entities with table names, naming strategy and escape policy, scalar and
//! embedded properties, associations with their ownership semantics, and
//! single or composite identities.
//!
//! Metadata is built once by the caller (typically from annotation or schema
//! introspection output) and shared via [`std::sync::Arc`]; compilation never
//! mutates it.

use std::sync::Arc;

use crate::naming::NamingStrategy;

/// Persisted data type of a property.
///
/// The compiler only inspects this for type-sensitive rendering (string
/// emptiness, boolean suffix expressions); it is otherwise carried through
/// to the parameter bindings for the execution layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    String,
    Date,
    Timestamp,
    Uuid,
    Json,
    Bytes,
    Object,
    /// Collection-valued column (e.g. a SQL array)
    Array(Box<DataType>),
}

impl DataType {
    /// Whether values of this type are character sequences.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Whether values of this type are collections.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

/// Cascade policy declared on an association.
///
/// Carried as metadata for the (external) persistence layer; the query
/// compiler does not act on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Cascade {
    #[default]
    None,
    Persist,
    Update,
    All,
}

/// The relational shape of an association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssociationKind {
    /// Foreign key lives on the owning side (this entity's table)
    ManyToOne,
    /// One-to-one; `mapped_by` means the foreign key lives on the target table
    OneToOne { mapped_by: bool },
    /// Foreign key lives on the target table
    OneToMany,
    /// Requires a join table; traversal is not supported by this compiler
    ManyToMany,
}

/// An association from one entity to another.
#[derive(Debug, Clone)]
pub struct Association {
    /// Target entity metadata
    pub target: Arc<PersistentEntity>,
    pub kind: AssociationKind,
    /// Explicit join alias override
    pub alias: Option<String>,
    /// For target-owned associations, the name of the back-reference
    /// property on the target that owns the foreign key
    pub mapped_by: Option<String>,
    pub cascade: Cascade,
}

impl Association {
    /// Create an owning many-to-one association.
    pub fn many_to_one(target: Arc<PersistentEntity>) -> Self {
        Self {
            target,
            kind: AssociationKind::ManyToOne,
            alias: None,
            mapped_by: None,
            cascade: Cascade::default(),
        }
    }

    /// Create a target-owned one-to-many association.
    pub fn one_to_many(target: Arc<PersistentEntity>) -> Self {
        Self {
            target,
            kind: AssociationKind::OneToMany,
            alias: None,
            mapped_by: None,
            cascade: Cascade::default(),
        }
    }

    /// Whether the foreign key is owned by the target table.
    ///
    /// Such associations require a join even to reach the target's identity;
    /// owning associations embed the identity locally as a column.
    pub fn is_foreign_key(&self) -> bool {
        matches!(
            self.kind,
            AssociationKind::OneToMany
                | AssociationKind::ManyToMany
                | AssociationKind::OneToOne { mapped_by: true }
        )
    }
}

/// How a property maps to storage.
#[derive(Debug, Clone)]
pub enum PropertyKind {
    /// A plain column
    Scalar,
    /// A non-relational compound whose leaves flatten into the owner's table
    Embedded(Arc<PersistentEntity>),
    /// A relational reference to another entity
    Association(Association),
}

/// A persisted property of an entity.
#[derive(Debug, Clone)]
pub struct PersistentProperty {
    pub name: String,
    /// Explicit column name override; derived via the naming strategy otherwise
    pub column: Option<String>,
    pub data_type: DataType,
    pub kind: PropertyKind,
    /// Expression template applied around the column when reading;
    /// contains exactly one `?` substitution marker
    pub read_transform: Option<String>,
    /// Expression template applied around the bound value when writing;
    /// contains exactly one `?` substitution marker
    pub write_transform: Option<String>,
    /// Value is populated by the persistence layer rather than the caller
    pub auto_populated: bool,
}

impl PersistentProperty {
    /// Create a scalar property.
    pub fn scalar(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            column: None,
            data_type,
            kind: PropertyKind::Scalar,
            read_transform: None,
            write_transform: None,
            auto_populated: false,
        }
    }

    /// Create an association property.
    pub fn association(name: impl Into<String>, association: Association) -> Self {
        Self {
            name: name.into(),
            column: None,
            data_type: DataType::Object,
            kind: PropertyKind::Association(association),
            read_transform: None,
            write_transform: None,
            auto_populated: false,
        }
    }

    /// Create an embedded property.
    pub fn embedded(name: impl Into<String>, target: Arc<PersistentEntity>) -> Self {
        Self {
            name: name.into(),
            column: None,
            data_type: DataType::Object,
            kind: PropertyKind::Embedded(target),
            read_transform: None,
            write_transform: None,
            auto_populated: false,
        }
    }

    /// The association metadata, if this property is one.
    pub fn as_association(&self) -> Option<&Association> {
        match &self.kind {
            PropertyKind::Association(a) => Some(a),
            _ => None,
        }
    }

    /// The embedded entity metadata, if this property is embedded.
    pub fn as_embedded(&self) -> Option<&Arc<PersistentEntity>> {
        match &self.kind {
            PropertyKind::Embedded(e) => Some(e),
            _ => None,
        }
    }

    /// Column name for this property under `naming`.
    pub fn column_name(&self, naming: NamingStrategy) -> String {
        self.column
            .clone()
            .unwrap_or_else(|| naming.mapped_name(&self.name))
    }
}

/// Metadata for a persisted entity.
#[derive(Debug, Clone)]
pub struct PersistentEntity {
    /// Logical entity name, e.g. `Book`
    pub name: String,
    /// Explicit table name override; derived via the naming strategy otherwise
    pub table: Option<String>,
    /// Explicit root alias override
    pub alias: Option<String>,
    pub naming: NamingStrategy,
    /// Quote identifiers in generated SQL
    pub escape: bool,
    /// Identity properties: empty = none, one = simple, several = composite
    pub identity: Vec<PersistentProperty>,
    /// Optimistic-lock version property
    pub version: Option<PersistentProperty>,
    pub properties: Vec<PersistentProperty>,
    /// External row filter ANDed into every WHERE clause touching this
    /// entity. `@.` stands for the table alias; `:name` tokens become
    /// additional required named parameters.
    pub where_fragment: Option<String>,
}

impl PersistentEntity {
    /// Create an entity with default naming and no properties.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            alias: None,
            naming: NamingStrategy::default(),
            escape: false,
            identity: Vec::new(),
            version: None,
            properties: Vec::new(),
            where_fragment: None,
        }
    }

    /// The mapped table name.
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| self.naming.mapped_name(&self.name))
    }

    /// The root alias used when this entity anchors a query.
    pub fn alias_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| format!("{}_", self.table_name()))
    }

    /// Whether this entity declares an identity.
    pub fn has_identity(&self) -> bool {
        !self.identity.is_empty()
    }

    /// Whether the identity spans multiple columns.
    pub fn has_composite_identity(&self) -> bool {
        self.identity.len() > 1
    }

    /// The single identity property, if the identity is not composite.
    pub fn identity_single(&self) -> Option<&PersistentProperty> {
        match self.identity.as_slice() {
            [id] => Some(id),
            _ => None,
        }
    }

    /// Look up a declared property by name.
    ///
    /// Searches regular properties, identity properties and the version
    /// property. `id` is recognized as a synonym for a simple identity even
    /// when no property of that literal name exists.
    pub fn property(&self, name: &str) -> Option<&PersistentProperty> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.identity.iter().find(|p| p.name == name))
            .or_else(|| self.version.as_ref().filter(|p| p.name == name))
            .or_else(|| {
                if name == "id" {
                    self.identity_single()
                } else {
                    None
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_and_alias_names_derive_from_naming() {
        let e = PersistentEntity::new("BookAuthor");
        assert_eq!(e.table_name(), "book_author");
        assert_eq!(e.alias_name(), "book_author_");
    }

    #[test]
    fn explicit_table_overrides_naming() {
        let mut e = PersistentEntity::new("Book");
        e.table = Some("tbl_books".into());
        assert_eq!(e.table_name(), "tbl_books");
        assert_eq!(e.alias_name(), "tbl_books_");
    }

    #[test]
    fn id_synonym_resolves_to_identity() {
        let mut e = PersistentEntity::new("Book");
        e.identity = vec![PersistentProperty::scalar("bookId", DataType::Long)];
        let id = e.property("id").expect("id synonym");
        assert_eq!(id.name, "bookId");
    }

    #[test]
    fn id_synonym_is_absent_for_composite_identity() {
        let mut e = PersistentEntity::new("OrderLine");
        e.identity = vec![
            PersistentProperty::scalar("orderId", DataType::Long),
            PersistentProperty::scalar("lineNo", DataType::Int),
        ];
        assert!(e.property("id").is_none());
        assert!(e.has_composite_identity());
    }

    #[test]
    fn foreign_key_ownership() {
        let author = Arc::new(PersistentEntity::new("Author"));
        assert!(!Association::many_to_one(author.clone()).is_foreign_key());
        assert!(Association::one_to_many(author).is_foreign_key());
    }
}
