//! # sqlforge
//!
//! A dialect-pluggable SQL query compiler: entity-aware query models in,
//! parameterized SQL plus ordered bindings out.
//!
//! ## Features
//!
//! - **Declarative models**: build a [`QueryModel`] from criteria, projections,
//!   joins, sort orders and pagination, then compile it per dialect
//! - **Entity-aware paths**: dotted property paths resolve through embedded
//!   objects and associations, applying joins only when actually needed
//! - **Parameter bindings**: every placeholder carries its binding metadata
//!   (parameter path, property path, data type) in textual order
//! - **Pluggable dialects**: placeholder syntax, quoting, pagination and
//!   locking go through the [`Dialect`] trait
//! - **Extensible criteria**: swap or disable the generation routine for any
//!   criterion kind per builder
//!
//! ```
//! use sqlforge::{Criterion, Projection, QueryModel, SqlQueryBuilder};
//! use sqlforge::{DataType, PersistentEntity, PersistentProperty};
//! use std::sync::Arc;
//!
//! let mut entity = PersistentEntity::new("Book");
//! entity.identity = vec![PersistentProperty::scalar("id", DataType::Long)];
//! entity.properties = vec![PersistentProperty::scalar("title", DataType::String)];
//!
//! let model = QueryModel::from(Arc::new(entity))
//!     .project(Projection::Count)
//!     .criteria(Criterion::eq_param("title", "title"));
//!
//! let result = SqlQueryBuilder::postgres().build_select(&model).unwrap();
//! assert_eq!(
//!     result.query(),
//!     "SELECT COUNT(*) FROM book book_ WHERE (book_.title = $1)"
//! );
//! ```

pub mod builder;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod model;
pub mod naming;
pub mod path;
pub mod result;
pub mod state;

pub use builder::{CriteriaRenderer, CriterionHandler, SqlQueryBuilder};
pub use dialect::{Ansi, Dialect, LockPlacement, Oracle, Postgres};
pub use entity::{
    Association, AssociationKind, Cascade, DataType, PersistentEntity, PersistentProperty,
    PropertyKind,
};
pub use error::{BuildError, BuildResult};
pub use model::{
    BindingParameter, Criterion, CriterionKind, Direction, JoinKind, JoinPath, Literal, Order,
    Projection, QueryModel, QueryValue,
};
pub use naming::NamingStrategy;
pub use path::{apply_join_path, resolve_property_path, ResolvedPath};
pub use result::QueryResult;
pub use state::{AppliedJoin, Placeholder, QueryParameterBinding, QueryState};
