//! Standalone ORDER BY and pagination fragments, for appending to
//! externally supplied queries.

use crate::error::{BuildError, BuildResult};
use crate::model::QueryModel;
use crate::result::QueryResult;
use crate::state::QueryState;

use super::SqlQueryBuilder;

impl SqlQueryBuilder {
    /// Compile just an ` ORDER BY ...` fragment from the model's sort
    /// orders. Fails when the model declares none.
    pub fn build_order_by(&self, model: &QueryModel) -> BuildResult<QueryResult> {
        if model.sort.is_empty() {
            return Err(BuildError::invalid_argument(
                "Query model does not declare any sort order",
            ));
        }
        let root_alias = model.entity.alias_name();
        let mut state = QueryState::new(model, &*self.dialect, root_alias, true);
        super::append_order_by(&mut state)?;
        Ok(state.finish(String::new(), None, None))
    }

    /// Dialect-specific pagination fragment, with a leading space.
    pub fn build_pagination(&self, limit: Option<i64>, offset: Option<i64>) -> String {
        self.dialect.limit_offset(limit, offset)
    }
}
