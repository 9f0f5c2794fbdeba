//! DELETE compilation.

use crate::error::BuildResult;
use crate::model::QueryModel;
use crate::result::QueryResult;
use crate::state::QueryState;

use super::SqlQueryBuilder;

impl SqlQueryBuilder {
    /// Compile a DELETE statement for rows matching the model's criteria.
    pub fn build_delete(&self, model: &QueryModel) -> BuildResult<QueryResult> {
        let allow_joins = self.dialect.uses_alias_in_batch();
        let root_alias = if allow_joins {
            model.entity.alias_name()
        } else {
            model.entity.table_name()
        };
        let mut state = QueryState::new(model, &*self.dialect, root_alias, allow_joins);

        self.append_where(&mut state)?;

        let mut head = String::from("DELETE FROM ");
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
        tracing::debug!(dialect = self.dialect.name(), entity = %model.entity.name, "built delete query");

        Ok(state.finish(head, None, None))
    }
}
