//! The immutable output of a compilation.

use crate::state::{AppliedJoin, QueryParameterBinding};

/// A compiled statement: final text, the literal fragments it was assembled
/// from, the position-ordered parameter bindings, and everything the
/// execution layer needs to bind and page it.
#[derive(Debug, Clone)]
pub struct QueryResult {
    query: String,
    query_parts: Vec<String>,
    parameter_bindings: Vec<QueryParameterBinding>,
    additional_required_parameters: Vec<(String, String)>,
    output_parameters: Vec<QueryParameterBinding>,
    join_paths: Vec<AppliedJoin>,
    limit: Option<i64>,
    offset: Option<i64>,
}

impl QueryResult {
    pub(crate) fn new(
        query: String,
        query_parts: Vec<String>,
        parameter_bindings: Vec<QueryParameterBinding>,
        additional_required_parameters: Vec<(String, String)>,
        join_paths: Vec<AppliedJoin>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Self {
        Self {
            query,
            query_parts,
            parameter_bindings,
            additional_required_parameters,
            output_parameters: Vec::new(),
            join_paths,
            limit,
            offset,
        }
    }

    /// The final statement text with placeholders substituted.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The literal fragments the statement splits into around placeholders.
    ///
    /// `query()` equals the fragments interleaved with the dialect's
    /// positional placeholders; consumers doing incremental prepared-statement
    /// binding use the fragments directly.
    pub fn query_parts(&self) -> &[String] {
        &self.query_parts
    }

    /// Parameter bindings, ordered by textual placeholder position.
    pub fn parameter_bindings(&self) -> &[QueryParameterBinding] {
        &self.parameter_bindings
    }

    /// Named parameters from external where fragments, as
    /// `(name, placeholder key)` pairs resolved by name at execution time.
    pub fn additional_required_parameters(&self) -> &[(String, String)] {
        &self.additional_required_parameters
    }

    /// Pass-through output parameter bindings (e.g. procedure outputs);
    /// the compiler never produces these itself.
    pub fn output_parameters(&self) -> &[QueryParameterBinding] {
        &self.output_parameters
    }

    /// Attach pass-through output parameter bindings.
    pub fn with_output_parameters(mut self, outputs: Vec<QueryParameterBinding>) -> Self {
        self.output_parameters = outputs;
        self
    }

    /// Joins applied during compilation.
    pub fn join_paths(&self) -> &[AppliedJoin] {
        &self.join_paths
    }

    /// Maximum number of rows, when the model requested one.
    pub fn limit(&self) -> Option<i64> {
        self.limit
    }

    /// Row offset, when the model requested one.
    pub fn offset(&self) -> Option<i64> {
        self.offset
    }
}
