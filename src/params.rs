use std::collections::HashMap;

use crate::models::{RequestParameters, SortColumn, SortDirection, DEFAULT_ROW_LIMIT};

/// Wire value meaning "no exit code filter".
const NO_EXIT_CODE: i64 = -1;

impl RequestParameters {
    /// Resolve raw query-string values. Never fails: every missing or
    /// malformed value falls back to its default.
    pub fn resolve(query: &HashMap<String, String>) -> Self {
        let get = |key: &str| query.get(key).map(String::as_str).unwrap_or("");

        let row_limit = get("count").parse::<i64>().unwrap_or(DEFAULT_ROW_LIMIT);

        let exit_code = get("exit_code")
            .parse::<i64>()
            .ok()
            .filter(|&code| code != NO_EXIT_CODE);

        Self {
            row_limit,
            exit_code,
            host_name: get("host_name").to_string(),
            command_name: get("command_name").to_string(),
            sort_by: SortColumn::from_query_value(get("sort_by")),
            sort_order: SortDirection::from_query_value(get("sort_order")),
        }
    }
}
