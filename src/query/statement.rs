use rusqlite::types::Value;
use std::fmt::Write;

use crate::models::{RequestParameters, TableName, DURATION_EXPR};

/// SQL text plus the values bound to its `?` placeholders, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Appends filter clauses, introducing the first with WHERE and the rest with AND.
struct WhereClauses<'a> {
    sql: &'a mut String,
    params: &'a mut Vec<Value>,
    count: usize,
}

impl WhereClauses<'_> {
    fn push(&mut self, clause: &str, value: Value) {
        let keyword = if self.count == 0 { "WHERE" } else { "AND" };
        let _ = write!(self.sql, "\n{keyword} {clause}");
        self.params.push(value);
        self.count += 1;
    }
}

pub fn build_statement(parameters: &RequestParameters, table: &TableName) -> Statement {
    let order = format!(
        "{} {}, rowid",
        parameters.sort_by.sql_expr(),
        parameters.sort_order.keyword()
    );

    let mut sql = String::with_capacity(512);
    let mut params = Vec::new();

    let _ = write!(
        sql,
        "SELECT\n\
         ROW_NUMBER() OVER (ORDER BY {order}) AS row_num,\n\
         datetime(starttime) AS start_time,\n\
         {DURATION_EXPR} AS duration,\n\
         hostname AS host_name,\n\
         commandname AS command_name,\n\
         exitcode AS exit_code\n\
         FROM {table}"
    );

    let mut filters = WhereClauses {
        sql: &mut sql,
        params: &mut params,
        count: 0,
    };
    if let Some(code) = parameters.exit_code {
        filters.push("exitcode = ?", Value::Integer(code));
    }
    if !parameters.host_name.is_empty() {
        filters.push("hostname = ?", Value::Text(parameters.host_name.clone()));
    }
    if !parameters.command_name.is_empty() {
        filters.push(
            "instr(commandname, ?) > 0",
            Value::Text(parameters.command_name.clone()),
        );
    }

    let _ = write!(sql, "\nORDER BY {order}\nLIMIT ?");
    params.push(Value::Integer(parameters.effective_limit()));

    Statement { sql, params }
}

pub fn total_count_sql(table: &TableName) -> String {
    format!("SELECT COUNT(*) FROM {table}")
}

pub fn failed_count_sql(table: &TableName) -> String {
    format!("SELECT COUNT(*) FROM {table} WHERE exitcode <> 0")
}
