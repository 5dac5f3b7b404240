use anyhow::Result;
use chrono::{NaiveDateTime, TimeDelta};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

pub const DEFAULT_ROW_LIMIT: i64 = 1000;

/// Whole seconds between start and stop, computed by SQLite.
pub(crate) const DURATION_EXPR: &str =
    "(CAST(strftime('%s', stoptime) AS INTEGER) - CAST(strftime('%s', starttime) AS INTEGER))";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    StartTime,
    Duration,
    HostName,
    CommandName,
    ExitCode,
}

impl SortColumn {
    /// Map an external `sort_by` value onto the whitelist.
    ///
    /// Anything unrecognised sorts by start time. Only these variants ever
    /// reach the ORDER BY text.
    pub fn from_query_value(value: &str) -> Self {
        match value {
            "duration" => SortColumn::Duration,
            "host_name" => SortColumn::HostName,
            "command_name" => SortColumn::CommandName,
            "exit_code" => SortColumn::ExitCode,
            _ => SortColumn::StartTime,
        }
    }

    pub fn sql_expr(self) -> &'static str {
        match self {
            SortColumn::StartTime => "starttime",
            SortColumn::Duration => DURATION_EXPR,
            SortColumn::HostName => "hostname",
            SortColumn::CommandName => "commandname",
            SortColumn::ExitCode => "exitcode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn from_query_value(value: &str) -> Self {
        if value == "asc" {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParameters {
    pub row_limit: i64,
    pub exit_code: Option<i64>,
    pub host_name: String,
    pub command_name: String,
    pub sort_by: SortColumn,
    pub sort_order: SortDirection,
}

impl Default for RequestParameters {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_ROW_LIMIT,
            exit_code: None,
            host_name: String::new(),
            command_name: String::new(),
            sort_by: SortColumn::default(),
            sort_order: SortDirection::default(),
        }
    }
}

impl RequestParameters {
    /// The LIMIT actually applied. SQLite reads a negative LIMIT as "no
    /// limit", so anything below zero becomes zero.
    pub fn effective_limit(&self) -> i64 {
        self.row_limit.max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub row_number: i64,
    pub start_time: NaiveDateTime,
    pub duration: TimeDelta,
    pub host_name: String,
    pub command_name: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub total_count: i64,
    pub failed_count: i64,
    pub rows: Vec<LogRecord>,
}

/// A validated table identifier, rendered double-quoted into SQL.
///
/// The report orders by `rowid` to break ties, so the table must be an
/// ordinary rowid table. Views and `WITHOUT ROWID` tables fail every report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:([A-Za-z_][A-Za-z0-9_]*)\.)?([A-Za-z_][A-Za-z0-9_]*)$")
            .expect("identifier pattern is valid")
    })
}

impl TableName {
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = identifier_re()
            .captures(raw.trim())
            .ok_or_else(|| anyhow::anyhow!("invalid database table name: {raw:?}"))?;
        Ok(Self {
            schema: caps.get(1).map(|m| m.as_str().to_string()),
            name: caps[2].to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "\"{schema}\".\"{}\"", self.name),
            None => write!(f, "\"{}\"", self.name),
        }
    }
}
