use chrono::TimeDelta;
use rusqlite::{params_from_iter, Connection, InterruptHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::statement::{build_statement, failed_count_sql, total_count_sql};
use super::QueryError;
use crate::models::{LogRecord, QueryResult, RequestParameters, TableName};

/// Run the total count, the failed count and the filtered row fetch, in that
/// order, on one connection. The connection is consumed: it is closed on
/// success and dropped on every error path.
///
/// `cancelled` is checked before each query; once set, the remaining queries
/// are skipped.
pub fn run_query(
    conn: Connection,
    table: &TableName,
    parameters: &RequestParameters,
    cancelled: &AtomicBool,
) -> Result<QueryResult, QueryError> {
    ensure_live(cancelled)?;
    let total_count = count(&conn, &total_count_sql(table)).map_err(QueryError::TotalCount)?;
    ensure_live(cancelled)?;
    let failed_count = count(&conn, &failed_count_sql(table)).map_err(QueryError::FailedCount)?;
    ensure_live(cancelled)?;
    let rows = fetch_rows(&conn, table, parameters).map_err(QueryError::Rows)?;

    if let Err((_, e)) = conn.close() {
        tracing::warn!(error = %e, "failed to close database connection");
    }

    Ok(QueryResult {
        total_count,
        failed_count,
        rows,
    })
}

fn ensure_live(cancelled: &AtomicBool) -> Result<(), QueryError> {
    if cancelled.load(Ordering::SeqCst) {
        return Err(QueryError::Cancelled);
    }
    Ok(())
}

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<i64> {
    conn.query_row(sql, [], |row| row.get(0))
}

fn fetch_rows(
    conn: &Connection,
    table: &TableName,
    parameters: &RequestParameters,
) -> rusqlite::Result<Vec<LogRecord>> {
    let statement = build_statement(parameters, table);
    tracing::debug!(sql = %statement.sql, params = ?statement.params, "built statement");

    let mut stmt = conn.prepare(&statement.sql)?;
    let rows = stmt
        .query_map(params_from_iter(statement.params.iter()), map_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LogRecord> {
    let secs: i64 = row.get("duration")?;
    let duration =
        TimeDelta::try_seconds(secs).ok_or(rusqlite::Error::IntegralValueOutOfRange(2, secs))?;

    Ok(LogRecord {
        row_number: row.get("row_num")?,
        start_time: row.get("start_time")?,
        duration,
        host_name: row.get("host_name")?,
        command_name: row.get("command_name")?,
        exit_code: row.get("exit_code")?,
    })
}

/// Interrupts whatever the connection is running when dropped, unless
/// disarmed first, and raises the flag `run_query` checks between queries.
///
/// Best-effort: a drop that lands just as a statement starts can let that
/// one statement run to completion.
pub struct InterruptOnDrop {
    handle: Option<InterruptHandle>,
    cancelled: Arc<AtomicBool>,
}

impl InterruptOnDrop {
    pub fn new(conn: &Connection) -> Self {
        Self {
            handle: Some(conn.get_interrupt_handle()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag to hand to `run_query` on the worker thread.
    pub fn cancelled(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn disarm(mut self) {
        self.handle = None;
    }
}

impl Drop for InterruptOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            tracing::debug!("request dropped, interrupting query");
            self.cancelled.store(true, Ordering::SeqCst);
            handle.interrupt();
        }
    }
}
