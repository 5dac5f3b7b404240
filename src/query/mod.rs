pub mod execute;
pub mod statement;

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::models::{QueryResult, RequestParameters, TableName};
pub use execute::{run_query, InterruptOnDrop};
pub use statement::{build_statement, Statement};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("cannot open database at {}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("counting all commands failed")]
    TotalCount(#[source] rusqlite::Error),
    #[error("counting failed commands failed")]
    FailedCount(#[source] rusqlite::Error),
    #[error("fetching command rows failed")]
    Rows(#[source] rusqlite::Error),
    #[error("request dropped before the queries finished")]
    Cancelled,
    #[error("query task did not complete")]
    Task(#[from] tokio::task::JoinError),
}

/// Where the command log lives. Read-only after startup.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
    table: TableName,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>, table: TableName) -> Self {
        Self {
            path: path.into(),
            table,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Open a fresh read-only connection; one per request.
    pub fn connect(&self) -> Result<Connection, QueryError> {
        let connect_err = |source| QueryError::Connect {
            path: self.path.clone(),
            source,
        };
        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(connect_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(connect_err)?;
        Ok(conn)
    }
}

/// Connect and run the three report queries off the async runtime.
///
/// If this future is dropped before the queries finish, the running
/// statement is interrupted, any queries not yet started are skipped, and
/// the connection is released by the worker.
pub async fn fetch(
    database: Arc<Database>,
    parameters: RequestParameters,
) -> Result<QueryResult, QueryError> {
    let conn = {
        let database = Arc::clone(&database);
        tokio::task::spawn_blocking(move || database.connect()).await??
    };

    let guard = InterruptOnDrop::new(&conn);
    let cancelled = guard.cancelled();
    let result = tokio::task::spawn_blocking(move || {
        run_query(conn, database.table(), &parameters, &cancelled)
    })
    .await?;
    guard.disarm();
    result
}
