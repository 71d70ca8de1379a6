//! Query executor boundary.
//!
//! The engine only ever hands an executor `(text, values)`; opening connections,
//! transactions and timeouts belong to the executor. [`MayPostgresExecutor`] is
//! the implementation over a `may_postgres::Client`.

use crate::query::number_placeholders;
use crate::value_conversion::with_converted_params;
use may_postgres::{Client, Error as PostgresError, Row};
use sea_query::Value;
use std::fmt;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Executor error type
#[derive(Debug)]
pub enum ExecutorError {
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// Query execution error
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            ExecutorError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            ExecutorError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            ExecutorError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for ExecutorError {}

impl From<PostgresError> for ExecutorError {
    fn from(err: PostgresError) -> Self {
        ExecutorError::PostgresError(err)
    }
}

/// Runs built query text with positional values
///
/// `sql` uses `?` markers in value order; implementations translate them to
/// their driver's syntax.
pub trait QueryExecutor {
    /// Row type handed back to the caller
    type Row;

    /// Execute a query and return all rows
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError` if the query execution fails.
    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Self::Row>, ExecutorError>;

    /// Execute a query whose first column of the first row is a row count
    ///
    /// Returns `None` when the query produced no row or a NULL count.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError` if the query execution fails.
    fn query_count(&self, sql: &str, params: &[Value]) -> Result<Option<i64>, ExecutorError>;
}

/// Implementation of `QueryExecutor` for `may_postgres::Client`
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the executor and return the underlying client
    pub fn into_client(self) -> Client {
        self.client
    }
}

impl QueryExecutor for MayPostgresExecutor {
    type Row = Row;

    fn query_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, ExecutorError> {
        let sql = number_placeholders(sql);
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(&sql).entered();

        let start = Instant::now();
        let result = with_converted_params(params, |params| {
            self.client.query(sql.as_str(), params).map_err(|e| {
                #[cfg(feature = "metrics")]
                METRICS.record_query_error();
                ExecutorError::PostgresError(e)
            })
        });

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query_duration(duration);

        result
    }

    fn query_count(&self, sql: &str, params: &[Value]) -> Result<Option<i64>, ExecutorError> {
        let rows = self.query_all(sql, params)?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let count: Option<i64> = row
            .try_get(0)
            .map_err(|e| ExecutorError::ParseError(format!("Failed to read count: {e}")))?;
        Ok(count)
    }
}
