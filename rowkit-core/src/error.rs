use crate::{Error, truncate_long};

#[derive(Debug, thiserror::Error)]
pub enum RowkitError {
    #[error("bad sql syntax on {operation}: {message}\n{sql}")]
    Syntax {
        operation: &'static str,
        message: String,
        sql: String,
    },
    #[error("{operation} failed: {message}\n{sql}")]
    Statement {
        operation: &'static str,
        message: String,
        sql: String,
    },
    #[error("unsupported column mode {0}, expected 0 (aliased), 1 (alias only) or 2 (bare)")]
    UnsupportedMode(i64),
    #[error("{operation} affected {actual} rows, expected {expected}")]
    RowCount {
        operation: &'static str,
        actual: u64,
        expected: String,
    },
    #[error("insert or upsert already in flight on this task")]
    Reentry,
}

/// Failure the transaction runner is allowed to retry.
#[derive(Debug, thiserror::Error)]
#[error("retryable: {0:#}")]
pub struct RetryableError(pub Error);

pub fn retryable(error: impl Into<Error>) -> Error {
    Error::new(RetryableError(error.into()))
}

pub fn is_retryable(error: &Error) -> bool {
    error.downcast_ref::<RetryableError>().is_some()
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    /// Malformed statement.
    Syntax,
    /// Backend rolled the transaction back (serialization failure, deadlock).
    TransactionRollback,
    #[default]
    Other,
}

/// Error reported by drivers, its kind decides how sessions surface it.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct DriverError {
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn new(kind: DriverErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Remove the identifier quotes from `sql`, it keeps error messages readable.
pub fn strip_quotes(quote: &str, sql: &str) -> String {
    if quote.is_empty() {
        return sql.to_string();
    }
    sql.replace(quote, "")
}

/// Turn a driver failure into the error surfaced by sessions.
pub fn classify(error: Error, operation: &'static str, quote: &str, sql: &str) -> Error {
    if error.downcast_ref::<RowkitError>().is_some() || is_retryable(&error) {
        return error;
    }
    let kind = error
        .downcast_ref::<DriverError>()
        .map(|e| e.kind)
        .unwrap_or_default();
    let message = format!("{error:#}");
    let sql = strip_quotes(quote, sql);
    match kind {
        DriverErrorKind::TransactionRollback => {
            log::debug!("{operation} rolled back by the backend: {message}");
            retryable(error)
        }
        DriverErrorKind::Syntax => {
            log::warn!("bad sql syntax on {operation}: {message}\n{}", truncate_long!(sql));
            RowkitError::Syntax {
                operation,
                message,
                sql,
            }
            .into()
        }
        DriverErrorKind::Other => {
            log::warn!("{operation} failed: {message}\n{}", truncate_long!(sql));
            RowkitError::Statement {
                operation,
                message,
                sql,
            }
            .into()
        }
    }
}
