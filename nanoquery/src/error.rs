//! NanoQuery errors and results

use core::fmt::{self, Display};
use std::error::Error as StdError;
use rusqlite::Error as SqlError;
use thiserror::Error;


/// NanoQuery errors.
///
/// Apart from the SQLite and formatting wrappers, every variant is a
/// construction error: it is raised by the builder call that caused it,
/// and it carries the offending values so that the root cause can be
/// diagnosed from the message alone.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum Error {
    #[error("formatting error")]
    Fmt(#[from] fmt::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] SqlError),

    #[error("statement expects {expected} parameters but {actual} were bound")]
    ParamCountMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("condition `{conditions}` expects {expected} operands but {actual} were supplied")]
    OperandCount {
        conditions: String,
        expected: usize,
        actual: usize,
    },

    #[error("model `{model}` has no mapped property `{path}`")]
    UnknownProperty {
        model: String,
        path: String,
    },

    #[error("model `{model}` does not declare a primary key")]
    MissingPrimaryKey {
        model: String,
    },

    #[error("cannot insert an empty set of rows into `{table}`")]
    EmptyBatch {
        table: String,
    },

    #[error("row {row} of `{table}` has {actual} values but {expected} columns were declared")]
    RaggedBatch {
        table: String,
        expected: usize,
        actual: usize,
        row: String,
    },

    #[error("a single row of {columns} columns exceeds the limit of {limit} bound parameters")]
    ParamLimit {
        columns: usize,
        limit: usize,
    },

    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync + 'static>),
}

impl Error {
    /// Creates an `Error` from any other underlying reason.
    pub fn other<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static
    {
        Error::Other(Box::new(error))
    }

    /// Creates an `Error` from a message.
    pub fn message<T: Display>(message: T) -> Self {
        Error::Other(message.to_string().into())
    }
}

/// Convenience type alias for NanoQuery-related results.
pub type Result<T, E = Error> = core::result::Result<T, E>;
