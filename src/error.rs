//! Error taxonomy for the schema manager and load orchestrator.
//!
//! Every variant is fatal to a run. Callers surface the error to the operator
//! and recover by re-running the whole drop/create/load sequence.

use thiserror::Error;

use crate::sql::{StatementKind, Table};

/// Result alias used across the library.
pub type EtlResult<T> = Result<T, EtlError>;

/// Coarse classification of an [`EtlError`], matching the phase that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Connection,
    Schema,
    Load,
    Transform,
}

#[derive(Debug, Error)]
pub enum EtlError {
    /// Missing or invalid settings; raised before any statement is issued.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to connect to warehouse: {0}")]
    Connect(#[source] sqlx::Error),

    /// A DROP or CREATE failed. Statements after it were not attempted.
    #[error("{kind} {table} failed: {source}")]
    Schema {
        table: Table,
        kind: StatementKind,
        #[source]
        source: sqlx::Error,
    },

    /// The warehouse rejected a staging load.
    #[error("staging load into {table} failed: {source}")]
    Load {
        table: Table,
        #[source]
        source: sqlx::Error,
    },

    /// A client-side staging source could not be read or parsed.
    #[error("staging source {path} for {table} is unusable: {message}")]
    StagingSource {
        table: Table,
        path: String,
        message: String,
    },

    /// An INSERT...SELECT failed. Later inserts were not attempted.
    #[error("insert into {table} failed: {source}")]
    Transform {
        table: Table,
        #[source]
        source: sqlx::Error,
    },
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EtlError::Config(_) => ErrorKind::Configuration,
            EtlError::Connect(_) => ErrorKind::Connection,
            EtlError::Schema { .. } => ErrorKind::Schema,
            EtlError::Load { .. } | EtlError::StagingSource { .. } => ErrorKind::Load,
            EtlError::Transform { .. } => ErrorKind::Transform,
        }
    }

    /// The table whose statement failed, when the failure is tied to one.
    pub fn table(&self) -> Option<Table> {
        match self {
            EtlError::Schema { table, .. }
            | EtlError::Load { table, .. }
            | EtlError::StagingSource { table, .. }
            | EtlError::Transform { table, .. } => Some(*table),
            EtlError::Config(_) | EtlError::Connect(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_source_errors_classify_as_load() {
        let err = EtlError::StagingSource {
            table: Table::StagingSongs,
            path: "/tmp/song_data".into(),
            message: "no JSON files found".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Load);
        assert_eq!(err.table(), Some(Table::StagingSongs));
        assert_eq!(
            err.to_string(),
            "staging source /tmp/song_data for staging_songs is unusable: no JSON files found"
        );
    }

    #[test]
    fn schema_error_names_statement() {
        let err = EtlError::Schema {
            table: Table::Songs,
            kind: StatementKind::Create,
            source: sqlx::Error::Protocol("permission denied".into()),
        };
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.to_string().starts_with("create songs failed"));
    }
}
