//! Error types for the migration engine

use crate::migration::Direction;
use thiserror::Error;

pub type MigrationResult<T> = Result<T, MigrationError>;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// A revision id (or target) that is not part of the revision graph
    #[error("unknown revision: {0}")]
    UnknownRevision(String),

    /// A revision prefix matching more than one revision
    #[error("revision prefix '{prefix}' is ambiguous, matches: {}", .candidates.join(", "))]
    AmbiguousRevision {
        prefix: String,
        candidates: Vec<String>,
    },

    /// The discovered scripts do not form a single linear chain
    #[error("inconsistent revision graph: {0}")]
    InconsistentGraph(String),

    /// A script's apply/revert failed; its transaction was rolled back
    #[error("migration {revision} failed during {direction}: {source}")]
    MigrationFailed {
        revision: String,
        direction: Direction,
        #[source]
        source: anyhow::Error,
    },

    /// The requested target lies in the opposite direction of the operation
    #[error("cannot {expected} from {} to {}", display_rev(.from), display_rev(.to))]
    WrongDirection {
        from: Option<String>,
        to: Option<String>,
        expected: Direction,
    },

    #[error("schema '{0}' is not attached to the connection")]
    SchemaNotFound(String),

    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("failed to load migration script {path}: {reason}")]
    ScriptLoad { path: String, reason: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

fn display_rev(rev: &Option<String>) -> &str {
    rev.as_deref().unwrap_or("base")
}

impl MigrationError {
    /// Whether this error is fatal, as opposed to a bad target the caller can correct
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            MigrationError::UnknownRevision(_)
                | MigrationError::AmbiguousRevision { .. }
                | MigrationError::WrongDirection { .. }
        )
    }
}
