use std::path::PathBuf;

use thiserror::Error;

/// Entity families, used to say what a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Administrator,
    Student,
    Classroom,
    Assignment,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Administrator => "administrator",
            EntityKind::Student => "student",
            EntityKind::Classroom => "classroom",
            EntityKind::Assignment => "assignment",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum GradebookError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },
    #[error("no free {kind} identifier left")]
    DuplicateAllocation { kind: EntityKind },
    #[error("i/o error on {}: {source}", path.display())]
    PersistenceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}:{line}: {reason}", file.display())]
    MalformedRecord {
        file: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("{0}")]
    InvalidInput(String),
}

impl GradebookError {
    pub fn not_found(kind: EntityKind, id: impl Into<i64>) -> Self {
        GradebookError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GradebookError::PersistenceIo {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        GradebookError::InvalidInput(message.into())
    }

    /// Stable wire code for the IPC layer.
    pub fn code(&self) -> &'static str {
        match self {
            GradebookError::NotFound { .. } => "not_found",
            GradebookError::DuplicateAllocation { .. } => "id_space_exhausted",
            GradebookError::PersistenceIo { .. } => "persist_failed",
            GradebookError::MalformedRecord { .. } => "malformed_record",
            GradebookError::InvalidInput(_) => "bad_params",
        }
    }
}

pub type Result<T, E = GradebookError> = std::result::Result<T, E>;
