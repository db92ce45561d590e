//! Error types for note operations.

use crate::access::Action;
use crate::notes::NoteId;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A single constraint a note request failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Violation {
    /// Body is empty after trimming
    EmptyBody,
    /// Body exceeds the configured maximum length
    BodyTooLong,
    /// Target id has the wrong shape for its type
    MalformedTarget,
    /// Diff-line anchor or line code is unusable
    MalformedAnchor,
    /// Target does not resolve to an existing resource
    TargetNotFound,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyBody => write!(f, "note body can't be blank"),
            Self::BodyTooLong => write!(f, "note body is too long"),
            Self::MalformedTarget => write!(f, "target reference is malformed"),
            Self::MalformedAnchor => write!(f, "diff line reference is malformed"),
            Self::TargetNotFound => write!(f, "target does not exist"),
        }
    }
}

/// Coarse category of a [`NoteError`], for mapping onto transport status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationFailed,
    PermissionDenied,
    NotFound,
    DependencyUnavailable,
}

/// All errors surfaced by the note operations
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("validation failed: {}", join_violations(.0))]
    ValidationFailed(Vec<Violation>),

    #[error("permission denied: {action} on {}", describe_subject(.note_id))]
    PermissionDenied {
        action: Action,
        note_id: Option<NoteId>,
    },

    #[error("note not found: {0}")]
    NotFound(NoteId),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(#[from] anyhow::Error),
}

impl NoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ValidationFailed(_) => ErrorKind::ValidationFailed,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DependencyUnavailable(_) => ErrorKind::DependencyUnavailable,
        }
    }

    /// Violations carried by a validation failure, empty otherwise
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::ValidationFailed(v) => v,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_subject(note_id: &Option<NoteId>) -> String {
    match note_id {
        Some(id) => format!("note {}", id),
        None => "project notes".to_string(),
    }
}

/// A specialized Result type for note operations.
pub type NoteResult<T> = std::result::Result<T, NoteError>;
