//! Cache invalidation types

use crate::notes::{Note, NoteId, TargetType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Receives "invalidate now" signals after destructive note changes.
///
/// Fire-and-forget: implementations must not block and must not fail the
/// caller's operation.
pub trait CacheInvalidator: Send + Sync {
    /// Reset the cached activity view of the target `note` belongs to
    fn reset_events_cache(&self, note: &Note);
}

/// Signal that a target's cached activity view is stale
///
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInvalidation {
    pub project_id: Uuid,
    pub target_type: TargetType,
    pub target_id: String,
    /// The note whose change triggered the reset
    pub note_id: NoteId,
    /// ISO 8601 timestamp
    pub timestamp: String,
}

impl CacheInvalidation {
    /// Create an invalidation for `note`'s target with the current timestamp
    pub fn for_note(note: &Note) -> Self {
        Self {
            project_id: note.project_id,
            target_type: note.target_type,
            target_id: note.target_id.clone(),
            note_id: note.id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Cache key of the invalidated view, e.g. `<project>/merge_request/42`
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.project_id, self.target_type, self.target_id)
    }
}
