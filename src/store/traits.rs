//! NoteStore and TargetDirectory trait definitions
//!
//! Abstract interfaces over durable note storage and the resources notes are
//! attached to, so the note manager can run against any backend (and against
//! the in-memory store in tests).

use crate::notes::{NewNote, Note, NoteId, NoteUpdate, TargetRef};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Durable record of notes keyed by id.
///
/// Per-record writes are serialized by the backend (last write wins); the
/// note manager does no locking of its own.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// All notes of `project_id` attached to any of `targets`, in insertion order
    async fn find_by_targets(&self, project_id: Uuid, targets: &[TargetRef]) -> Result<Vec<Note>>;

    /// All notes of `project_id` attached to `target`, in insertion order
    async fn find_by_target(&self, project_id: Uuid, target: &TargetRef) -> Result<Vec<Note>> {
        self.find_by_targets(project_id, std::slice::from_ref(target))
            .await
    }

    /// Get a note by ID
    async fn get(&self, id: NoteId) -> Result<Option<Note>>;

    /// Persist a new note, assigning its id
    async fn create(&self, note: NewNote) -> Result<Note>;

    /// Apply `update` to a note. Returns None if the note does not exist.
    async fn update(&self, id: NoteId, update: NoteUpdate) -> Result<Option<Note>>;

    /// Delete a note. Returns false if it did not exist.
    async fn delete(&self, id: NoteId) -> Result<bool>;
}

/// Lookup of the resources notes can be attached to
#[async_trait]
pub trait TargetDirectory: Send + Sync {
    /// Canonical reference of `target` in `project_id`, or None if it does
    /// not exist. Abbreviated commit SHAs resolve to the full SHA.
    async fn resolve_target(&self, project_id: Uuid, target: &TargetRef)
        -> Result<Option<TargetRef>>;

    /// SHAs of the commits in a merge request (empty if the MR is unknown)
    async fn merge_request_commits(
        &self,
        project_id: Uuid,
        merge_request_id: &str,
    ) -> Result<Vec<String>>;
}
