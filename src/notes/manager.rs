//! Note Manager - load, create, update and delete notes on project resources
//!
//! Provides the operations the presentation layer calls: loading a target's
//! notes (grouped into discussions for merge requests), creating notes, and
//! the per-note mutations, each gated by the capability check and followed by
//! a cache reset.

use super::discussion::group_discussions;
use super::line_code::{discussion_id, is_valid_line_code, line_code};
use super::models::*;
use crate::access::{Action, CapabilityGate};
use crate::attachments::AttachmentStore;
use crate::error::{NoteError, NoteResult, Violation};
use crate::events::CacheInvalidator;
use crate::markup::MarkupRenderer;
use crate::store::{NoteStore, TargetDirectory};
use chrono::Utc;
use futures::future::try_join_all;
use std::sync::Arc;
use uuid::Uuid;

/// Default cap on note body length, in characters
pub const DEFAULT_MAX_BODY_CHARS: usize = 65_535;

/// External collaborators the manager depends on
#[derive(Clone)]
pub struct NoteBackends {
    pub store: Arc<dyn NoteStore>,
    pub targets: Arc<dyn TargetDirectory>,
    pub gate: Arc<dyn CapabilityGate>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub renderer: Arc<dyn MarkupRenderer>,
}

/// Manager for note operations
pub struct NoteManager {
    store: Arc<dyn NoteStore>,
    targets: Arc<dyn TargetDirectory>,
    gate: Arc<dyn CapabilityGate>,
    attachments: Arc<dyn AttachmentStore>,
    renderer: Arc<dyn MarkupRenderer>,
    invalidator: Option<Arc<dyn CacheInvalidator>>,
    max_body_chars: usize,
}

impl NoteManager {
    /// Create a new NoteManager
    pub fn new(backends: NoteBackends) -> Self {
        Self {
            store: backends.store,
            targets: backends.targets,
            gate: backends.gate,
            attachments: backends.attachments,
            renderer: backends.renderer,
            invalidator: None,
            max_body_chars: DEFAULT_MAX_BODY_CHARS,
        }
    }

    /// Add a cache invalidator (builder pattern).
    pub fn with_cache_invalidator(mut self, invalidator: Arc<dyn CacheInvalidator>) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    /// Set the maximum body length in characters (builder pattern).
    pub fn with_max_body_chars(mut self, max: usize) -> Self {
        self.max_body_chars = max;
        self
    }

    /// Signal the target's activity view is stale (no-op without an invalidator)
    fn reset_events_cache(&self, note: &Note) {
        if let Some(invalidator) = &self.invalidator {
            invalidator.reset_events_cache(note);
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load the notes of a target visible to `actor`, in creation order.
    ///
    /// Merge requests include the notes on their commits; commits leave out
    /// their diff-line notes. A missing target yields an empty list.
    pub async fn load_notes(
        &self,
        project_id: Uuid,
        actor: &Actor,
        target: &TargetRef,
        filters: &NoteFilters,
    ) -> NoteResult<Vec<Note>> {
        let mut notes = match target.target_type {
            TargetType::MergeRequest => {
                let mut sources = vec![target.clone()];
                sources.extend(
                    self.targets
                        .merge_request_commits(project_id, &target.target_id)
                        .await?
                        .into_iter()
                        .map(TargetRef::commit),
                );
                self.store.find_by_targets(project_id, &sources).await?
            }
            TargetType::Commit => {
                let mut notes = self.store.find_by_target(project_id, target).await?;
                notes.retain(|n| !n.is_diff_line_note());
                notes
            }
            TargetType::Issue | TargetType::Snippet => {
                self.store.find_by_target(project_id, target).await?
            }
        };

        notes.retain(|n| filters.matches(n));

        let checks = notes
            .iter()
            .map(|note| self.gate.allows(actor, Action::Read, note));
        let visible = try_join_all(checks).await?;
        let before = notes.len();
        let mut visible = visible.into_iter();
        notes.retain(|_| visible.next().unwrap_or(false));

        if notes.len() < before {
            tracing::debug!(
                target = %target,
                actor = %actor.username,
                hidden = before - notes.len(),
                "Notes hidden by visibility rules"
            );
        }

        // Stable: ties on created_at keep the store's insertion order
        notes.sort_by_key(|n| n.created_at);

        tracing::debug!(target = %target, count = notes.len(), "Loaded notes");
        Ok(notes)
    }

    /// Load a target's notes and, for merge requests, group them into discussions
    pub async fn load_and_group(
        &self,
        project_id: Uuid,
        actor: &Actor,
        target: &TargetRef,
        filters: &NoteFilters,
    ) -> NoteResult<NoteListing> {
        let notes = self.load_notes(project_id, actor, target, filters).await?;
        let discussions = target
            .target_type
            .groups_discussions()
            .then(|| group_discussions(&notes, target.target_type));

        Ok(NoteListing {
            target: target.clone(),
            notes,
            discussions,
        })
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Validate and persist a new note on behalf of `actor`.
    ///
    /// Fails with `PermissionDenied` when the actor may not write notes in the
    /// project, and with `ValidationFailed` listing every violated constraint
    /// otherwise. Creation does not reset any cache.
    pub async fn create_note(
        &self,
        project_id: Uuid,
        actor: &Actor,
        input: CreateNoteRequest,
    ) -> NoteResult<Note> {
        if !self
            .gate
            .allows_on_project(actor, Action::Write, project_id)
            .await?
        {
            tracing::warn!(
                actor = %actor.username,
                project_id = %project_id,
                "Note creation denied"
            );
            return Err(NoteError::PermissionDenied {
                action: Action::Write,
                note_id: None,
            });
        }

        let mut violations = self.body_violations(&input.body);

        let line_code = match &input.context {
            DiscussionContext::Main => None,
            DiscussionContext::DiffLine(_) | DiscussionContext::LineCode(_)
                if !input.target.target_type.has_diff() =>
            {
                violations.push(Violation::MalformedAnchor);
                None
            }
            DiscussionContext::DiffLine(anchor) if anchor.is_well_formed() => {
                Some(line_code(anchor))
            }
            DiscussionContext::LineCode(code) if is_valid_line_code(code) => Some(code.clone()),
            DiscussionContext::DiffLine(_) | DiscussionContext::LineCode(_) => {
                violations.push(Violation::MalformedAnchor);
                None
            }
        };

        // Notes are stored under the canonical reference (full commit SHA)
        let target = if input.target.is_well_formed() {
            let resolved = self
                .targets
                .resolve_target(project_id, &input.target)
                .await?;
            if resolved.is_none() {
                violations.push(Violation::TargetNotFound);
            }
            resolved
        } else {
            violations.push(Violation::MalformedTarget);
            None
        };

        let target = match target {
            Some(target) if violations.is_empty() => target,
            _ => {
                tracing::debug!(
                    target = %input.target,
                    ?violations,
                    "Rejected invalid note"
                );
                return Err(NoteError::ValidationFailed(violations));
            }
        };

        let new_note = NewNote {
            project_id,
            discussion_id: discussion_id(&target, line_code.as_deref()),
            target,
            line_code,
            author_id: actor.id,
            body: input.body,
            attachment: input.attachment,
            created_at: Utc::now(),
        };

        let note = self.store.create(new_note).await?;

        tracing::info!(
            note_id = note.id,
            target = %note.target(),
            discussion_id = %note.discussion_id,
            author = %actor.username,
            "Note created"
        );

        Ok(note)
    }

    fn body_violations(&self, body: &str) -> Vec<Violation> {
        let mut violations = Vec::new();
        if body.trim().is_empty() {
            violations.push(Violation::EmptyBody);
        } else if body.chars().count() > self.max_body_chars {
            violations.push(Violation::BodyTooLong);
        }
        violations
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Fetch a note of `project_id` and check `actor` may administer it
    async fn authorize_admin(
        &self,
        project_id: Uuid,
        note_id: NoteId,
        actor: &Actor,
    ) -> NoteResult<Note> {
        let note = self
            .store
            .get(note_id)
            .await?
            .filter(|n| n.project_id == project_id)
            .ok_or(NoteError::NotFound(note_id))?;

        if !self.gate.allows(actor, Action::Admin, &note).await? {
            tracing::warn!(
                note_id,
                actor = %actor.username,
                "Note mutation denied"
            );
            return Err(NoteError::PermissionDenied {
                action: Action::Admin,
                note_id: Some(note_id),
            });
        }

        Ok(note)
    }

    /// Replace a note's body.
    ///
    /// A body that fails validation is not persisted and reported with
    /// `valid = false`; the target's cache is reset either way. The thread,
    /// author and creation time never change.
    pub async fn update_note(
        &self,
        project_id: Uuid,
        note_id: NoteId,
        actor: &Actor,
        new_body: &str,
    ) -> NoteResult<UpdateOutcome> {
        let current = self.authorize_admin(project_id, note_id, actor).await?;

        let valid = self.body_violations(new_body).is_empty();
        let note = if valid {
            self.store
                .update(note_id, NoteUpdate::body(new_body))
                .await?
                .ok_or(NoteError::NotFound(note_id))?
        } else {
            tracing::debug!(note_id, "Rejected invalid note body on update");
            current
        };

        self.reset_events_cache(&note);

        if valid {
            tracing::info!(note_id, actor = %actor.username, "Note updated");
        }

        Ok(UpdateOutcome {
            note_id,
            valid,
            rendered: self.renderer.render(new_body),
            note,
        })
    }

    /// Delete a note and its attachment payload.
    ///
    /// Deleting an id that no longer exists is `NotFound`. A retry after a
    /// partial failure converges: payload removal succeeds when nothing is
    /// left to remove.
    pub async fn delete_note(
        &self,
        project_id: Uuid,
        note_id: NoteId,
        actor: &Actor,
    ) -> NoteResult<()> {
        let note = self.authorize_admin(project_id, note_id, actor).await?;

        if note.attachment.is_some() {
            self.attachments.remove(&note).await?;
        }

        if !self.store.delete(note_id).await? {
            return Err(NoteError::NotFound(note_id));
        }

        self.reset_events_cache(&note);

        tracing::info!(
            note_id,
            target = %note.target(),
            actor = %actor.username,
            "Note deleted"
        );

        Ok(())
    }

    /// Remove a note's attachment payload, then clear its reference and reset
    /// the target's cache.
    ///
    /// A note without an attachment is returned unchanged and sends no reset,
    /// so repeated calls succeed.
    pub async fn detach_attachment(
        &self,
        project_id: Uuid,
        note_id: NoteId,
        actor: &Actor,
    ) -> NoteResult<Note> {
        let note = self.authorize_admin(project_id, note_id, actor).await?;

        if note.attachment.is_none() {
            tracing::debug!(note_id, "No attachment to detach");
            return Ok(note);
        }

        self.attachments.remove(&note).await?;

        let updated = self
            .store
            .update(note_id, NoteUpdate::clear_attachment())
            .await?
            .ok_or(NoteError::NotFound(note_id))?;

        self.reset_events_cache(&updated);

        tracing::info!(note_id, actor = %actor.username, "Attachment detached");

        Ok(updated)
    }

    // ========================================================================
    // Preview
    // ========================================================================

    /// Render raw note text for a live preview. Nothing is persisted.
    pub fn preview_markup(&self, raw: &str) -> String {
        self.renderer.render(raw)
    }
}
