//! Test helper factories and mock backends
//!
//! Provides convenience functions for creating test notes with sensible
//! defaults, mock collaborators that record what the manager asked of them,
//! and a harness wiring a NoteManager over the in-memory store.
#![allow(dead_code)]

use crate::access::{Action, CapabilityGate};
use crate::attachments::AttachmentStore;
use crate::events::CacheInvalidator;
use crate::markup::CommonMarkRenderer;
use crate::notes::line_code::discussion_id;
use crate::notes::{
    Actor, NewNote, Note, NoteBackends, NoteId, NoteManager, TargetRef,
};
use crate::store::MemoryNoteStore;
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ============================================================================
// Factories
// ============================================================================

/// Fixed project id shared by the factories
pub fn test_project_id() -> Uuid {
    Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001)
}

/// Actor with a fresh id
pub fn test_actor(name: &str) -> Actor {
    Actor::new(Uuid::new_v4(), name)
}

/// Main-thread note by `author` on merge request 1
pub fn note_by(author: &Actor, id: NoteId) -> Note {
    let mut note = mr_note(id, "", None);
    note.discussion_id = discussion_id(&note.target(), None);
    note.author_id = author.id;
    note
}

/// Note on merge request 1 with the given thread fields
pub fn mr_note(id: NoteId, discussion_id: &str, line_code: Option<&str>) -> Note {
    note_on(TargetRef::merge_request("1"), id, discussion_id, line_code)
}

/// Note on commit `abcdef1` with the given thread fields
pub fn commit_note(id: NoteId, discussion_id: &str, line_code: Option<&str>) -> Note {
    note_on(TargetRef::commit("abcdef1"), id, discussion_id, line_code)
}

fn note_on(target: TargetRef, id: NoteId, discussion_id: &str, line_code: Option<&str>) -> Note {
    let now = Utc::now();
    Note {
        id,
        project_id: test_project_id(),
        target_type: target.target_type,
        target_id: target.target_id,
        discussion_id: discussion_id.to_string(),
        line_code: line_code.map(String::from),
        author_id: Uuid::new_v4(),
        body: format!("note {}", id),
        attachment: None,
        created_at: now,
        updated_at: now,
    }
}

/// Main-thread note ready to be created on `target`
pub fn new_note(project_id: Uuid, target: TargetRef, body: &str) -> NewNote {
    NewNote {
        project_id,
        discussion_id: discussion_id(&target, None),
        target,
        line_code: None,
        author_id: Uuid::new_v4(),
        body: body.to_string(),
        attachment: None,
        created_at: Utc::now(),
    }
}

/// Stored main-thread note with an explicit id
pub fn note_in(project_id: Uuid, target: TargetRef, id: NoteId) -> Note {
    new_note(project_id, target, &format!("note {}", id)).into_note(id)
}

/// Stored main-thread note with an explicit id and creation time
pub fn note_at(project_id: Uuid, target: TargetRef, id: NoteId, created_at: DateTime<Utc>) -> Note {
    let mut note = note_in(project_id, target, id);
    note.created_at = created_at;
    note.updated_at = created_at;
    note
}

// ============================================================================
// Mock backends
// ============================================================================

/// Gate that allows everything except explicitly denied capabilities
#[derive(Debug, Default)]
pub struct MockCapabilityGate {
    denied: Mutex<HashSet<(Uuid, Action)>>,
    denied_notes: Mutex<HashSet<(Uuid, Action, NoteId)>>,
}

impl MockCapabilityGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny `action` to `actor_id` everywhere
    pub fn deny(&self, actor_id: Uuid, action: Action) {
        self.denied.lock().unwrap().insert((actor_id, action));
    }

    /// Deny `action` to `actor_id` on one note
    pub fn deny_note(&self, actor_id: Uuid, action: Action, note_id: NoteId) {
        self.denied_notes
            .lock()
            .unwrap()
            .insert((actor_id, action, note_id));
    }

    fn is_denied(&self, actor: &Actor, action: Action) -> bool {
        self.denied.lock().unwrap().contains(&(actor.id, action))
    }
}

#[async_trait]
impl CapabilityGate for MockCapabilityGate {
    async fn allows(&self, actor: &Actor, action: Action, note: &Note) -> Result<bool> {
        let note_denied = self
            .denied_notes
            .lock()
            .unwrap()
            .contains(&(actor.id, action, note.id));
        Ok(!note_denied && !self.is_denied(actor, action))
    }

    async fn allows_on_project(
        &self,
        actor: &Actor,
        action: Action,
        _project_id: Uuid,
    ) -> Result<bool> {
        Ok(!self.is_denied(actor, action))
    }
}

/// Records the note ids it was asked to invalidate
#[derive(Debug, Default)]
pub struct RecordingInvalidator {
    calls: Mutex<Vec<NoteId>>,
}

impl RecordingInvalidator {
    pub fn calls(&self) -> Vec<NoteId> {
        self.calls.lock().unwrap().clone()
    }
}

impl CacheInvalidator for RecordingInvalidator {
    fn reset_events_cache(&self, note: &Note) {
        self.calls.lock().unwrap().push(note.id);
    }
}

/// Attachment store tracking which notes hold a payload
#[derive(Debug, Default)]
pub struct MemoryAttachmentStore {
    payloads: Mutex<HashSet<NoteId>>,
    removals: AtomicUsize,
    fail_next: AtomicBool,
}

impl MemoryAttachmentStore {
    /// Store a payload for `note_id`
    pub fn put(&self, note_id: NoteId) {
        self.payloads.lock().unwrap().insert(note_id);
    }

    pub fn holds(&self, note_id: NoteId) -> bool {
        self.payloads.lock().unwrap().contains(&note_id)
    }

    /// Number of successful `remove` calls
    pub fn removals(&self) -> usize {
        self.removals.load(Ordering::SeqCst)
    }

    /// Make the next `remove` call fail
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachmentStore {
    async fn remove(&self, note: &Note) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            bail!("attachment storage unavailable");
        }
        self.payloads.lock().unwrap().remove(&note.id);
        self.removals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Manager harness
// ============================================================================

/// NoteManager over mock backends, with a seeded issue, merge request and commit
pub struct Harness {
    pub manager: NoteManager,
    pub store: Arc<MemoryNoteStore>,
    pub gate: Arc<MockCapabilityGate>,
    pub attachments: Arc<MemoryAttachmentStore>,
    pub invalidator: Arc<RecordingInvalidator>,
    pub project_id: Uuid,
    pub alice: Actor,
    pub bob: Actor,
    pub issue: TargetRef,
    pub mr: TargetRef,
    pub commit: TargetRef,
}

pub async fn harness() -> Harness {
    harness_with(|manager| manager).await
}

/// Harness whose manager is customized by `configure`
pub async fn harness_with(configure: impl FnOnce(NoteManager) -> NoteManager) -> Harness {
    let project_id = test_project_id();
    let store = Arc::new(MemoryNoteStore::new());
    let gate = Arc::new(MockCapabilityGate::new());
    let attachments = Arc::new(MemoryAttachmentStore::default());
    let invalidator = Arc::new(RecordingInvalidator::default());

    let issue = TargetRef::issue("1");
    let mr = TargetRef::merge_request("10");
    let commit = TargetRef::commit("0a1b2c3d4e5f");
    store.register_target(project_id, issue.clone()).await;
    store
        .register_merge_request_commits(project_id, &mr.target_id, vec![commit.target_id.clone()])
        .await;

    let manager = NoteManager::new(NoteBackends {
        store: store.clone(),
        targets: store.clone(),
        gate: gate.clone(),
        attachments: attachments.clone(),
        renderer: Arc::new(CommonMarkRenderer::default()),
    })
    .with_cache_invalidator(invalidator.clone());

    Harness {
        manager: configure(manager),
        store,
        gate,
        attachments,
        invalidator,
        project_id,
        alice: test_actor("alice"),
        bob: test_actor("bob"),
        issue,
        mr,
        commit,
    }
}

