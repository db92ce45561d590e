//! In-memory implementation of NoteStore and TargetDirectory.
//!
//! Keeps notes in insertion order behind a `tokio::sync::RwLock`. Used as the
//! default backend for the CLI and as the store in tests.

use crate::notes::{NewNote, Note, NoteId, NoteUpdate, TargetRef, TargetType};
use crate::store::traits::{NoteStore, TargetDirectory};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
struct NoteTable {
    rows: Vec<Note>,
    last_id: NoteId,
}

/// Serializable dump of one project's notes and targets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteSnapshot {
    pub project_id: Uuid,
    #[serde(default)]
    pub targets: Vec<TargetRef>,
    /// Merge request id -> commit SHAs
    #[serde(default)]
    pub merge_request_commits: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// In-memory note store and target directory.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: RwLock<NoteTable>,
    targets: RwLock<HashSet<(Uuid, TargetRef)>>,
    merge_request_commits: RwLock<HashMap<(Uuid, String), Vec<String>>>,
}

impl MemoryNoteStore {
    /// Create a new empty MemoryNoteStore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store seeded from a snapshot. Notes keep their ids and order,
    /// and every target they reference is registered.
    pub async fn from_snapshot(snapshot: NoteSnapshot) -> Self {
        let store = Self::new();
        let project_id = snapshot.project_id;

        for target in snapshot.targets {
            store.register_target(project_id, target).await;
        }
        for (mr_id, shas) in snapshot.merge_request_commits {
            store
                .register_merge_request_commits(project_id, &mr_id, shas)
                .await;
        }
        for note in snapshot.notes {
            store.register_target(note.project_id, note.target()).await;
            store.import(note).await;
        }

        store
    }

    // ========================================================================
    // Seeding methods
    // ========================================================================

    /// Register a resource notes can be attached to
    pub async fn register_target(&self, project_id: Uuid, target: TargetRef) {
        self.targets.write().await.insert((project_id, target));
    }

    /// Register a merge request together with the commits it contains
    pub async fn register_merge_request_commits(
        &self,
        project_id: Uuid,
        merge_request_id: &str,
        shas: Vec<String>,
    ) {
        {
            let mut targets = self.targets.write().await;
            targets.insert((project_id, TargetRef::merge_request(merge_request_id)));
            for sha in &shas {
                targets.insert((project_id, TargetRef::commit(sha.clone())));
            }
        }
        self.merge_request_commits
            .write()
            .await
            .insert((project_id, merge_request_id.to_string()), shas);
    }

    /// Insert an existing note as-is, keeping its id
    pub async fn import(&self, note: Note) {
        let mut table = self.notes.write().await;
        table.last_id = table.last_id.max(note.id);
        table.rows.retain(|n| n.id != note.id);
        table.rows.push(note);
    }

    /// Number of stored notes
    pub async fn count(&self) -> usize {
        self.notes.read().await.rows.len()
    }
}

#[async_trait]
impl NoteStore for MemoryNoteStore {
    async fn find_by_targets(&self, project_id: Uuid, targets: &[TargetRef]) -> Result<Vec<Note>> {
        let table = self.notes.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|n| {
                n.project_id == project_id
                    && targets
                        .iter()
                        .any(|t| t.target_type == n.target_type && t.target_id == n.target_id)
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: NoteId) -> Result<Option<Note>> {
        Ok(self
            .notes
            .read()
            .await
            .rows
            .iter()
            .find(|n| n.id == id)
            .cloned())
    }

    async fn create(&self, note: NewNote) -> Result<Note> {
        let mut table = self.notes.write().await;
        table.last_id += 1;
        let note = note.into_note(table.last_id);
        table.rows.push(note.clone());
        Ok(note)
    }

    async fn update(&self, id: NoteId, update: NoteUpdate) -> Result<Option<Note>> {
        let mut table = self.notes.write().await;
        if let Some(n) = table.rows.iter_mut().find(|n| n.id == id) {
            if let Some(body) = update.body {
                n.body = body;
            }
            if let Some(attachment) = update.attachment {
                n.attachment = attachment;
            }
            n.updated_at = Utc::now();
            Ok(Some(n.clone()))
        } else {
            Ok(None)
        }
    }

    async fn delete(&self, id: NoteId) -> Result<bool> {
        let mut table = self.notes.write().await;
        let before = table.rows.len();
        table.rows.retain(|n| n.id != id);
        Ok(table.rows.len() != before)
    }
}

#[async_trait]
impl TargetDirectory for MemoryNoteStore {
    async fn resolve_target(
        &self,
        project_id: Uuid,
        target: &TargetRef,
    ) -> Result<Option<TargetRef>> {
        let targets = self.targets.read().await;
        if targets.contains(&(project_id, target.clone())) {
            return Ok(Some(target.clone()));
        }
        if target.target_type != TargetType::Commit {
            return Ok(None);
        }

        // Abbreviated SHAs resolve only when exactly one registered commit matches
        let mut matches = targets.iter().filter(|(pid, t)| {
            *pid == project_id
                && t.target_type == TargetType::Commit
                && t.target_id.starts_with(&target.target_id)
        });
        match (matches.next(), matches.next()) {
            (Some((_, full)), None) => Ok(Some(full.clone())),
            _ => Ok(None),
        }
    }

    async fn merge_request_commits(
        &self,
        project_id: Uuid,
        merge_request_id: &str,
    ) -> Result<Vec<String>> {
        Ok(self
            .merge_request_commits
            .read()
            .await
            .get(&(project_id, merge_request_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
