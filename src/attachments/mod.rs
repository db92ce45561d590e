//! Attachment storage
//!
//! A note's attachment is a binary payload stored outside the note record;
//! the note only keeps its file name. Removal is idempotent so that an
//! interrupted delete or detach can simply be retried.

use crate::notes::Note;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Binary payload storage for note attachments
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Remove the payload referenced by `note`. Succeeds when nothing is stored.
    async fn remove(&self, note: &Note) -> Result<()>;
}

/// Stores attachments under `<root>/note/<note id>/<file name>`
#[derive(Debug, Clone)]
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the payloads of one note
    pub fn note_dir(&self, note: &Note) -> PathBuf {
        self.root.join("note").join(note.id.to_string())
    }

    /// Full path of a note's attachment, rejecting names that escape the note dir
    pub fn attachment_path(&self, note: &Note, file_name: &str) -> Result<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.note_dir(note).join(file_name)),
            _ => bail!("Invalid attachment name {:?} on note {}", file_name, note.id),
        }
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn remove(&self, note: &Note) -> Result<()> {
        let Some(file_name) = note.attachment.as_deref() else {
            return Ok(());
        };
        let path = self.attachment_path(note, file_name)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(note_id = note.id, path = %path.display(), "Removed attachment"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(note_id = note.id, path = %path.display(), "Attachment already absent")
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove attachment {}", path.display()))
            }
        }

        // Drop the per-note directory once it is empty; anything else left
        // in it is not ours to delete.
        if let Err(e) = tokio::fs::remove_dir(self.note_dir(note)).await {
            debug!(note_id = note.id, error = %e, "Kept attachment directory");
        }

        Ok(())
    }
}
