//! Note models and DTOs
//!
//! Notes are comments attached to a project resource (issue, merge request,
//! commit or snippet). Notes anchored to a diff line carry a line code, and
//! every note carries the discussion id that threads it with its replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Store-assigned note identifier. Monotonically increasing.
pub type NoteId = u64;

// ============================================================================
// Targets
// ============================================================================

/// Kind of resource a note can be attached to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Issue,
    MergeRequest,
    Commit,
    Snippet,
}

impl TargetType {
    /// Only merge request note sets are threaded into discussions
    pub fn groups_discussions(&self) -> bool {
        matches!(self, Self::MergeRequest)
    }

    /// Targets that show a diff, and so can carry diff-line notes
    pub fn has_diff(&self) -> bool {
        matches!(self, Self::MergeRequest | Self::Commit)
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue => write!(f, "issue"),
            Self::MergeRequest => write!(f, "merge_request"),
            Self::Commit => write!(f, "commit"),
            Self::Snippet => write!(f, "snippet"),
        }
    }
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "").as_str() {
            "issue" => Ok(Self::Issue),
            "mergerequest" => Ok(Self::MergeRequest),
            "commit" => Ok(Self::Commit),
            "snippet" => Ok(Self::Snippet),
            _ => Err(format!("Unknown target type: {}", s)),
        }
    }
}

/// Reference to the resource a note is attached to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TargetRef {
    pub target_type: TargetType,
    /// Numeric id for issues, merge requests and snippets; commit SHA for commits
    pub target_id: String,
}

impl TargetRef {
    pub fn new(target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            target_type,
            target_id: target_id.into(),
        }
    }

    pub fn issue(id: impl Into<String>) -> Self {
        Self::new(TargetType::Issue, id)
    }

    pub fn merge_request(id: impl Into<String>) -> Self {
        Self::new(TargetType::MergeRequest, id)
    }

    pub fn commit(sha: impl Into<String>) -> Self {
        Self::new(TargetType::Commit, sha)
    }

    pub fn snippet(id: impl Into<String>) -> Self {
        Self::new(TargetType::Snippet, id)
    }

    /// Whether the id has the right shape for its target type.
    ///
    /// Commits need an abbreviated or full hex SHA (7..=40 chars); every
    /// other target needs a positive decimal id.
    pub fn is_well_formed(&self) -> bool {
        let id = self.target_id.as_str();
        match self.target_type {
            TargetType::Commit => {
                (7..=40).contains(&id.len()) && id.chars().all(|c| c.is_ascii_hexdigit())
            }
            _ => !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && id != "0",
        }
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target_type, self.target_id)
    }
}

// ============================================================================
// Diff anchoring
// ============================================================================

/// Stable position of a line inside a diff
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiffLineAnchor {
    pub file_path: String,
    /// Line number on the old side (None for added lines)
    pub old_line: Option<u32>,
    /// Line number on the new side (None for removed lines)
    pub new_line: Option<u32>,
}

impl DiffLineAnchor {
    pub fn new(file_path: impl Into<String>, old_line: Option<u32>, new_line: Option<u32>) -> Self {
        Self {
            file_path: file_path.into(),
            old_line,
            new_line,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        !self.file_path.trim().is_empty() && (self.old_line.is_some() || self.new_line.is_some())
    }
}

/// Where a new note sits within the target's discussions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "anchor", rename_all = "snake_case")]
pub enum DiscussionContext {
    /// Top-level note on the target as a whole
    #[default]
    Main,
    /// First note (or reply) on a diff line, by position
    DiffLine(DiffLineAnchor),
    /// Reply to an existing diff-line thread, by its line code
    LineCode(String),
}

// ============================================================================
// Actors
// ============================================================================

/// The user on whose behalf an operation runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Actor {
    pub id: Uuid,
    pub username: String,
}

impl Actor {
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

// ============================================================================
// Note
// ============================================================================

/// A comment attached to a project resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub project_id: Uuid,
    pub target_type: TargetType,
    pub target_id: String,
    /// Thread identifier, fixed at creation
    #[serde(default)]
    pub discussion_id: String,
    /// Present only for notes anchored to a diff line
    #[serde(default)]
    pub line_code: Option<String>,
    pub author_id: Uuid,
    /// Raw markup text
    pub body: String,
    /// File name of a stored attachment
    #[serde(default)]
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Note {
    pub fn target(&self) -> TargetRef {
        TargetRef::new(self.target_type, self.target_id.clone())
    }

    pub fn is_diff_line_note(&self) -> bool {
        self.line_code.as_deref().is_some_and(|code| !code.is_empty())
    }

    /// A note on the requested target itself rather than on one of its diff
    /// lines or on a related resource (e.g. a commit shown in a merge request).
    pub fn is_for_main_target(&self, requested: TargetType) -> bool {
        self.target_type == requested && !self.is_diff_line_note()
    }
}

/// A validated note waiting for the store to assign its id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewNote {
    pub project_id: Uuid,
    pub target: TargetRef,
    pub discussion_id: String,
    pub line_code: Option<String>,
    pub author_id: Uuid,
    pub body: String,
    pub attachment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewNote {
    /// Materialize the stored note once an id has been assigned
    pub fn into_note(self, id: NoteId) -> Note {
        Note {
            id,
            project_id: self.project_id,
            target_type: self.target.target_type,
            target_id: self.target.target_id,
            discussion_id: self.discussion_id,
            line_code: self.line_code,
            author_id: self.author_id,
            body: self.body,
            attachment: self.attachment,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Mutable fields of a stored note. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub body: Option<String>,
    /// `Some(None)` clears the attachment reference
    pub attachment: Option<Option<String>>,
}

impl NoteUpdate {
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn clear_attachment() -> Self {
        Self {
            attachment: Some(None),
            ..Default::default()
        }
    }
}

// ============================================================================
// Requests / responses
// ============================================================================

/// Request to create a note
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub target: TargetRef,
    pub body: String,
    #[serde(default)]
    pub context: DiscussionContext,
    /// File name of an already uploaded attachment
    #[serde(default)]
    pub attachment: Option<String>,
}

impl CreateNoteRequest {
    pub fn new(target: TargetRef, body: impl Into<String>) -> Self {
        Self {
            target,
            body: body.into(),
            context: DiscussionContext::Main,
            attachment: None,
        }
    }

    pub fn on_diff_line(mut self, anchor: DiffLineAnchor) -> Self {
        self.context = DiscussionContext::DiffLine(anchor);
        self
    }

    pub fn replying_to_line(mut self, line_code: impl Into<String>) -> Self {
        self.context = DiscussionContext::LineCode(line_code.into());
        self
    }

    pub fn with_attachment(mut self, file_name: impl Into<String>) -> Self {
        self.attachment = Some(file_name.into());
        self
    }
}

/// Incremental loading filters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteFilters {
    /// Only notes newer than this id (takes precedence over `before_id`)
    pub after_id: Option<NoteId>,
    /// Only notes older than this id
    pub before_id: Option<NoteId>,
}

impl NoteFilters {
    pub fn after(id: NoteId) -> Self {
        Self {
            after_id: Some(id),
            before_id: None,
        }
    }

    pub fn before(id: NoteId) -> Self {
        Self {
            after_id: None,
            before_id: Some(id),
        }
    }

    pub fn matches(&self, note: &Note) -> bool {
        match (self.after_id, self.before_id) {
            (Some(after), _) => note.id > after,
            (None, Some(before)) => note.id < before,
            (None, None) => true,
        }
    }
}

/// A derived thread: notes sharing one discussion id, in creation order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Discussion {
    pub discussion_id: String,
    pub notes: Vec<Note>,
}

impl Discussion {
    pub fn first_note(&self) -> Option<&Note> {
        self.notes.first()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

/// Loaded note set for one target, with discussions for merge requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteListing {
    pub target: TargetRef,
    pub notes: Vec<Note>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discussions: Option<Vec<Discussion>>,
}

/// Result of an update: rendered body plus whether the new state was valid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateOutcome {
    pub note_id: NoteId,
    pub valid: bool,
    pub rendered: String,
    /// Note as currently stored
    pub note: Note,
}
