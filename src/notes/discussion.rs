//! Discussion grouping
//!
//! Partitions a merge request's note set into threads. Diff-line threads are
//! emitted whole the first time any of their notes is seen; notes on the
//! merge request itself are always emitted one per discussion, even though
//! they share the target's main discussion id.

use super::models::{Discussion, Note, TargetType};
use std::collections::HashSet;

/// Group `notes` (already in creation order) into discussions.
///
/// `requested` is the type of the target the notes were loaded for. A note of
/// that type with no line code is a main-target note and becomes a singleton;
/// its id is not marked as grouped. A note with an empty discussion id is also
/// a singleton. Every other note pulls in all notes with the same discussion
/// id from the whole input, in input order, and marks the id as grouped.
pub fn group_discussions(notes: &[Note], requested: TargetType) -> Vec<Discussion> {
    let mut grouped: HashSet<&str> = HashSet::new();
    let mut discussions = Vec::new();

    for note in notes {
        let id = note.discussion_id.as_str();
        if grouped.contains(id) {
            continue;
        }

        if note.is_for_main_target(requested) || id.is_empty() {
            discussions.push(Discussion {
                discussion_id: note.discussion_id.clone(),
                notes: vec![note.clone()],
            });
            continue;
        }

        discussions.push(Discussion {
            discussion_id: note.discussion_id.clone(),
            notes: notes
                .iter()
                .filter(|other| other.discussion_id == id)
                .cloned()
                .collect(),
        });
        grouped.insert(id);
    }

    tracing::debug!(
        notes = notes.len(),
        discussions = discussions.len(),
        "Grouped notes into discussions"
    );

    discussions
}
