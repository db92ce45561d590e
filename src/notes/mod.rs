//! Notes module
//!
//! Threaded comments on project resources: issues, merge requests, commits
//! and snippets. Notes on a merge request are grouped into discussions, and
//! notes anchored to a diff line are threaded by their line code.

pub mod discussion;
pub mod line_code;
pub mod manager;
pub mod models;

pub use discussion::group_discussions;
pub use manager::{NoteBackends, NoteManager, DEFAULT_MAX_BODY_CHARS};
pub use models::*;
