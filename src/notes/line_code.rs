//! Line codes and discussion ids
//!
//! A line code pins a note to one line of a diff independently of the hunk
//! it was rendered in: it hashes the file path and appends the old and new
//! line numbers. Discussion ids are built from the noteable and the line code,
//! so every reply to the same line lands in the same thread and every note on
//! the target as a whole shares the target's main id.

use super::models::{DiffLineAnchor, TargetRef};
use sha2::{Digest, Sha256};

const DISCUSSION_PREFIX: &str = "discussion";

/// Compute the line code for a diff position.
///
/// Format: `<sha256(file_path) hex>_<old_line>_<new_line>`, with a missing
/// side written as `0`.
pub fn line_code(anchor: &DiffLineAnchor) -> String {
    let mut hasher = Sha256::new();
    hasher.update(anchor.file_path.as_bytes());
    format!(
        "{}_{}_{}",
        hex::encode(hasher.finalize()),
        anchor.old_line.unwrap_or(0),
        anchor.new_line.unwrap_or(0)
    )
}

/// Whether a client-supplied line code has the shape produced by [`line_code`]
pub fn is_valid_line_code(code: &str) -> bool {
    let mut parts = code.split('_');
    let (Some(hash), Some(old), Some(new), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    hash.len() == 64
        && hash.chars().all(|c| c.is_ascii_hexdigit())
        && old.parse::<u32>().is_ok()
        && new.parse::<u32>().is_ok()
        && (old != "0" || new != "0")
}

/// Build the discussion id for a note on `target`, optionally on a diff line.
///
/// Notes without a line code all share the target's main id.
pub fn discussion_id(target: &TargetRef, line_code: Option<&str>) -> String {
    format!(
        "{}-{}-{}-{}",
        DISCUSSION_PREFIX,
        target.target_type,
        target.target_id,
        line_code.unwrap_or_default()
    )
}
