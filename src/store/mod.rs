//! Note storage interfaces and the in-memory backend

pub mod memory;
pub mod traits;

pub use memory::{MemoryNoteStore, NoteSnapshot};
pub use traits::{NoteStore, TargetDirectory};
