//! Capability checks for note operations
//!
//! Provides:
//! - `Action`: the fixed set of capabilities a caller can ask about
//! - `CapabilityGate`: the yes/no oracle consulted before reads and mutations
//! - `AuthorOrAdminGate`: a simple policy: everyone reads and writes,
//!   authors and configured admins administer

mod gate;

pub use gate::{Action, AuthorOrAdminGate, CapabilityGate};
