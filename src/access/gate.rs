//! CapabilityGate trait and the author-or-admin policy

use crate::notes::{Actor, Note};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

/// Capability requested from the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Admin,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Authorization oracle. Implementations decide; callers only consume the boolean.
#[async_trait]
pub trait CapabilityGate: Send + Sync {
    /// Whether `actor` may perform `action` on an existing note
    async fn allows(&self, actor: &Actor, action: Action, note: &Note) -> Result<bool>;

    /// Whether `actor` may perform `action` on the notes of a project
    /// (used for creation, where no note exists yet)
    async fn allows_on_project(&self, actor: &Actor, action: Action, project_id: Uuid)
        -> Result<bool>;
}

/// Everyone may read and write; a note's author and the configured admins
/// may administer it.
#[derive(Debug, Clone, Default)]
pub struct AuthorOrAdminGate {
    admins: HashSet<Uuid>,
}

impl AuthorOrAdminGate {
    pub fn new(admins: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }

    pub fn is_admin(&self, actor: &Actor) -> bool {
        self.admins.contains(&actor.id)
    }
}

#[async_trait]
impl CapabilityGate for AuthorOrAdminGate {
    async fn allows(&self, actor: &Actor, action: Action, note: &Note) -> Result<bool> {
        Ok(match action {
            Action::Read | Action::Write => true,
            Action::Admin => note.author_id == actor.id || self.is_admin(actor),
        })
    }

    async fn allows_on_project(
        &self,
        actor: &Actor,
        action: Action,
        _project_id: Uuid,
    ) -> Result<bool> {
        Ok(match action {
            Action::Read | Action::Write => true,
            Action::Admin => self.is_admin(actor),
        })
    }
}
