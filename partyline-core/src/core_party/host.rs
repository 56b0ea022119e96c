//! Host collaborator traits
//!
//! The registry never owns players or groups. It talks to the embedding game
//! server through three narrow traits:
//!
//! ```text
//! InviteRegistry
//!       |
//!       +---> PlayerDirectory  (who is online, which group they are in)
//!       |
//!       +---> GroupService     (create groups, move players between them)
//!       |
//!       +---> Notifier         (chat lines to a single player)
//! ```
//!
//! A host implements each trait once. `adapters::InMemoryHost` implements all
//! three for tests and the CLI.

use super::chat::ChatMessage;
use super::errors::ServiceError;
use super::types::{GroupId, GroupRank, PlayerId};
use async_trait::async_trait;
use std::sync::Arc;

/// Live player lookup
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Resolve a name or numeric id typed by a player to a live identity
    async fn resolve(&self, query: &str) -> Option<PlayerId>;

    /// Whether the player is currently connected
    async fn is_present(&self, player: PlayerId) -> bool;

    /// Display name of a connected player
    async fn display_name(&self, player: PlayerId) -> Option<String>;

    /// Group the player currently belongs to
    async fn current_group(&self, player: PlayerId) -> Option<GroupId>;
}

/// Group creation and membership changes
#[async_trait]
pub trait GroupService: Send + Sync {
    /// Create a new empty group for `owner`
    ///
    /// The caller still has to assign the owner into the group.
    async fn create_group(&self, owner: PlayerId) -> Result<GroupId, ServiceError>;

    /// Move `player` into `group` with `rank`
    async fn assign_to_group(
        &self,
        player: PlayerId,
        group: GroupId,
        rank: GroupRank,
    ) -> Result<(), ServiceError>;

    /// Remove `player` from whatever group they are in
    async fn clear_group(&self, player: PlayerId) -> Result<(), ServiceError>;
}

/// Best-effort delivery of chat lines
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, player: PlayerId, message: ChatMessage);
}

/// The three collaborators the registry is wired with
#[derive(Clone)]
pub struct Collaborators {
    pub players: Arc<dyn PlayerDirectory>,
    pub groups: Arc<dyn GroupService>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Use one host object for all three roles
    pub fn from_host<H>(host: Arc<H>) -> Self
    where
        H: PlayerDirectory + GroupService + Notifier + 'static,
    {
        Self {
            players: host.clone(),
            groups: host.clone(),
            notifier: host,
        }
    }
}
