//! In-memory host for tests and the CLI
//!
//! Plays the part of the game server: a roster of players, a table of groups,
//! and an outbox of chat lines. Individual collaborator calls can be made to
//! fail so the registry's error paths can be driven.

use crate::core_party::chat::ChatMessage;
use crate::core_party::errors::ServiceError;
use crate::core_party::host::{GroupService, Notifier, PlayerDirectory};
use crate::core_party::resolve::resolve_by_name_or_id;
use crate::core_party::types::{GroupId, GroupRank, PlayerId};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Collaborator calls that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    CreateGroup,
    AssignOwner,
    AssignMember,
    ClearGroup,
}

#[derive(Debug, Clone)]
struct PlayerRecord {
    id: PlayerId,
    name: String,
    online: bool,
    group: Option<GroupId>,
}

/// Snapshot of one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub id: GroupId,
    pub members: BTreeMap<PlayerId, GroupRank>,
}

/// A chat line that was delivered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: PlayerId,
    pub message: ChatMessage,
}

#[derive(Debug, Default)]
struct HostState {
    // Vec keeps join order, which is the resolver's tie-break order
    players: Vec<PlayerRecord>,
    groups: HashMap<GroupId, BTreeMap<PlayerId, GroupRank>>,
    next_group: u64,
    outbox: Vec<Delivery>,
    faults: HashSet<Fault>,
}

impl HostState {
    fn player(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerRecord> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    fn detach(&mut self, id: PlayerId) {
        let previous = self.player_mut(id).and_then(|p| p.group.take());
        if let Some(group) = previous {
            if let Some(members) = self.groups.get_mut(&group) {
                members.remove(&id);
                if members.is_empty() {
                    self.groups.remove(&group);
                }
            }
        }
    }

    fn new_group(&mut self) -> GroupId {
        self.next_group += 1;
        let id = GroupId::new(self.next_group);
        self.groups.insert(id, BTreeMap::new());
        id
    }
}

/// Game server stand-in implementing every host collaborator
#[derive(Debug, Default)]
pub struct InMemoryHost {
    state: Mutex<HostState>,
    yield_on_assign: AtomicBool,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bring a player online, adding them to the roster on first sight
    pub fn connect(&self, id: PlayerId, name: impl Into<String>) {
        let mut state = self.state();
        let name = name.into();
        match state.player_mut(id) {
            Some(record) => {
                record.online = true;
                record.name = name;
            }
            None => state.players.push(PlayerRecord {
                id,
                name,
                online: true,
                group: None,
            }),
        }
    }

    /// Take a player offline; their group membership is kept
    pub fn disconnect(&self, id: PlayerId) {
        if let Some(record) = self.state().player_mut(id) {
            record.online = false;
        }
    }

    /// Look a player up by exact display name, online or not
    pub fn player_named(&self, name: &str) -> Option<PlayerId> {
        self.state()
            .players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| p.id)
    }

    /// Create a group owned by `owner` outside the invite flow
    pub fn form_group(&self, owner: PlayerId) -> GroupId {
        let mut state = self.state();
        state.detach(owner);
        let group = state.new_group();
        if let Some(members) = state.groups.get_mut(&group) {
            members.insert(owner, GroupRank::Owner);
        }
        if let Some(record) = state.player_mut(owner) {
            record.group = Some(group);
        }
        group
    }

    /// Group a player belongs to, online or not
    pub fn group_of(&self, id: PlayerId) -> Option<GroupId> {
        self.state().player(id).and_then(|p| p.group)
    }

    /// Members of a group with their ranks
    pub fn members(&self, group: GroupId) -> BTreeMap<PlayerId, GroupRank> {
        self.state().groups.get(&group).cloned().unwrap_or_default()
    }

    /// Every non-empty group, ordered by id
    ///
    /// A group created for an owner who was never assigned stays empty and
    /// is left out.
    pub fn groups(&self) -> Vec<GroupSnapshot> {
        let state = self.state();
        let mut groups: Vec<GroupSnapshot> = state
            .groups
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(id, members)| GroupSnapshot {
                id: *id,
                members: members.clone(),
            })
            .collect();
        groups.sort_by_key(|g| g.id);
        groups
    }

    /// Display name for any known player
    pub fn name_of(&self, id: PlayerId) -> Option<String> {
        self.state().player(id).map(|p| p.name.clone())
    }

    /// Make a collaborator call fail until cleared
    pub fn set_fault(&self, fault: Fault, enabled: bool) {
        let mut state = self.state();
        if enabled {
            state.faults.insert(fault);
        } else {
            state.faults.remove(&fault);
        }
    }

    /// Hand control back to the scheduler before every group assignment
    ///
    /// Lets tests interleave other tasks with an accept that is in flight.
    pub fn set_yield_on_assign(&self, enabled: bool) {
        self.yield_on_assign.store(enabled, Ordering::SeqCst);
    }

    /// Texts delivered to `player` so far, oldest first
    pub fn messages_for(&self, player: PlayerId) -> Vec<String> {
        self.state()
            .outbox
            .iter()
            .filter(|d| d.to == player)
            .map(|d| d.message.text.clone())
            .collect()
    }

    /// Drain everything delivered so far
    pub fn take_outbox(&self) -> Vec<Delivery> {
        std::mem::take(&mut self.state().outbox)
    }
}

#[async_trait]
impl PlayerDirectory for InMemoryHost {
    async fn resolve(&self, query: &str) -> Option<PlayerId> {
        let state = self.state();
        let online = state
            .players
            .iter()
            .filter(|p| p.online)
            .map(|p| (p.id, p.name.as_str()));
        resolve_by_name_or_id(query, online)
    }

    async fn is_present(&self, player: PlayerId) -> bool {
        self.state().player(player).map(|p| p.online).unwrap_or(false)
    }

    async fn display_name(&self, player: PlayerId) -> Option<String> {
        self.state()
            .player(player)
            .filter(|p| p.online)
            .map(|p| p.name.clone())
    }

    async fn current_group(&self, player: PlayerId) -> Option<GroupId> {
        self.group_of(player)
    }
}

#[async_trait]
impl GroupService for InMemoryHost {
    async fn create_group(&self, owner: PlayerId) -> Result<GroupId, ServiceError> {
        let mut state = self.state();
        if state.faults.contains(&Fault::CreateGroup) {
            return Err(ServiceError::Unavailable("group creation disabled".to_string()));
        }
        if state.player(owner).is_none() {
            return Err(ServiceError::UnknownPlayer(owner.as_u64()));
        }
        Ok(state.new_group())
    }

    async fn assign_to_group(
        &self,
        player: PlayerId,
        group: GroupId,
        rank: GroupRank,
    ) -> Result<(), ServiceError> {
        if self.yield_on_assign.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        let mut state = self.state();
        let fault = match rank {
            GroupRank::Owner => Fault::AssignOwner,
            GroupRank::Member => Fault::AssignMember,
        };
        if state.faults.contains(&fault) {
            return Err(ServiceError::Rejected(format!("cannot assign {} as {}", player, rank)));
        }
        if state.player(player).is_none() {
            return Err(ServiceError::UnknownPlayer(player.as_u64()));
        }
        if !state.groups.contains_key(&group) {
            return Err(ServiceError::UnknownGroup(group.as_u64()));
        }

        if state.player(player).and_then(|p| p.group) != Some(group) {
            state.detach(player);
        }
        if let Some(members) = state.groups.get_mut(&group) {
            members.insert(player, rank);
        }
        if let Some(record) = state.player_mut(player) {
            record.group = Some(group);
        }
        Ok(())
    }

    async fn clear_group(&self, player: PlayerId) -> Result<(), ServiceError> {
        let mut state = self.state();
        if state.faults.contains(&Fault::ClearGroup) {
            return Err(ServiceError::Unavailable("group service offline".to_string()));
        }
        if state.player(player).is_none() {
            return Err(ServiceError::UnknownPlayer(player.as_u64()));
        }
        state.detach(player);
        Ok(())
    }
}

#[async_trait]
impl Notifier for InMemoryHost {
    async fn notify(&self, player: PlayerId, message: ChatMessage) {
        self.state().outbox.push(Delivery { to: player, message });
    }
}
