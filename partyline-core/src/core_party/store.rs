//! Per-invitee invite queues with lazy expiry
//!
//! Each invitee gets its own queue behind its own async mutex. The outer map
//! is sharded, so two players answering invites at the same time never wait
//! on each other, while two operations on the same invitee are serialised.

use super::invite::PartyInvite;
use super::types::{PlayerId, Timestamp};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Pending invites for one invitee, oldest first
#[derive(Debug, Default, Clone)]
pub struct InviteQueue {
    invites: Vec<PartyInvite>,
}

impl InviteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every invite that lapsed before `now`, returning how many went
    pub fn prune(&mut self, now: Timestamp) -> usize {
        let before = self.invites.len();
        self.invites.retain(|invite| !invite.is_expired_at(now));
        before - self.invites.len()
    }

    /// Append an invite at the tail
    pub fn push(&mut self, invite: PartyInvite) {
        self.invites.push(invite);
    }

    /// Most recently added invite
    pub fn latest(&self) -> Option<&PartyInvite> {
        self.invites.last()
    }

    /// Most recently added invite sent by `inviter`
    pub fn latest_from(&self, inviter: PlayerId) -> Option<&PartyInvite> {
        self.invites.iter().rev().find(|invite| invite.is_from(inviter))
    }

    /// Remove the invite with sequence number `id`
    pub fn remove(&mut self, id: u64) -> Option<PartyInvite> {
        let pos = self.invites.iter().position(|invite| invite.id == id)?;
        Some(self.invites.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.invites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartyInvite> {
        self.invites.iter()
    }
}

/// Locked queue handed out by the store
pub type QueueGuard = OwnedMutexGuard<InviteQueue>;

/// Process-wide map from invitee to their queue
///
/// Slots are never removed once created, even when their queue drains, since
/// another task may be waiting on that slot's mutex. The map grows with the
/// number of distinct invitees until [`InviteStore::clear`].
#[derive(Debug, Default)]
pub struct InviteStore {
    queues: DashMap<PlayerId, Arc<Mutex<InviteQueue>>>,
    next_id: AtomicU64,
    pending: AtomicI64,
}

impl InviteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next invite sequence number
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Lock `invitee`'s queue, creating an empty one if needed
    pub async fn lock_or_create(&self, invitee: PlayerId) -> QueueGuard {
        let slot = self
            .queues
            .entry(invitee)
            .or_insert_with(|| Arc::new(Mutex::new(InviteQueue::new())))
            .value()
            .clone();
        slot.lock_owned().await
    }

    /// Lock `invitee`'s queue if one was ever created
    pub async fn lock_existing(&self, invitee: PlayerId) -> Option<QueueGuard> {
        let slot = self.queues.get(&invitee).map(|entry| entry.value().clone())?;
        Some(slot.lock_owned().await)
    }

    /// Record `delta` invites entering (positive) or leaving (negative) any
    /// queue, returning the new total
    pub fn adjust_pending(&self, delta: i64) -> u64 {
        let total = self.pending.fetch_add(delta, Ordering::SeqCst) + delta;
        total.max(0) as u64
    }

    /// Invites held across every queue, as of the last adjustment
    pub fn pending_total(&self) -> u64 {
        self.pending.load(Ordering::SeqCst).max(0) as u64
    }

    /// Number of invitees with a queue slot, empty ones included
    pub fn tracked_invitees(&self) -> usize {
        self.queues.len()
    }

    /// Drop every queue
    pub fn clear(&self) {
        self.queues.clear();
        self.pending.store(0, Ordering::SeqCst);
    }
}
