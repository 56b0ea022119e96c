//! Invite registry: the stateful heart of the party system
//!
//! Owns the per-invitee invite queues and turns accepted invites into group
//! membership changes through the host collaborators. Every operation
//! returns a typed result; turning failures into chat text is up to the
//! caller (see `command`).

use super::chat::{text, ChatMessage};
use super::clock::{Clock, SystemClock};
use super::errors::{PartyError, PartyResult};
use super::host::Collaborators;
use super::invite::PartyInvite;
use super::store::{InviteQueue, InviteStore};
use super::types::{GroupId, GroupRank, PlayerId};
use crate::config::InviteConfig;
use crate::metrics::{self as party_metrics, record_counter, record_gauge};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Result of a successful accept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Joined {
    /// The invite that was consumed
    pub invite: PartyInvite,

    /// Group the invitee now belongs to
    pub group: GroupId,

    /// Whether the group was created for the inviter by this accept
    pub created_group: bool,
}

/// Result of a successful leave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Left {
    pub group: GroupId,
}

/// Process-wide invite state plus the wiring to the host
pub struct InviteRegistry {
    store: InviteStore,
    settings: InviteConfig,
    color: String,
    clock: Arc<dyn Clock>,
    host: Collaborators,
}

impl InviteRegistry {
    /// Create an empty registry on the wall clock
    pub fn new(settings: InviteConfig, color: impl Into<String>, host: Collaborators) -> Self {
        Self {
            store: InviteStore::new(),
            settings,
            color: color.into(),
            clock: Arc::new(SystemClock),
            host,
        }
    }

    /// Replace the time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &InviteConfig {
        &self.settings
    }

    pub fn host(&self) -> &Collaborators {
        &self.host
    }

    /// Send one chat line in the configured colour
    pub async fn tell(&self, player: PlayerId, message: impl Into<String>) {
        self.host
            .notifier
            .notify(player, ChatMessage::new(message, self.color.clone()))
            .await;
    }

    async fn name_of(&self, player: PlayerId) -> String {
        self.host
            .players
            .display_name(player)
            .await
            .unwrap_or_else(|| player.to_string())
    }

    fn prune(&self, invitee: PlayerId, queue: &mut InviteQueue) {
        let expired = queue.prune(self.clock.now());
        if expired > 0 {
            debug!(%invitee, expired, "Pruned expired invites");
            self.track_pending(-(expired as i64));
        }
        record_counter(party_metrics::INVITES_EXPIRED, expired as u64);
    }

    fn track_pending(&self, delta: i64) {
        let total = self.store.adjust_pending(delta);
        record_gauge(party_metrics::INVITES_PENDING, total as f64);
    }

    fn consume(&self, queue: &mut InviteQueue, id: u64) {
        if queue.remove(id).is_some() {
            self.track_pending(-1);
        }
    }

    /// Queue an invite using the configured timeout
    pub async fn add_invite(&self, inviter: PlayerId, invitee: PlayerId) -> PartyInvite {
        self.add_invite_with_timeout(inviter, invitee, self.settings.timeout)
            .await
    }

    /// Queue an invite that stays valid for `timeout`
    ///
    /// Duplicates are kept: inviting the same player twice leaves two entries.
    pub async fn add_invite_with_timeout(
        &self,
        inviter: PlayerId,
        invitee: PlayerId,
        timeout: Duration,
    ) -> PartyInvite {
        let invite = {
            let mut queue = self.store.lock_or_create(invitee).await;
            self.prune(invitee, &mut queue);

            let invite = PartyInvite::new(
                self.store.next_id(),
                inviter,
                invitee,
                self.clock.now(),
                timeout,
            );
            queue.push(invite.clone());
            self.track_pending(1);
            invite
        };
        record_counter(party_metrics::INVITES_ADDED, 1);
        info!(%inviter, %invitee, id = invite.id, "Party invite created");

        let inviter_name = self.name_of(inviter).await;
        let invitee_name = self.name_of(invitee).await;
        self.tell(inviter, text::invite_sent(&invitee_name, timeout))
            .await;
        self.tell(invitee, text::invite_received(&inviter_name))
            .await;

        invite
    }

    /// Pick the invite an accept or deny acts on, without removing it
    ///
    /// With a filter, the newest invite from the resolved inviter; without
    /// one, the newest invite overall.
    async fn select(
        &self,
        invitee: PlayerId,
        queue: &mut InviteQueue,
        filter: Option<&str>,
    ) -> PartyResult<PartyInvite> {
        self.prune(invitee, queue);
        if queue.is_empty() {
            return Err(PartyError::NoPendingInvites);
        }

        match filter.map(str::trim).filter(|f| !f.is_empty()) {
            Some(query) => {
                let inviter = self
                    .host
                    .players
                    .resolve(query)
                    .await
                    .ok_or(PartyError::InviterNotFound)?;
                queue
                    .latest_from(inviter)
                    .cloned()
                    .ok_or(PartyError::NoMatchingInvite)
            }
            None => queue.latest().cloned().ok_or(PartyError::NoPendingInvites),
        }
    }

    /// Accept a pending invite and join the inviter's group
    ///
    /// Checks run in a fixed order: inviter online, cross-group policy, group
    /// creation, membership write. Only an offline inviter or a successful
    /// join consumes the invite.
    pub async fn accept_invite(
        &self,
        invitee: PlayerId,
        filter: Option<&str>,
    ) -> PartyResult<Joined> {
        let mut queue = self
            .store
            .lock_existing(invitee)
            .await
            .ok_or(PartyError::NoPendingInvites)?;
        let invite = self.select(invitee, &mut queue, filter).await?;
        let inviter = invite.inviter;

        if !self.host.players.is_present(inviter).await {
            self.consume(&mut queue, invite.id);
            record_counter(party_metrics::ACCEPT_FAILED, 1);
            debug!(%inviter, %invitee, "Dropped invite from offline inviter");
            return Err(PartyError::InviterOffline);
        }

        let inviter_group = self.host.players.current_group(inviter).await;

        if !self.settings.allow_across_groups {
            if let Some(current) = self.host.players.current_group(invitee).await {
                if inviter_group != Some(current) {
                    record_counter(party_metrics::ACCEPT_FAILED, 1);
                    return Err(PartyError::AlreadyInDifferentGroup);
                }
            }
        }

        let (group, created_group) = match inviter_group {
            Some(group) => (group, false),
            None => (self.create_group_for(inviter).await?, true),
        };

        if let Err(e) = self
            .host
            .groups
            .assign_to_group(invitee, group, GroupRank::Member)
            .await
        {
            error!(%invitee, %group, error = %e, "Failed to assign invitee to party");
            record_counter(party_metrics::ACCEPT_FAILED, 1);
            return Err(PartyError::TransitionFailed);
        }

        self.consume(&mut queue, invite.id);
        drop(queue);
        record_counter(party_metrics::INVITES_ACCEPTED, 1);
        info!(%inviter, %invitee, %group, created_group, "Party invite accepted");

        let inviter_name = self.name_of(inviter).await;
        let invitee_name = self.name_of(invitee).await;
        self.tell(invitee, text::joined_party(&inviter_name)).await;
        self.tell(inviter, text::member_joined(&invitee_name)).await;

        Ok(Joined {
            invite,
            group,
            created_group,
        })
    }

    async fn create_group_for(&self, owner: PlayerId) -> PartyResult<GroupId> {
        let group = match self.host.groups.create_group(owner).await {
            Ok(group) => group,
            Err(e) => {
                warn!(%owner, error = %e, "Group creation failed");
                return Err(self.group_creation_failed(owner).await);
            }
        };

        if let Err(e) = self
            .host
            .groups
            .assign_to_group(owner, group, GroupRank::Owner)
            .await
        {
            warn!(%owner, %group, error = %e, "Could not make inviter owner of new group");
            return Err(self.group_creation_failed(owner).await);
        }

        debug!(%owner, %group, "Created party group");
        Ok(group)
    }

    async fn group_creation_failed(&self, owner: PlayerId) -> PartyError {
        record_counter(party_metrics::ACCEPT_FAILED, 1);
        self.tell(owner, text::PARTY_CREATION_FAILED).await;
        PartyError::GroupCreationFailed
    }

    /// Turn down a pending invite
    pub async fn deny_invite(
        &self,
        invitee: PlayerId,
        filter: Option<&str>,
    ) -> PartyResult<PartyInvite> {
        let invite = {
            let mut queue = self
                .store
                .lock_existing(invitee)
                .await
                .ok_or(PartyError::NoPendingInvites)?;
            let invite = self.select(invitee, &mut queue, filter).await?;
            self.consume(&mut queue, invite.id);
            invite
        };
        record_counter(party_metrics::INVITES_DENIED, 1);
        info!(inviter = %invite.inviter, %invitee, "Party invite denied");

        if self.host.players.is_present(invite.inviter).await {
            let invitee_name = self.name_of(invitee).await;
            self.tell(invite.inviter, text::invite_denied_by(&invitee_name))
                .await;
        }
        self.tell(invitee, text::INVITE_DENIED).await;

        Ok(invite)
    }

    /// Leave the current group
    ///
    /// Pending invites sent or received by the player are left alone.
    pub async fn leave_party(&self, player: PlayerId) -> PartyResult<Left> {
        let group = self
            .host
            .players
            .current_group(player)
            .await
            .ok_or(PartyError::NotInParty)?;

        if let Err(e) = self.host.groups.clear_group(player).await {
            error!(%player, %group, error = %e, "Failed to leave party");
            return Err(PartyError::TransitionFailed);
        }

        record_counter(party_metrics::LEAVE_TOTAL, 1);
        info!(%player, %group, "Player left party");
        self.tell(player, text::LEFT_PARTY).await;

        Ok(Left { group })
    }

    /// Unexpired invites for `invitee`, oldest first
    pub async fn pending_invites(&self, invitee: PlayerId) -> Vec<PartyInvite> {
        match self.store.lock_existing(invitee).await {
            Some(mut queue) => {
                self.prune(invitee, &mut queue);
                queue.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Unexpired invites across every invitee, as of each queue's last prune
    pub fn pending_total(&self) -> u64 {
        self.store.pending_total()
    }

    /// Number of invitees that ever received an invite since the last clear
    pub fn tracked_invitees(&self) -> usize {
        self.store.tracked_invitees()
    }

    /// Forget every pending invite
    pub fn clear(&self) {
        self.store.clear();
        info!("Invite registry cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Fault, InMemoryHost};
    use crate::core_party::clock::ManualClock;
    use crate::core_party::types::Timestamp;

    const ALICE: PlayerId = PlayerId(1);
    const BOB: PlayerId = PlayerId(2);
    const CAROL: PlayerId = PlayerId(3);

    struct Fixture {
        host: Arc<InMemoryHost>,
        clock: ManualClock,
        registry: InviteRegistry,
    }

    fn fixture_with(settings: InviteConfig) -> Fixture {
        let host = Arc::new(InMemoryHost::new());
        host.connect(ALICE, "Alice");
        host.connect(BOB, "Bob");
        host.connect(CAROL, "Carol");

        let clock = ManualClock::new(Timestamp::from_millis(1_000_000));
        let registry = InviteRegistry::new(settings, "#00FFAA", Collaborators::from_host(host.clone()))
            .with_clock(Arc::new(clock.clone()));

        Fixture {
            host,
            clock,
            registry,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(InviteConfig::default())
    }

    #[tokio::test]
    async fn test_add_invite_notifies_both() {
        let f = fixture();
        let invite = f.registry.add_invite(ALICE, BOB).await;

        assert_eq!(invite.inviter, ALICE);
        assert_eq!(invite.invitee, BOB);
        assert_eq!(
            invite.expires_at,
            Timestamp::from_millis(1_000_000 + 60_000)
        );
        assert_eq!(
            f.host.messages_for(ALICE),
            vec!["Invite sent to Bob. They have 60s to respond."]
        );
        assert_eq!(
            f.host.messages_for(BOB),
            vec!["Alice invited you to their party. Use /party accept or /party deny."]
        );
    }

    #[tokio::test]
    async fn test_accept_creates_group_for_inviter() {
        let f = fixture();
        f.registry.add_invite(ALICE, BOB).await;

        let joined = f.registry.accept_invite(BOB, None).await.unwrap();

        assert!(joined.created_group);
        assert_eq!(f.host.group_of(ALICE), Some(joined.group));
        assert_eq!(f.host.group_of(BOB), Some(joined.group));
        assert_eq!(
            f.host.members(joined.group).get(&ALICE),
            Some(&GroupRank::Owner)
        );
        assert!(f.registry.pending_invites(BOB).await.is_empty());
        assert!(f
            .host
            .messages_for(BOB)
            .contains(&"You joined Alice's party.".to_string()));
        assert!(f
            .host
            .messages_for(ALICE)
            .contains(&"Bob joined your party.".to_string()));
    }

    #[tokio::test]
    async fn test_accept_joins_existing_group() {
        let f = fixture();
        let group = f.host.form_group(ALICE);
        f.registry.add_invite(ALICE, BOB).await;

        let joined = f.registry.accept_invite(BOB, None).await.unwrap();
        assert!(!joined.created_group);
        assert_eq!(joined.group, group);
    }

    #[tokio::test]
    async fn test_newest_invite_wins_without_filter() {
        let f = fixture();
        f.registry.add_invite(ALICE, BOB).await;
        f.clock.advance(Duration::from_secs(1));
        f.registry.add_invite(CAROL, BOB).await;

        let joined = f.registry.accept_invite(BOB, None).await.unwrap();
        assert_eq!(joined.invite.inviter, CAROL);

        let left = f.registry.pending_invites(BOB).await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].inviter, ALICE);
    }

    #[tokio::test]
    async fn test_filter_picks_latest_duplicate() {
        let f = fixture();
        let first = f.registry.add_invite(ALICE, BOB).await;
        let second = f.registry.add_invite(ALICE, BOB).await;
        f.registry.add_invite(CAROL, BOB).await;

        let denied = f.registry.deny_invite(BOB, Some("alice")).await.unwrap();
        assert_eq!(denied.id, second.id);

        let remaining: Vec<u64> = f
            .registry
            .pending_invites(BOB)
            .await
            .iter()
            .map(|i| i.id)
            .collect();
        assert!(remaining.contains(&first.id));
        assert_eq!(remaining.len(), 2);
    }

    #[tokio::test]
    async fn test_selection_errors() {
        let f = fixture();
        assert_eq!(
            f.registry.accept_invite(BOB, None).await,
            Err(PartyError::NoPendingInvites)
        );

        f.registry.add_invite(ALICE, BOB).await;
        assert_eq!(
            f.registry.accept_invite(BOB, Some("zed")).await,
            Err(PartyError::InviterNotFound)
        );
        assert_eq!(
            f.registry.deny_invite(BOB, Some("carol")).await,
            Err(PartyError::NoMatchingInvite)
        );
        // Whitespace filter counts as no filter
        assert!(f.registry.deny_invite(BOB, Some("  ")).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_invite_is_not_selectable() {
        let f = fixture();
        f.registry.add_invite(ALICE, BOB).await;

        f.clock.advance(Duration::from_secs(60));
        assert_eq!(f.registry.pending_invites(BOB).await.len(), 1);

        f.clock.advance(Duration::from_millis(1));
        assert_eq!(
            f.registry.accept_invite(BOB, None).await,
            Err(PartyError::NoPendingInvites)
        );
    }

    #[tokio::test]
    async fn test_offline_inviter_consumes_invite() {
        let f = fixture();
        f.registry.add_invite(ALICE, BOB).await;
        f.host.disconnect(ALICE);

        assert_eq!(
            f.registry.accept_invite(BOB, None).await,
            Err(PartyError::InviterOffline)
        );
        assert!(f.registry.pending_invites(BOB).await.is_empty());
    }

    #[tokio::test]
    async fn test_policy_gate_keeps_invite() {
        let f = fixture();
        f.host.form_group(ALICE);
        f.host.form_group(BOB);
        f.registry.add_invite(ALICE, BOB).await;

        assert_eq!(
            f.registry.accept_invite(BOB, None).await,
            Err(PartyError::AlreadyInDifferentGroup)
        );
        assert_eq!(f.registry.pending_invites(BOB).await.len(), 1);

        f.registry.leave_party(BOB).await.unwrap();
        assert!(f.registry.accept_invite(BOB, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_policy_gate_when_inviter_has_no_group() {
        let f = fixture();
        f.host.form_group(BOB);
        f.registry.add_invite(ALICE, BOB).await;

        assert_eq!(
            f.registry.accept_invite(BOB, None).await,
            Err(PartyError::AlreadyInDifferentGroup)
        );
        // No group was created for Alice on the way
        assert_eq!(f.host.group_of(ALICE), None);
    }

    #[tokio::test]
    async fn test_across_groups_allowed() {
        let settings = InviteConfig {
            allow_across_groups: true,
            ..InviteConfig::default()
        };
        let f = fixture_with(settings);
        let alice_group = f.host.form_group(ALICE);
        f.host.form_group(BOB);
        f.registry.add_invite(ALICE, BOB).await;

        let joined = f.registry.accept_invite(BOB, None).await.unwrap();
        assert_eq!(joined.group, alice_group);
    }

    #[tokio::test]
    async fn test_group_creation_failure_keeps_invite() {
        let f = fixture();
        f.host.set_fault(Fault::CreateGroup, true);
        f.registry.add_invite(ALICE, BOB).await;
        f.host.take_outbox();

        assert_eq!(
            f.registry.accept_invite(BOB, None).await,
            Err(PartyError::GroupCreationFailed)
        );
        assert_eq!(f.registry.pending_invites(BOB).await.len(), 1);
        assert_eq!(
            f.host.messages_for(ALICE),
            vec!["Failed to create a new party."]
        );
    }

    #[tokio::test]
    async fn test_owner_assignment_failure_is_creation_failure() {
        let f = fixture();
        f.host.set_fault(Fault::AssignOwner, true);
        f.registry.add_invite(ALICE, BOB).await;
        f.host.take_outbox();

        for _ in 0..3 {
            assert_eq!(
                f.registry.accept_invite(BOB, None).await,
                Err(PartyError::GroupCreationFailed)
            );
        }
        assert_eq!(
            f.host.messages_for(ALICE),
            vec!["Failed to create a new party."; 3]
        );
        // Ownerless groups from the failed attempts are not listed
        assert!(f.host.groups().is_empty());

        f.host.set_fault(Fault::AssignOwner, false);
        let joined = f.registry.accept_invite(BOB, None).await.unwrap();
        assert_eq!(f.host.groups().len(), 1);
        assert_eq!(f.host.groups()[0].id, joined.group);
    }

    #[tokio::test]
    async fn test_pending_total_follows_every_queue() {
        let f = fixture();
        f.registry.add_invite(ALICE, BOB).await;
        f.registry.add_invite(CAROL, BOB).await;
        f.clock.advance(Duration::from_secs(30));
        f.registry.add_invite(ALICE, CAROL).await;
        assert_eq!(f.registry.pending_total(), 3);

        f.registry.deny_invite(BOB, Some("carol")).await.unwrap();
        assert_eq!(f.registry.pending_total(), 2);

        // Bob's remaining invite lapses; Carol's has 30s left
        f.clock.advance(Duration::from_secs(31));
        assert!(f.registry.pending_invites(BOB).await.is_empty());
        assert_eq!(f.registry.pending_total(), 1);

        f.registry.accept_invite(CAROL, None).await.unwrap();
        assert_eq!(f.registry.pending_total(), 0);

        f.registry.add_invite(BOB, ALICE).await;
        f.registry.clear();
        assert_eq!(f.registry.pending_total(), 0);
    }

    #[tokio::test]
    async fn test_membership_failure_keeps_invite() {
        let f = fixture();
        f.host.set_fault(Fault::AssignMember, true);
        f.registry.add_invite(ALICE, BOB).await;

        assert_eq!(
            f.registry.accept_invite(BOB, None).await,
            Err(PartyError::TransitionFailed)
        );
        assert_eq!(f.registry.pending_invites(BOB).await.len(), 1);
        assert_eq!(f.host.group_of(BOB), None);
    }

    #[tokio::test]
    async fn test_deny_notifies_and_is_idempotent() {
        let f = fixture();
        f.registry.add_invite(ALICE, BOB).await;
        f.host.take_outbox();

        f.registry.deny_invite(BOB, None).await.unwrap();
        assert_eq!(f.host.messages_for(ALICE), vec!["Bob denied your party invite."]);
        assert_eq!(f.host.messages_for(BOB), vec!["Invite denied."]);

        assert_eq!(
            f.registry.deny_invite(BOB, None).await,
            Err(PartyError::NoPendingInvites)
        );
    }

    #[tokio::test]
    async fn test_deny_skips_offline_inviter() {
        let f = fixture();
        f.registry.add_invite(ALICE, BOB).await;
        f.host.take_outbox();
        f.host.disconnect(ALICE);

        f.registry.deny_invite(BOB, None).await.unwrap();
        assert!(f.host.messages_for(ALICE).is_empty());
    }

    #[tokio::test]
    async fn test_leave_party() {
        let f = fixture();
        assert_eq!(
            f.registry.leave_party(ALICE).await,
            Err(PartyError::NotInParty)
        );

        let group = f.host.form_group(ALICE);
        f.registry.add_invite(ALICE, BOB).await;

        let left = f.registry.leave_party(ALICE).await.unwrap();
        assert_eq!(left.group, group);
        assert_eq!(f.host.group_of(ALICE), None);
        // Invites sent by the leaver survive
        assert_eq!(f.registry.pending_invites(BOB).await.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_failure() {
        let f = fixture();
        f.host.form_group(ALICE);
        f.host.set_fault(Fault::ClearGroup, true);

        assert_eq!(
            f.registry.leave_party(ALICE).await,
            Err(PartyError::TransitionFailed)
        );
        assert!(f.host.group_of(ALICE).is_some());
    }

    #[tokio::test]
    async fn test_clear() {
        let f = fixture();
        f.registry.add_invite(ALICE, BOB).await;
        f.registry.add_invite(ALICE, CAROL).await;

        f.registry.clear();
        assert_eq!(f.registry.tracked_invitees(), 0);
        assert!(f.registry.pending_invites(BOB).await.is_empty());
    }
}
