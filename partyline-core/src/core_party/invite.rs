//! Party invite value type

use super::types::{PlayerId, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A pending offer from `inviter` to `invitee` to join the inviter's party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyInvite {
    /// Registry-unique sequence number
    pub id: u64,

    /// Who sent the invite
    pub inviter: PlayerId,

    /// Who may accept or deny it
    pub invitee: PlayerId,

    /// When the invite was created
    pub created_at: Timestamp,

    /// Last instant at which the invite is still valid
    pub expires_at: Timestamp,
}

impl PartyInvite {
    /// Create an invite valid for `timeout` from `now`
    ///
    /// A zero timeout is stretched to one millisecond so `expires_at` always
    /// lies after `created_at`.
    pub fn new(
        id: u64,
        inviter: PlayerId,
        invitee: PlayerId,
        now: Timestamp,
        timeout: Duration,
    ) -> Self {
        let timeout = timeout.max(Duration::from_millis(1));

        PartyInvite {
            id,
            inviter,
            invitee,
            created_at: now,
            expires_at: now.saturating_add(timeout),
        }
    }

    /// Whether the invite has lapsed at `now`
    ///
    /// The expiry instant itself still counts as valid.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at < now
    }

    /// Time left before the invite lapses
    pub fn remaining(&self, now: Timestamp) -> Duration {
        self.expires_at.saturating_since(now)
    }

    /// Whether this invite was sent by `player`
    pub fn is_from(&self, player: PlayerId) -> bool {
        self.inviter == player
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite_at(now: u64, timeout_secs: u64) -> PartyInvite {
        PartyInvite::new(
            1,
            PlayerId::new(10),
            PlayerId::new(20),
            Timestamp::from_millis(now),
            Duration::from_secs(timeout_secs),
        )
    }

    #[test]
    fn test_create_invite() {
        let invite = invite_at(1_000, 60);

        assert_eq!(invite.created_at, Timestamp::from_millis(1_000));
        assert_eq!(invite.expires_at, Timestamp::from_millis(61_000));
        assert!(invite.is_from(PlayerId::new(10)));
        assert!(!invite.is_from(PlayerId::new(20)));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let invite = invite_at(0, 60);

        assert!(!invite.is_expired_at(Timestamp::from_millis(59_999)));
        assert!(!invite.is_expired_at(Timestamp::from_millis(60_000)));
        assert!(invite.is_expired_at(Timestamp::from_millis(60_001)));
    }

    #[test]
    fn test_zero_timeout_still_expires_after_creation() {
        let invite = invite_at(5_000, 0);
        assert!(invite.expires_at > invite.created_at);
    }

    #[test]
    fn test_remaining() {
        let invite = invite_at(0, 60);
        assert_eq!(invite.remaining(Timestamp::from_millis(15_000)), Duration::from_secs(45));
        assert_eq!(invite.remaining(Timestamp::from_millis(90_000)), Duration::ZERO);
    }
}
