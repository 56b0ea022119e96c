//! Chat lines sent to players

use super::errors::PartyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Command syntax shown on empty input and in the load banner
pub const PARTY_SYNTAX: &str =
    "/party <player> | /party accept [player] | /party deny [player] | /party leave";

/// A single line of chat for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,

    /// `#RRGGBB`
    pub color: String,
}

impl ChatMessage {
    pub fn new(text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: color.into(),
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Which command a failure is reported for
///
/// `TransitionFailed` reads differently for accept and leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureContext {
    Accept,
    Deny,
    Leave,
}

/// Text for each chat line the plugin produces
pub mod text {
    use std::time::Duration;

    pub fn invite_sent(invitee: &str, timeout: Duration) -> String {
        format!(
            "Invite sent to {}. They have {} to respond.",
            invitee,
            response_window(timeout)
        )
    }

    /// Whole seconds as `60s`, anything finer in humantime form (`1s 500ms`)
    fn response_window(timeout: Duration) -> String {
        if timeout.subsec_nanos() == 0 {
            format!("{}s", timeout.as_secs())
        } else {
            humantime::format_duration(timeout).to_string()
        }
    }

    pub fn invite_received(inviter: &str) -> String {
        format!(
            "{} invited you to their party. Use /party accept or /party deny.",
            inviter
        )
    }

    pub fn joined_party(inviter: &str) -> String {
        format!("You joined {}'s party.", inviter)
    }

    pub fn member_joined(invitee: &str) -> String {
        format!("{} joined your party.", invitee)
    }

    pub fn invite_denied_by(invitee: &str) -> String {
        format!("{} denied your party invite.", invitee)
    }

    pub const INVITE_DENIED: &str = "Invite denied.";
    pub const LEFT_PARTY: &str = "You left the party.";
    pub const PLAYER_NOT_FOUND: &str = "Player not found.";
    pub const CANNOT_INVITE_SELF: &str = "You cannot invite yourself.";
    pub const PARTY_CREATION_FAILED: &str = "Failed to create a new party.";

    pub fn target_in_other_group(target: &str) -> String {
        format!("{} is in a different group. They must leave first.", target)
    }
}

/// Chat text for a failed operation
pub fn failure_text(err: PartyError, context: FailureContext) -> &'static str {
    match err {
        PartyError::NoPendingInvites => "You have no pending party invites.",
        PartyError::NoMatchingInvite => "No pending invite from that player.",
        PartyError::InviterNotFound => "Could not find the inviter you specified.",
        PartyError::InviterOffline => "Inviter is no longer online.",
        PartyError::AlreadyInDifferentGroup => {
            "You are already in a different group. Leave it first."
        }
        PartyError::GroupCreationFailed => {
            "Could not create a party for the inviter. Tell them to try again."
        }
        PartyError::TransitionFailed => match context {
            FailureContext::Leave => "Couldn't leave the party due to a server error.",
            _ => "Failed to join party due to a server error.",
        },
        PartyError::NotInParty => "You're not in a party.",
    }
}
