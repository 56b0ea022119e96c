//! Error types for party operations

use thiserror::Error;

/// Result type for registry operations
pub type PartyResult<T> = Result<T, PartyError>;

/// User-facing outcomes of a failed party operation
///
/// None of these are fatal. The caller turns them into chat text.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyError {
    #[error("no pending party invites")]
    NoPendingInvites,

    #[error("no pending invite from that player")]
    NoMatchingInvite,

    #[error("inviter could not be found")]
    InviterNotFound,

    #[error("inviter is no longer online")]
    InviterOffline,

    #[error("already in a different group")]
    AlreadyInDifferentGroup,

    #[error("could not create a group for the inviter")]
    GroupCreationFailed,

    #[error("group membership change failed")]
    TransitionFailed,

    #[error("not in a party")]
    NotInParty,
}

/// Failures reported by a host collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Host service is down or refused to serve the call
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Host understood the call but would not perform it
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("unknown player: {0}")]
    UnknownPlayer(u64),

    #[error("unknown group: {0}")]
    UnknownGroup(u64),
}
