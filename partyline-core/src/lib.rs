//! Partyline core: time-bounded party invites for multiplayer servers

pub mod adapters;
pub mod config;
pub mod core_party;
pub mod logging;
pub mod metrics;

pub use core_party::{
    CommandOutcome, GroupId, InviteRegistry, PartyError, PartyInvite, PartyPlugin, PlayerId,
};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = LogLevel::Info;
        let _ = PartyError::NoPendingInvites;
        let _ = PlayerId::new(1);
    }
}
