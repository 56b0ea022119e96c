//! Party invites and group transitions
//!
//! A player invites another; the invitee has a bounded window to accept or
//! deny. Accepting moves the invitee into the inviter's group, creating one
//! for the inviter if needed.
//!
//! ## Layout
//!
//! - [`store`]: per-invitee queues, lazily pruned on every access
//! - [`registry`]: add / accept / deny / leave on top of the store
//! - [`host`]: traits the embedding server implements
//! - [`command`]: `/party` parsing and dispatch

pub mod chat;
pub mod clock;
pub mod command;
pub mod errors;
pub mod host;
pub mod invite;
pub mod plugin;
pub mod registry;
pub mod resolve;
pub mod store;
pub mod types;

pub use chat::{ChatMessage, PARTY_SYNTAX};
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{execute, CommandOutcome, InviteRejection, PartyCommand};
pub use errors::{PartyError, PartyResult, ServiceError};
pub use host::{Collaborators, GroupService, Notifier, PlayerDirectory};
pub use invite::PartyInvite;
pub use plugin::PartyPlugin;
pub use registry::{InviteRegistry, Joined, Left};
pub use resolve::resolve_by_name_or_id;
pub use types::{GroupId, GroupRank, PlayerId, Timestamp};
