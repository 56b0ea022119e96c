//! `/party` command parsing and dispatch

use super::chat::{failure_text, text, FailureContext, PARTY_SYNTAX};
use super::errors::PartyError;
use super::invite::PartyInvite;
use super::registry::{InviteRegistry, Joined, Left};
use super::types::PlayerId;

/// A parsed `/party` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartyCommand {
    /// No arguments
    Usage,
    /// `/party <player>`
    Invite(String),
    /// `/party accept [player]`
    Accept(Option<String>),
    /// `/party deny [player]`
    Deny(Option<String>),
    /// `/party leave`
    Leave,
}

impl PartyCommand {
    /// Parse the arguments that followed `/party`
    ///
    /// The subcommand is matched case-insensitively. Remaining arguments are
    /// joined with single spaces so names containing spaces survive.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let Some((first, rest)) = args.split_first() else {
            return PartyCommand::Usage;
        };

        let rest_joined = || {
            let joined = rest
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(" ");
            Some(joined).filter(|s| !s.trim().is_empty())
        };

        match first.as_ref().to_lowercase().as_str() {
            "accept" => PartyCommand::Accept(rest_joined()),
            "deny" => PartyCommand::Deny(rest_joined()),
            "leave" => PartyCommand::Leave,
            _ => PartyCommand::Invite(
                args.iter()
                    .map(|s| s.as_ref())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }

    /// Split a raw chat line such as `/party accept Bob` or `accept Bob`
    pub fn parse_line(line: &str) -> Self {
        let line = line.trim();
        let line = line.strip_prefix("/party").unwrap_or(line);
        let args: Vec<&str> = line.split_whitespace().collect();
        Self::parse(&args)
    }
}

/// Why an invite was refused before reaching the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteRejection {
    PlayerNotFound,
    SelfInvite,
    TargetInOtherGroup,
}

/// What a dispatched command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Usage,
    Invited(PartyInvite),
    Rejected(InviteRejection),
    Joined(Joined),
    Denied(PartyInvite),
    Left(Left),
    Failed(PartyError),
}

impl CommandOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            CommandOutcome::Invited(_)
                | CommandOutcome::Joined(_)
                | CommandOutcome::Denied(_)
                | CommandOutcome::Left(_)
        )
    }
}

/// Run `command` for `caller`, replying to them in chat
///
/// Success messages are sent by the registry; refusals and failures are
/// rendered here.
pub async fn execute(
    registry: &InviteRegistry,
    caller: PlayerId,
    command: PartyCommand,
) -> CommandOutcome {
    match command {
        PartyCommand::Usage => {
            registry.tell(caller, PARTY_SYNTAX).await;
            CommandOutcome::Usage
        }
        PartyCommand::Accept(filter) => {
            match registry.accept_invite(caller, filter.as_deref()).await {
                Ok(joined) => CommandOutcome::Joined(joined),
                Err(e) => fail(registry, caller, e, FailureContext::Accept).await,
            }
        }
        PartyCommand::Deny(filter) => match registry.deny_invite(caller, filter.as_deref()).await {
            Ok(invite) => CommandOutcome::Denied(invite),
            Err(e) => fail(registry, caller, e, FailureContext::Deny).await,
        },
        PartyCommand::Leave => match registry.leave_party(caller).await {
            Ok(left) => CommandOutcome::Left(left),
            Err(e) => fail(registry, caller, e, FailureContext::Leave).await,
        },
        PartyCommand::Invite(query) => invite(registry, caller, &query).await,
    }
}

async fn fail(
    registry: &InviteRegistry,
    caller: PlayerId,
    err: PartyError,
    context: FailureContext,
) -> CommandOutcome {
    registry.tell(caller, failure_text(err, context)).await;
    CommandOutcome::Failed(err)
}

async fn invite(registry: &InviteRegistry, caller: PlayerId, query: &str) -> CommandOutcome {
    let players = &registry.host().players;

    let Some(target) = players.resolve(query).await else {
        registry.tell(caller, text::PLAYER_NOT_FOUND).await;
        return CommandOutcome::Rejected(InviteRejection::PlayerNotFound);
    };

    if target == caller {
        registry.tell(caller, text::CANNOT_INVITE_SELF).await;
        return CommandOutcome::Rejected(InviteRejection::SelfInvite);
    }

    if !registry.settings().allow_across_groups {
        let caller_group = players.current_group(caller).await;
        let target_group = players.current_group(target).await;
        if let (Some(mine), Some(theirs)) = (caller_group, target_group) {
            if mine != theirs {
                let name = players
                    .display_name(target)
                    .await
                    .unwrap_or_else(|| target.to_string());
                registry
                    .tell(caller, text::target_in_other_group(&name))
                    .await;
                return CommandOutcome::Rejected(InviteRejection::TargetInOtherGroup);
            }
        }
    }

    CommandOutcome::Invited(registry.add_invite(caller, target).await)
}
