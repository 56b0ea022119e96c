//! Plugin lifecycle: load, handle commands, unload

use super::chat::PARTY_SYNTAX;
use super::clock::Clock;
use super::command::{self, CommandOutcome, PartyCommand};
use super::host::Collaborators;
use super::registry::InviteRegistry;
use super::types::PlayerId;
use crate::config::{Config, ConfigError};
use crate::metrics::init_metrics;
use std::sync::Arc;
use tracing::{info, instrument};

/// The party system as the host sees it
///
/// Built once at load time and handed to whatever dispatches chat commands.
pub struct PartyPlugin {
    config: Config,
    registry: InviteRegistry,
}

impl PartyPlugin {
    /// Validate `config` and start with an empty registry
    pub fn load(config: Config, host: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        init_metrics();

        let registry = InviteRegistry::new(config.invites.clone(), config.chat.color(), host);
        info!("[PartyPlugin] Loaded. Commands: {}", PARTY_SYNTAX);

        Ok(Self { config, registry })
    }

    /// Same as [`PartyPlugin::load`] with a custom time source
    pub fn load_with_clock(
        config: Config,
        host: Collaborators,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let plugin = Self::load(config, host)?;
        Ok(Self {
            registry: plugin.registry.with_clock(clock),
            config: plugin.config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &InviteRegistry {
        &self.registry
    }

    /// Handle `/party` with the given arguments from `caller`
    #[instrument(skip_all, fields(caller = %caller))]
    pub async fn execute<S: AsRef<str>>(&self, caller: PlayerId, args: &[S]) -> CommandOutcome {
        command::execute(&self.registry, caller, PartyCommand::parse(args)).await
    }

    /// Drop all pending invites
    pub fn unload(self) {
        self.registry.clear();
        info!("[PartyPlugin] Unloaded.");
    }
}
