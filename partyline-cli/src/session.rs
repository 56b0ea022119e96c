//! Scripted party sessions against the in-memory host
//!
//! A script is one step per line:
//!
//! ```text
//! join alice            # connect a player, id assigned automatically
//! join bob 42           # connect with an explicit id
//! alice: /party bob     # run a command as a player
//! wait 30s              # move the clock forward
//! pending bob           # print bob's pending invites as JSON
//! groups                # print the group table
//! quit alice            # disconnect
//! ```

use anyhow::{anyhow, bail, Context, Result};
use partyline_core::adapters::InMemoryHost;
use partyline_core::config::Config;
use partyline_core::core_party::{
    Clock, Collaborators, CommandOutcome, ManualClock, PartyPlugin, PlayerId, SystemClock,
    Timestamp,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const FIRST_PLAYER_ID: u64 = 76561198000000001;

/// One parsed script line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Join { name: String, id: Option<u64> },
    Quit { name: String },
    Wait(Duration),
    Groups,
    Pending { name: String },
    Party { name: String, args: Vec<String> },
}

impl Step {
    /// Parse a script line; blank lines and comments yield `None`
    pub fn parse(line: &str) -> Result<Option<Step>> {
        let line = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if let Some((name, command)) = line.split_once(':') {
            let name = name.trim();
            let command = command.trim();
            let rest = command
                .strip_prefix("/party")
                .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
                .ok_or_else(|| anyhow!("expected '/party ...' after '{}:'", name))?;
            if name.is_empty() {
                bail!("missing player name before ':'");
            }
            return Ok(Some(Step::Party {
                name: name.to_string(),
                args: rest.split_whitespace().map(str::to_string).collect(),
            }));
        }

        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_lowercase();
        let rest: Vec<&str> = words.collect();

        let step = match (keyword.as_str(), rest.as_slice()) {
            ("join", [name]) => Step::Join {
                name: name.to_string(),
                id: None,
            },
            ("join", [name, id]) => Step::Join {
                name: name.to_string(),
                id: Some(id.parse().with_context(|| format!("invalid player id '{}'", id))?),
            },
            ("quit", [name]) => Step::Quit {
                name: name.to_string(),
            },
            ("wait", [..]) if !rest.is_empty() => {
                let spec = rest.join(" ");
                Step::Wait(
                    humantime::parse_duration(&spec)
                        .with_context(|| format!("invalid duration '{}'", spec))?,
                )
            }
            ("groups", []) => Step::Groups,
            ("pending", [name]) => Step::Pending {
                name: name.to_string(),
            },
            _ => bail!("unrecognised line: {}", line),
        };
        Ok(Some(step))
    }
}

/// A running simulation
pub struct Session {
    host: Arc<InMemoryHost>,
    clock: ManualClock,
    plugin: PartyPlugin,
    next_id: u64,
}

impl Session {
    /// Load the plugin with `config` on a clock starting at the current time
    pub fn new(config: Config) -> Result<Self> {
        Self::with_start(config, SystemClock.now())
    }

    pub fn with_start(config: Config, start: Timestamp) -> Result<Self> {
        let host = Arc::new(InMemoryHost::new());
        let clock = ManualClock::new(start);
        let plugin = PartyPlugin::load_with_clock(
            config,
            Collaborators::from_host(host.clone()),
            Arc::new(clock.clone()),
        )?;

        Ok(Self {
            host,
            clock,
            plugin,
            next_id: FIRST_PLAYER_ID,
        })
    }

    fn player(&self, name: &str) -> Result<PlayerId> {
        self.host
            .player_named(name)
            .ok_or_else(|| anyhow!("unknown player '{}' (use 'join {}' first)", name, name))
    }

    /// Run one step, returning the lines to print
    pub async fn run_step(&mut self, step: Step) -> Result<Vec<String>> {
        let mut out = Vec::new();

        match step {
            Step::Join { name, id } => {
                let id = match id {
                    Some(id) => id,
                    None if self.next_id == u64::MAX => bail!("no player ids left for '{}'", name),
                    None => self.next_id,
                };
                self.next_id = self.next_id.max(id).saturating_add(1);
                let id = PlayerId::new(id);
                self.host.connect(id, name.clone());
                out.push(format!("* {} connected ({})", name, id));
            }
            Step::Quit { name } => {
                let id = self.player(&name)?;
                self.host.disconnect(id);
                out.push(format!("* {} disconnected", name));
            }
            Step::Wait(by) => {
                self.clock.advance(by);
                out.push(format!("* {} passes", humantime::format_duration(by)));
            }
            Step::Groups => {
                let groups = self.host.groups();
                if groups.is_empty() {
                    out.push("* no groups".to_string());
                }
                for group in groups {
                    let members: Vec<String> = group
                        .members
                        .iter()
                        .map(|(id, rank)| {
                            let name = self.host.name_of(*id).unwrap_or_else(|| id.to_string());
                            format!("{} ({})", name, rank)
                        })
                        .collect();
                    out.push(format!("* group {}: {}", group.id, members.join(", ")));
                }
            }
            Step::Pending { name } => {
                let id = self.player(&name)?;
                let pending = self.plugin.registry().pending_invites(id).await;
                out.push(serde_json::to_string(&pending)?);
            }
            Step::Party { name, args } => {
                let id = self.player(&name)?;
                match self.plugin.execute(id, &args).await {
                    CommandOutcome::Failed(err) => debug!(player = %name, error = %err, "Command failed"),
                    outcome => debug!(player = %name, ?outcome, "Command finished"),
                }
            }
        }

        for delivery in self.host.take_outbox() {
            let to = self
                .host
                .name_of(delivery.to)
                .unwrap_or_else(|| delivery.to.to_string());
            out.push(format!("[to {}] {}", to, delivery.message));
        }

        Ok(out)
    }

    /// Run a whole script, stopping at the first bad line
    pub async fn run_script(&mut self, script: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for (lineno, line) in script.lines().enumerate() {
            let step = Step::parse(line).with_context(|| format!("line {}", lineno + 1))?;
            if let Some(step) = step {
                out.extend(self.run_step(step).await?);
            }
        }
        Ok(out)
    }

    /// Tear the plugin down
    pub fn finish(self) {
        self.plugin.unload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::with_start(Config::default(), Timestamp::from_millis(0)).unwrap()
    }

    #[test]
    fn test_parse_steps() {
        assert_eq!(Step::parse("  # just a comment").unwrap(), None);
        assert_eq!(
            Step::parse("join alice").unwrap(),
            Some(Step::Join {
                name: "alice".to_string(),
                id: None
            })
        );
        assert_eq!(
            Step::parse("join bob 42").unwrap(),
            Some(Step::Join {
                name: "bob".to_string(),
                id: Some(42)
            })
        );
        assert_eq!(
            Step::parse("wait 1m 5s").unwrap(),
            Some(Step::Wait(Duration::from_secs(65)))
        );
        assert_eq!(
            Step::parse("bob: /party accept alice # yes").unwrap(),
            Some(Step::Party {
                name: "bob".to_string(),
                args: vec!["accept".to_string(), "alice".to_string()]
            })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(Step::parse("dance").is_err());
        assert!(Step::parse("join bob notanumber").is_err());
        assert!(Step::parse("wait forever").is_err());
        assert!(Step::parse("bob: hello").is_err());
        assert!(Step::parse("bob: /partyleave").is_err());
        assert_eq!(
            Step::parse("bob: /party").unwrap(),
            Some(Step::Party {
                name: "bob".to_string(),
                args: vec![]
            })
        );
    }

    #[tokio::test]
    async fn test_join_with_largest_id() {
        let mut session = session();
        let out = session
            .run_script("join bob 18446744073709551615\njoin alice 7\n")
            .await
            .unwrap();
        assert_eq!(out[0], "* bob connected (18446744073709551615)");
        assert_eq!(out[1], "* alice connected (7)");

        // Automatic ids are exhausted, so a plain join is refused
        let err = session.run_script("join carol\n").await.unwrap_err();
        assert!(format!("{:#}", err).contains("no player ids left"));
    }

    #[tokio::test]
    async fn test_script_invite_and_accept() {
        let mut session = session();
        let out = session
            .run_script(
                "join alice\n\
                 join bob\n\
                 alice: /party bob\n\
                 bob: /party accept\n\
                 groups\n",
            )
            .await
            .unwrap();

        assert!(out.contains(&"[to bob] You joined alice's party.".to_string()));
        assert!(out.contains(&"[to alice] bob joined your party.".to_string()));
        assert!(out
            .iter()
            .any(|l| l.starts_with("* group 1:") && l.contains("alice (owner)") && l.contains("bob (member)")));
    }

    #[tokio::test]
    async fn test_script_expiry() {
        let mut session = session();
        let out = session
            .run_script(
                "join alice\n\
                 join bob\n\
                 alice: /party bob\n\
                 wait 61s\n\
                 pending bob\n\
                 bob: /party accept\n",
            )
            .await
            .unwrap();

        assert!(out.contains(&"[]".to_string()));
        assert_eq!(
            out.last().map(String::as_str),
            Some("[to bob] You have no pending party invites.")
        );
    }

    #[tokio::test]
    async fn test_unknown_player_is_an_error() {
        let mut session = session();
        let err = session.run_script("ghost: /party leave\n").await.unwrap_err();
        assert!(format!("{:#}", err).contains("unknown player 'ghost'"));
    }
}
