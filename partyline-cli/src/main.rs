mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use partyline_core::config::Config;
use partyline_core::logging::{init_logging_with_config, LogConfig};
use session::{Session, Step};
use std::env;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "partyline")]
#[command(author, version, about = "Party invites for game servers", long_about = None)]
struct Args {
    /// Configuration file (TOML); environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a session script
    Run {
        /// Script file, one step per line
        script: PathBuf,
    },
    /// Read script lines from stdin
    Repl,
    /// Write the default configuration to a file
    InitConfig {
        path: PathBuf,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_overrides(|key| env::var(key).ok())?;

    if let Some(level) = &args.log_level {
        config.logging.level = level.to_lowercase();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::InitConfig { path } = &args.command {
        Config::default().save_to_file(path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    let config = load_config(&args)?;
    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;
    info!("partyline started");

    let mut session = Session::new(config)?;

    match args.command {
        Command::Run { script } => {
            let text = tokio::fs::read_to_string(&script)
                .await
                .with_context(|| format!("reading script {}", script.display()))?;
            for line in session.run_script(&text).await? {
                println!("{}", line);
            }
        }
        Command::Repl => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let step = match Step::parse(&line) {
                    Ok(Some(step)) => step,
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("error: {:#}", e);
                        continue;
                    }
                };
                match session.run_step(step).await {
                    Ok(out) => out.iter().for_each(|l| println!("{}", l)),
                    Err(e) => {
                        warn!(error = %e, "Step failed");
                        eprintln!("error: {:#}", e);
                    }
                }
            }
        }
        Command::InitConfig { .. } => {}
    }

    session.finish();
    info!("partyline finished");

    Ok(())
}
