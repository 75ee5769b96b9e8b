//! # AutoClaw — autonomous session scheduler demo
//!
//! Runs one session's autonomous loop with an echo executor and prints every
//! progress event as a JSON line.
//!
//! Usage:
//!   autoclaw --goal "Write the weekly report"            # self-prompt from goals
//!   autoclaw -m "Summarize my inbox" --high -n 2         # answer a queued message first
//!   autoclaw --config ./autoclaw.toml -n 0               # run until Ctrl-C

mod demo;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use autoclaw_core::AutoClawConfig;
use autoclaw_core::types::Priority;
use autoclaw_scheduler::{EventKind, SessionRegistry};
use clap::Parser;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use crate::demo::{EchoExecutor, StaticGoals};

#[derive(Parser)]
#[command(
    name = "autoclaw",
    version,
    about = "🤖 AutoClaw — autonomous per-session scheduler"
)]
struct Cli {
    /// Config file (default: ~/.autoclaw/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Session id
    #[arg(short, long, default_value = "demo")]
    session: String,

    /// Message to queue before starting (repeatable)
    #[arg(short, long)]
    message: Vec<String>,

    /// Queue messages with high priority
    #[arg(long)]
    high: bool,

    /// Active goal (repeatable)
    #[arg(short, long)]
    goal: Vec<String>,

    /// Stop after this many completed iterations (0 = until Ctrl-C)
    #[arg(short = 'n', long, default_value = "3")]
    iterations: u64,

    /// Override the tick interval in seconds
    #[arg(long)]
    interval: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "autoclaw=debug,autoclaw_scheduler=debug"
    } else {
        "autoclaw=info,autoclaw_scheduler=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => AutoClawConfig::load_from(Path::new(&expand_path(path)))?,
        None => AutoClawConfig::load()?,
    };
    if let Some(secs) = cli.interval {
        config.autonomous.interval_secs = secs;
    }
    config.validate()?;

    let registry = Arc::new(SessionRegistry::from_config(&config));
    let mut events = registry.subscribe_events(&cli.session).into_stream();

    let priority = if cli.high { Priority::High } else { Priority::Normal };
    for message in &cli.message {
        let entry = registry.enqueue(&cli.session, message.as_str(), priority, None).await;
        tracing::debug!("📥 Queued {} for '{}'", entry.id, cli.session);
    }

    let lp = registry
        .get_or_create(
            &cli.session,
            Some(Arc::new(EchoExecutor)),
            Arc::new(StaticGoals::new(cli.goal.clone())),
        )
        .await?;
    if !lp.start().await {
        anyhow::bail!("autonomous loop for '{}' did not start (disabled in config?)", cli.session);
    }

    let mut completed = 0u64;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received, stopping");
                break;
            }
            event = events.next() => {
                let Some(event) = event else { break };
                println!("{}", serde_json::to_string(&event)?);
                match event.kind {
                    EventKind::IterationComplete => {
                        completed += 1;
                        if cli.iterations > 0 && completed >= cli.iterations {
                            break;
                        }
                    }
                    EventKind::LoopStopped => break,
                    _ => {}
                }
            }
        }
    }

    registry.shutdown().await;
    let status = lp.status().await;
    eprintln!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
