//! Command-line interface for power6
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command family is implemented in its own submodule.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use crate::clock::SystemClock;
use crate::config::{self, Config};
use crate::day::Planner;
use crate::error::Result;
use crate::events::{Event, EventDestination, EventKind, EventSink};
use crate::output::OutputOptions;
use crate::remote::{HttpRemote, OfflineRemote, RemoteSync};
use crate::storage::FileStore;

mod day;
mod history;
mod init;
mod task;
mod tier;

/// power6 - six tasks a day
///
/// Record up to six prioritized tasks per day, tick them off, and keep a
/// perfect-day streak going.
#[derive(Parser, Debug)]
#[command(name = "power6")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding config.toml and the store
    #[arg(long, global = true, env = config::HOME_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit state-change events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task to today's set
    Add {
        /// Task description
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Priority rank, 1 (highest) to 6
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=6))]
        rank: u8,
    },

    /// Toggle a task between open and completed
    Toggle {
        /// Task id (see `power6 list`)
        id: u64,
    },

    /// Show today's tasks
    List,

    /// Drop today's tasks without archiving them
    Clear,

    /// Archive today, update the streak, and start fresh
    Finalize,

    /// Show the perfect-day streak
    Streak,

    /// Write a default config.toml into the data directory
    Init {
        /// Overwrite an existing config.toml
        #[arg(long)]
        force: bool,
    },

    /// Show archived days (plus tier)
    History {
        /// Show at most this many days
        #[arg(long, conflicts_with = "date")]
        limit: Option<usize>,

        /// Show a single day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show completion analytics (pro tier)
    Stats,

    /// Subscription tier
    #[command(subcommand)]
    Tier(TierCommands),
}

/// Tier subcommands
#[derive(Subcommand, Debug)]
pub enum TierCommands {
    /// Show the current tier
    Show {
        /// Ask the backend before answering
        #[arg(long)]
        refresh: bool,
    },

    /// Switch tier locally (mock upgrade)
    Set {
        /// free, plus, or pro
        tier: String,
    },
}

/// Everything a command needs: the planner, output mode, event sink
pub(crate) struct Session {
    pub planner: Planner,
    pub output: OutputOptions,
    events: Option<EventSink>,
}

impl Session {
    fn open(data_dir: Option<PathBuf>, events: Option<&str>, output: OutputOptions) -> Result<Self> {
        let data_dir = config::resolve_data_dir(data_dir.as_deref());
        let config = Config::load_from_dir(&data_dir);

        let store = Arc::new(
            FileStore::new(config.store_path(&data_dir))
                .with_lock_timeout(config.store.lock_timeout_ms),
        );
        let remote: Arc<dyn RemoteSync> = if config.remote.enabled {
            Arc::new(HttpRemote::from_config(&config.remote)?)
        } else {
            Arc::new(OfflineRemote)
        };

        tracing::debug!(
            data_dir = %data_dir.display(),
            remote = config.remote.enabled,
            "session opened"
        );

        let events = EventDestination::parse(events)
            .map(|destination| destination.open())
            .transpose()?;

        Ok(Self {
            planner: Planner::new(store, remote, Arc::new(SystemClock)),
            output,
            events,
        })
    }

    /// Emit an event if an event sink is configured
    pub fn emit<T: Serialize>(&mut self, kind: EventKind, data: T) -> Result<()> {
        if let Some(sink) = self.events.as_mut() {
            sink.emit(&Event::new(kind).with_data(data)?)?;
        }
        Ok(())
    }
}

impl Cli {
    /// Run the parsed command on a single-threaded runtime
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.execute())
    }

    async fn execute(self) -> Result<()> {
        let events_to_stdout = self
            .events
            .as_deref()
            .map(|value| value.trim() == "-")
            .unwrap_or(false);
        let output = OutputOptions {
            json: self.json && !events_to_stdout,
            quiet: self.quiet,
        };
        if let Commands::Init { force } = self.command {
            return init::run(self.data_dir.as_deref(), force, output);
        }

        let mut session = Session::open(self.data_dir, self.events.as_deref(), output)?;

        match self.command {
            Commands::Add { text, rank } => {
                task::run_add(&mut session, task::AddOptions { text: text.join(" "), rank }).await
            }
            Commands::Toggle { id } => task::run_toggle(&mut session, id).await,
            Commands::List => task::run_list(&mut session).await,
            Commands::Clear => task::run_clear(&mut session).await,
            Commands::Finalize => day::run_finalize(&mut session).await,
            Commands::Streak => day::run_streak(&mut session),
            // Handled before the session is opened.
            Commands::Init { .. } => Ok(()),
            Commands::History { limit, date } => match date {
                Some(date) => history::run_history_day(&mut session, &date).await,
                None => history::run_history(&mut session, limit).await,
            },
            Commands::Stats => history::run_stats(&mut session).await,
            Commands::Tier(cmd) => match cmd {
                TierCommands::Show { refresh } => tier::run_show(&mut session, refresh).await,
                TierCommands::Set { tier } => tier::run_set(&mut session, &tier),
            },
        }
    }
}
