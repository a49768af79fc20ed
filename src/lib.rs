//! power6 - six tasks a day
//!
//! This library provides the core of the power6 planner: a working set of at
//! most six prioritized tasks per day, a perfect-day streak, a dated history
//! archive, and tier-gated history and analytics views. Everything is kept in
//! a local key-value store first; a remote backend is consulted when
//! configured.
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `clock`: Injectable clock and `YYYY-MM-DD` date keys
//! - `config`: Configuration loading from `config.toml`
//! - `day`: The planner and the finalize protocol
//! - `error`: Error types and result aliases
//! - `events`: JSONL state-change events
//! - `history`: Per-day archive
//! - `lock`: File locking and atomic writes
//! - `output`: Human and JSON command output
//! - `remote`: Backend sync over HTTP
//! - `stats`: Analytics over the archive
//! - `storage`: Key-value stores (file-backed and in-memory)
//! - `streak`: Perfect-day streak engine
//! - `task`: Task model and working-set manager
//! - `tier`: Subscription tiers and feature gating

pub mod cli;
pub mod clock;
pub mod config;
pub mod day;
pub mod error;
pub mod events;
pub mod history;
pub mod lock;
pub mod output;
pub mod remote;
pub mod stats;
pub mod storage;
pub mod streak;
pub mod task;
pub mod tier;

pub use error::{Error, Result};
