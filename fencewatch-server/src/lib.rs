//! Fencewatch Server
//!
//! Polls a device position feed on a fixed interval, runs geofence transition
//! detection from `fencewatch-core` and dispatches notifications for every
//! entry/exit event.

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::path::PathBuf;
use std::time::Duration;

use fencewatch_core::DEFAULT_EVENT_CAPACITY;

pub mod error;
pub mod feed;
pub mod notifier;
pub mod poller;
pub mod storage;

pub use error::ServerError;

/// Default time between two position polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// JSON file with the latest device positions, re-read on every poll
    #[arg(short, long)]
    pub feed: PathBuf,

    /// JSON file with the geofence list [default: <data-dir>/geofences.json]
    #[arg(short, long)]
    pub geofences: Option<PathBuf>,

    /// Seconds between two polls
    #[arg(short, long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub interval: u64,

    /// Number of events kept in the event log
    #[arg(long, default_value_t = DEFAULT_EVENT_CAPACITY)]
    pub event_capacity: usize,

    /// Directory for the event log and the default geofence file
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Program run as `<command> <title> <body>` for every notification
    #[arg(long)]
    pub notify_command: Option<String>,

    /// Run a single poll and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,
}

impl Cli {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval.max(1))
    }
}
