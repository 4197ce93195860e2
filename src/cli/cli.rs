use clap::{Parser, ValueEnum};

use crate::services::exporter::DEFAULT_QUEUE_CAPACITY;
use crate::services::host_identity::DEFAULT_INTERFACE;

/// Where exported snapshots go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// Log each envelope at info level
    Log,
    /// Print each envelope as one JSON line
    Stdout,
}

/// Process Agent - periodic process table snapshots with host identity
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Control API port
    #[arg(short, long, env = "PORT", default_value_t = 9999)]
    pub port: u16,

    /// Control API address
    #[arg(short = 'a', long, env = "ADDRESS", default_value = "127.0.0.1")]
    pub address: String,

    /// Seconds between snapshots
    #[arg(short = 'i', long, env = "REFRESH_INTERVAL", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_interval: u64,

    /// Take snapshots automatically
    #[arg(long, env = "AUTO_REFRESH", default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_refresh: bool,

    /// Leave out processes without a known creation time
    #[arg(long, env = "HIDE_DEFAULT_PROCESSES", default_value_t = true, action = clap::ArgAction::Set)]
    pub hide_default_processes: bool,

    /// Only export processes with exactly this name
    #[arg(short, long, env = "SEARCH", default_value = "")]
    pub search: String,

    /// Interface whose MAC address identifies the host (case-insensitive)
    #[arg(long, env = "MAC_INTERFACE", default_value = DEFAULT_INTERFACE)]
    pub interface: String,

    /// Snapshot destination
    #[arg(long, env = "SINK", value_enum, default_value_t = SinkKind::Log)]
    pub sink: SinkKind,

    /// Snapshots waiting for the sink before new ones are dropped
    #[arg(long, env = "QUEUE_CAPACITY", default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Print a single snapshot to stdout and exit
    #[arg(long)]
    pub once: bool,
}
