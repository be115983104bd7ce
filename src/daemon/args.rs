use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

use super::processing::sanitize::PresenceTable;

#[derive(Parser)]
pub struct DaemonArgs {
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Storage backend for finalized records.
    #[arg(long, value_enum, default_value_t = SinkKind::Sqlite)]
    pub sink: SinkKind,
    /// Transitions faster than this many milliseconds are treated as flicker.
    #[arg(long = "threshold-ms", default_value_t = super::processing::recorder::DEFAULT_DEBOUNCE_MS)]
    pub threshold_ms: i64,
    /// How the host session manager orders its presence status codes. The
    /// two known sources disagree, so this must be verified against the live
    /// host.
    #[arg(long = "presence-order", value_enum, default_value_t = PresenceOrder::AvailableFirst)]
    pub presence_order: PresenceOrder,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    Sqlite,
    Ndjson,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PresenceOrder {
    /// `[available, invisible, busy, idle]`
    AvailableFirst,
    /// `[idle, invisible, busy, available]`
    IdleFirst,
}

impl PresenceOrder {
    pub fn table(&self) -> PresenceTable {
        match self {
            PresenceOrder::AvailableFirst => PresenceTable::available_first(),
            PresenceOrder::IdleFirst => PresenceTable::idle_first(),
        }
    }
}
