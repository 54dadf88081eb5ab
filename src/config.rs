use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::ui::feed::FilterState;

pub const DEFAULT_LOG_FILE: &str = "game.log";

const MIN_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "killfeed",
    version,
    about = "Live kill feed for a game telemetry log"
)]
pub struct Config {
    /// Game log to follow.
    #[arg(
        value_name = "FILE",
        env = "KILLFEED_LOG",
        default_value = DEFAULT_LOG_FILE,
        help = "Telemetry log to follow"
    )]
    pub log_file: PathBuf,

    /// How often the log's modification time is checked.
    #[arg(
        long = "interval",
        env = "KILLFEED_INTERVAL_MS",
        value_name = "MS",
        default_value_t = 1_000,
        help = "Polling interval in milliseconds"
    )]
    pub interval_ms: u64,

    #[arg(long, help = "Start with player kills hidden")]
    pub hide_player_kills: bool,

    #[arg(long, help = "Start with player deaths hidden")]
    pub hide_player_deaths: bool,

    #[arg(long, help = "Start with other kills hidden")]
    pub hide_other_kills: bool,

    #[arg(
        long,
        env = "KILLFEED_LIGHT",
        help = "Start with the light colour theme"
    )]
    pub light: bool,

    #[arg(long, help = "Print the filtered feed once and exit")]
    pub once: bool,

    /// Diagnostics destination; the TUI owns the terminal otherwise.
    #[arg(
        long = "trace-file",
        env = "KILLFEED_TRACE_FILE",
        value_name = "FILE",
        help = "Append diagnostic logs to FILE"
    )]
    pub trace_file: Option<PathBuf>,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }

    pub fn initial_filters(&self) -> FilterState {
        FilterState {
            show_player_kills: !self.hide_player_kills,
            show_player_deaths: !self.hide_player_deaths,
            show_other_kills: !self.hide_other_kills,
        }
    }
}
