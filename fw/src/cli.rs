//! CLI argument parsing for feedwatch

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fw")]
#[command(author, version, about = "Fanout feed subscriber with an interactive last-item console", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Subcommand to execute (default: watch)
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Subscribe to the broker's fanout exchange and open the console
    Watch {
        /// Broker URL (overrides config)
        #[arg(short, long)]
        url: Option<String>,

        /// Exchange name (overrides config)
        #[arg(short, long)]
        exchange: Option<String>,
    },

    /// Replay newline-delimited payloads from a file and open the console
    Replay {
        /// File with one payload per line
        #[arg(required = true)]
        file: PathBuf,

        /// Delay between payloads in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Fetch the last item from the remote endpoint and print it
    Fetch,
}
