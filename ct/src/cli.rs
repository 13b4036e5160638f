//! CLI argument parsing for covtrack

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ct")]
#[command(author, version, about = "Track coverage progression against the best-ever run", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Directory the results layout is resolved against (default: current directory)
    #[arg(short = 'C', long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate this run's summary and record it if it is the new best
    Check {
        /// Summary file to read, or `-` for stdin
        #[arg(short, long, conflicts_with = "command")]
        summary: Option<PathBuf>,

        /// Command that prints the summary (overrides `summary_command` in config)
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        command: Option<Vec<String>>,

        /// Version stamp to record alongside this run
        #[arg(long)]
        version_stamp: Option<String>,

        /// Exit successfully even when coverage regressed
        #[arg(long)]
        no_fail: bool,
    },

    /// Evaluate a summary against the best record without recording anything
    Compare {
        /// Summary file to read, or `-` for stdin
        #[arg(short, long, required = true)]
        summary: PathBuf,
    },

    /// Show the best-ever record
    Show,

    /// Forget the best-ever record
    Reset,

    /// List the modules the preload pass would load
    Modules {
        /// Dotted package names (default: `packages` from config)
        packages: Vec<String>,
    },

    /// Write a default covtrack.yml into the root directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
