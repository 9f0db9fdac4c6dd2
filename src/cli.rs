//! Command-line interface for houndify
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Query the Houndify API from the command line
#[derive(Parser, Debug)]
#[command(name = "houndify", version, about = "Query the Houndify API from the command line")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output except errors (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug logs, -vv: trace logs)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Client ID (overrides config and HOUNDIFY_CLIENT_ID)
    #[arg(long, global = true, value_name = "ID")]
    pub client_id: Option<String>,

    /// Client key (overrides config and HOUNDIFY_CLIENT_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    pub client_key: Option<String>,

    /// User ID (overrides config and HOUNDIFY_USER_ID)
    #[arg(long, global = true, value_name = "ID")]
    pub user_id: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream a WAV file as a voice query ("-" reads stdin)
    Stream {
        /// WAV file path, or "-" for stdin
        #[arg(value_name = "WAV")]
        input: PathBuf,

        /// Upload sample rate (8000 or 16000)
        #[arg(long, value_name = "HZ")]
        sample_rate: Option<u32>,

        /// Keep uploading after the server reports end of speech
        #[arg(long)]
        no_vad: bool,
    },

    /// Send a text query
    Text {
        /// Query text
        #[arg(value_name = "QUERY", required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}
