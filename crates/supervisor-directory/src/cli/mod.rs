//! Command-line interface for the supervisor directory.
//!
//! This module provides the CLI structure, the text renderers and the
//! interactive session used by the `supdir` binary.

mod commands;
pub mod render;
mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, ExportCommand, ListCommand, OutputFormat, PaletteCommand, SessionCommandArgs,
};
pub use session::{Flow, Session, SessionCommand};

/// supdir - Browse clinical supervisors and hand out badges
///
/// Search the directory, drag badges onto supervisor cards, and save any
/// card as a PNG image.
#[derive(Debug, Parser)]
#[command(name = "supdir")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List supervisors
    List(ListCommand),

    /// Show the badge palette
    Palette(PaletteCommand),

    /// Run an interactive session
    Session(SessionCommandArgs),

    /// Save a supervisor card as PNG
    Export(ExportCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
