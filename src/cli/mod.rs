//! Command-line interface for td
//!
//! This module defines the CLI structure using clap derive macros.
//! Task subcommands are implemented in `task`, configuration inspection in
//! `config`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod config;
mod task;

/// td - a local task manager
///
/// Tasks are grouped by status (In Progress, Pending, Completed) and stored
/// as JSON in a local data directory.
#[derive(Parser, Debug)]
#[command(name = "td")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding task data (defaults to the platform data directory)
    #[arg(long, global = true, env = "TASKDECK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to config.toml
    #[arg(long, global = true, env = "TASKDECK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging for taskdeck (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Initial status: pending, in_progress, completed
        #[arg(short, long)]
        status: Option<String>,
    },

    /// List tasks grouped by status
    #[command(visible_alias = "ls")]
    List {
        /// Case-insensitive text matched against title and description
        #[arg(short, long)]
        search: Option<String>,

        /// Status filter: all, completed, incomplete, in_progress, pending
        #[arg(short, long, default_value = "all")]
        filter: String,
    },

    /// Show one task
    Show {
        /// Task id or unique id prefix
        id: String,
    },

    /// Edit a task's title, description or status
    Edit {
        /// Task id or unique id prefix
        id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New description (an empty string clears it)
        #[arg(short, long)]
        description: Option<String>,

        /// New status
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Toggle a task between completed and pending
    Toggle {
        /// Task id or unique id prefix
        id: String,
    },

    /// Set a task's status
    Status {
        /// Task id or unique id prefix
        id: String,

        /// pending, in_progress or completed
        status: String,
    },

    /// Delete a task
    #[command(visible_alias = "rm")]
    Delete {
        /// Task id or unique id prefix
        id: String,
    },

    /// Show task counts
    Stats,

    /// Interactive terminal board
    Board {
        /// Initial search text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Print the effective configuration as TOML, ready to save as config.toml
        #[arg(long)]
        toml: bool,
    },
}

/// Where the store lives: explicit data dir and config file overrides
#[derive(Debug, Clone, Default)]
pub struct StoreLocation {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let location = StoreLocation {
            data_dir: self.data_dir,
            config: self.config,
        };
        match self.command {
            Commands::Add {
                title,
                description,
                status,
            } => task::run_add(task::AddOptions {
                title,
                description,
                status,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::List { search, filter } => task::run_list(task::ListOptions {
                search,
                filter,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Show { id } => task::run_show(task::ShowOptions {
                id,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Edit {
                id,
                title,
                description,
                status,
            } => task::run_edit(task::EditOptions {
                id,
                title,
                description,
                status,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Toggle { id } => task::run_toggle(task::ToggleOptions {
                id,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Status { id, status } => task::run_status(task::StatusOptions {
                id,
                status,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Delete { id } => task::run_delete(task::DeleteOptions {
                id,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Stats => task::run_stats(task::StatsOptions {
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Board { search } => task::run_board(task::BoardOptions {
                search,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Config { toml } => config::run(config::ConfigOptions {
                toml,
                location,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
