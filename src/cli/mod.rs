//! CLI command definitions for primepass-settings
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod diff;

use crate::format::OutputFormat;
use crate::logging::LogTarget;
use clap::{Args, Parser, Subcommand};
use diff::DiffArgs;
use std::path::PathBuf;

/// Resolve, validate and inspect PrimePass backend settings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings profile: development or production (overrides PRIMEPASS_SETTINGS)
    #[arg(short, long, global = true)]
    pub settings: Option<String>,

    /// Path to the .env file layered under the process environment
    #[arg(long, default_value = ".env", global = true)]
    pub env_file: PathBuf,

    /// Project root for template, static and media directories
    #[arg(long, default_value = ".", global = true)]
    pub base_dir: PathBuf,

    /// Resolve for a test run (development only)
    #[arg(long, global = true)]
    pub testing: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: LogTarget,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve and validate settings (default if no subcommand given)
    Check(CheckArgs),

    /// Print the resolved settings
    Show(ShowArgs),

    /// Print the route table, or resolve one path against it
    Routes(RoutesArgs),

    /// Print the periodic job table
    Schedule(ScheduleArgs),

    /// Compare the resolved settings of both profiles
    Diff(DiffArgs),
}

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Print failures as a JSON diagnostic instead of plain text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output format: yaml (default) or json
    #[arg(short, long, default_value = "yaml", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Print secrets instead of masking them
    #[arg(long)]
    pub reveal: bool,

    /// Only print these top-level sections (comma-separated)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub sections: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct RoutesArgs {
    /// Print only the entry that serves PATH
    #[arg(long, value_name = "PATH")]
    pub resolve: Option<String>,

    /// Print the table as json instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Print the table as json instead of text
    #[arg(long)]
    pub json: bool,

    /// Registered task names; jobs whose task is missing are reported as skipped
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub registered: Option<Vec<String>>,
}
