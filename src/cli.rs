use clap::Parser;

/// A command line tool that frees disk space by sweeping a configured
/// catalog of temporary and cache folders and reporting how many bytes were
/// reclaimed. The catalog lives in `~/.reclaim/config.toml` and is created
/// with defaults on first run.
#[derive(Parser)]
#[clap(name = "reclaim")]
#[clap(version = "v0.1.0")]
pub struct Cli {
    /// Increase the logging of detailed information as `reclaim` progresses
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Reduce the logging of detailed information as `reclaim` progresses
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Only measure how much space the configured folders currently occupy,
    /// without deleting anything
    #[arg(short, long, default_value_t = false)]
    pub measure: bool,

    /// Sweep a single catalog group instead of every group
    #[arg(short, long)]
    pub group: Option<String>,

    /// List the catalog groups and their target paths, then exit
    #[arg(short, long, default_value_t = false)]
    pub list: bool,

    /// Skip the confirmation prompt before a full sweep
    #[arg(short, long, default_value_t = false)]
    pub yes: bool,
}
