use clap::Parser;
use std::path::PathBuf;

/// Replays a JSON file of grid rows against a submission endpoint.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Path to the TOML configuration.
    #[arg(long = "config", short = 'c', value_name = "FILE", default_value = "clientkit.toml")]
    pub config: PathBuf,

    /// JSON file holding an array of rows.
    #[arg(value_name = "ROWS")]
    pub rows: PathBuf,

    /// Overrides the configured submission url.
    #[arg(long = "url")]
    pub url: Option<String>,

    /// Send all rows as one request instead of row by row.
    #[arg(long = "whole", default_value_t = false)]
    pub whole: bool,
}
