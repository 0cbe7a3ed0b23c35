// CLI module for classify-cache
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// classify-cache - Cached LLM classification service for book queries
#[derive(Parser, Debug)]
#[command(name = "classify-cache", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (defaults to ~/.classify-cache/config.toml)
    #[arg(short, long, env = "CLASSIFY_CACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Development mode: statistics endpoints skip the expiry sweep by default
    #[arg(long)]
    pub debug: bool,

    /// Override the listening port
    #[arg(short, long)]
    pub port: Option<u16>,
}
