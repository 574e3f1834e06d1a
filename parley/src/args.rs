use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Parley chat gateway
#[derive(Debug, Parser)]
#[command(name = "parley", about = "Chat gateway for OpenAI-compatible and webhook backends")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "parley.toml", env = "PARLEY_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "PARLEY_LISTEN")]
    pub listen: Option<SocketAddr>,
}
