use std::path::PathBuf;

use clap::Parser;

/// Quill document generation gateway
#[derive(Debug, Parser)]
#[command(name = "quill", about = "Metered streaming gateway for LLM document generation")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "quill.toml", env = "QUILL_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "QUILL_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
