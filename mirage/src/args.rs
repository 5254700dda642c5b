use std::path::PathBuf;

use clap::Parser;

/// Mirage image proxy
#[derive(Debug, Parser)]
#[command(name = "mirage", about = "Image generation proxy for Gemini and OpenAI")]
pub struct Args {
    /// Path to configuration file; the environment alone is used when omitted
    #[arg(short, long, env = "MIRAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the listen address
    #[arg(long, env = "MIRAGE_LISTEN")]
    pub listen: Option<std::net::SocketAddr>,
}
