use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

/// Prism image generation façade
#[derive(Debug, Parser)]
#[command(name = "prism", about = "HTTP façade over a hosted image generation API")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "prism.toml", env = "PRISM_CONFIG")]
    pub config: PathBuf,

    /// Override the listen address
    #[arg(long, env = "PRISM_LISTEN")]
    pub listen: Option<SocketAddr>,

    /// Log filter, e.g. `debug` or `info,prism_imagegen=trace`
    #[arg(long, env = "PRISM_LOG")]
    pub log_level: Option<String>,
}
