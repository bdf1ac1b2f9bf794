use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Stdio,
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "fabric")]
#[command(about = "Agent-to-agent communication fabric gateway")]
pub struct Cli {
    /// How clients reach the gateway.
    #[arg(long, value_enum, default_value = "http")]
    pub transport: Transport,

    /// Port to bind when `--transport http`.
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to a JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides the configured pre-shared key (also settable via
    /// `FABRIC_PSK`; this flag takes precedence over both).
    #[arg(long)]
    pub psk: Option<String>,
}
