use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(name = "nanochat", author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
pub struct Cli {
    /// Show the client version and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Username prefixed to sent messages, instead of the configured one.
    #[arg(short, long)]
    pub username: Option<String>,

    /// Host used by `conn` without arguments, instead of the configured one.
    #[arg(long)]
    pub host: Option<String>,

    /// Port used by `conn` with fewer than two arguments, instead of the configured one.
    #[arg(long)]
    pub port: Option<String>,

    /// Config file to load, created with defaults if missing.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            username: self.username.clone(),
            host: self.host.clone(),
            port: self.port.clone(),
        }
    }
}
