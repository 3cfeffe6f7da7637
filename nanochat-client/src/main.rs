use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing::info;

use nanochat_client::{
    cli::Cli,
    config,
    repl::{Console, Repl},
    session::Session,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_path()?,
    };
    let config = config::load_or_create(&path)?.apply(cli.overrides());
    info!(path = %path.display(), "loaded config");

    let console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let mut repl = Repl::new(Session::new(config, path), console);
    repl.run().await
}
