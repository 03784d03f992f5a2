mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use taskloop::error::classify_exit_code;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = cli::Cli::parse();

    if let Err(err) = cli::dispatch(args).await {
        eprintln!("error: {err:#}");
        std::process::exit(classify_exit_code(&err));
    }
}
