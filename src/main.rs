//! docweave CLI — execute fenced script fragments and weave their output in place.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "docweave",
    version,
    about = "Execute fenced script fragments in markup documents and weave their output in place"
)]
struct Cli {
    #[command(flatten)]
    args: docweave::cli::RunArgs,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(e) = docweave::cli::dispatch(cli.args) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
