//! dnsweep binary entry point.

use clap::Parser;
use dnsweep::cli::{Cli, Commands};
use dnsweep::output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Scan(cmd) => cmd.execute(cli.verbose, cli.quiet).await,
        Commands::Export(cmd) => cmd.execute(cli.quiet),
        Commands::History(cmd) => cmd.execute(cli.quiet),
    };

    if let Err(err) = result {
        output::print_error(&err.to_string());
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays parseable (json/csv/txt output).
/// `RUST_LOG` overrides; `--verbose` raises the default to debug.
fn init_tracing(verbose: bool) {
    let default = if verbose { "dnsweep=debug" } else { "dnsweep=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
