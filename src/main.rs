use clap::Parser;
use tracing_subscriber::EnvFilter;

use nmr_match::cli;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    // Initialize logging based on verbosity flag
    let filter = if cli.verbose {
        EnvFilter::new("nmr_match=debug,info")
    } else {
        EnvFilter::new("nmr_match=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        cli::Commands::Ingest(args) => {
            cli::ingest::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Match(args) => {
            cli::query::run(args, cli.format, cli.verbose)?;
        }
        cli::Commands::Catalog(args) => {
            cli::catalog::run(args, cli.format, cli.verbose)?;
        }
    }

    Ok(())
}
