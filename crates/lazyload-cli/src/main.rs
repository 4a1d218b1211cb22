use clap::Parser;
use lazyload_cli::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let level = if verbose { "lazyload=debug" } else { "lazyload=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Output helpers read these; set them before any worker thread exists.
    if cli.json {
        std::env::set_var("LAZYLOAD_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("LAZYLOAD_QUIET", "1");
    }
    init_tracing(cli.verbose);

    let runtime = tokio::runtime::Runtime::new()?;
    let satisfied = runtime.block_on(cli::run(cli))?;
    if !satisfied {
        std::process::exit(2);
    }
    Ok(())
}
