use clap::Parser;
use terramap_runner::{run, Cli};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&cli) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
