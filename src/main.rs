use anyhow::Result;
use clap::Parser;
use invoicehub::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,invoicehub=debug,sqlx=warn"
    } else {
        "info,invoicehub=info,sqlx=warn"
    }
}

/// Log filter comes from `RUST_LOG`; `--verbose` turns on debug output for this crate.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    cli.run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "info,invoicehub=info,sqlx=warn");
        assert_eq!(default_filter(true), "info,invoicehub=debug,sqlx=warn");
        assert!(EnvFilter::try_new(default_filter(false)).is_ok());
    }
}
