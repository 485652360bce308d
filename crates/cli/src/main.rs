//! bmirror - mirror S3 buckets onto the local filesystem
//!
//! Downloads a file, a folder or a whole bucket from AWS S3 or any
//! S3-compatible backend, recreating the key hierarchy locally.

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use bucket_mirror::commands::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG applies unless --debug asks for everything
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = commands::execute(cli).await;

    std::process::exit(exit_code.as_i32());
}
