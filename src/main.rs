//! # Post-quantum Relay
//!
//! A relay that wraps signed transactions into relay hub calls carrying a post-quantum signature.
use clap::Parser;
use pq_relay::cli::Args;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() {
    // Enable backtraces unless a RUST_BACKTRACE value has already been explicitly provided.
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        // SAFETY: the runtime is not built yet, so this is the only thread.
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: failed to build runtime: {err}");
            std::process::exit(1);
        }
    };
    runtime.block_on(run());
}

async fn run() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy())
        .init();

    let args = Args::parse();
    if let Err(err) = args.run().await {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
