mod address;
mod args;
mod common;
mod constants;
mod export;
mod jurisdiction;
mod normalize;
mod pipeline;
mod record;
mod registry;
mod specialty;

use anyhow::Context;
use clap::Parser;

use args::Args;

fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let summary = pipeline::run(&args).context("provider registry load failed")?;
    summary.print(&args.db_path);
    Ok(())
}
