use anyhow::Context;
use clap::Parser;
use evo::domain::config::EngineConfig;
use evo::kernel::config::load_config;
use evo_daemon::{Daemon, init_logger};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "evod")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Runs the progression engine until told to stop")]
struct Args {
    /// TOML configuration file; `EVO__*` environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let cfg: EngineConfig =
        load_config(args.config.as_ref()).context("Critical: Configuration is malformed")?;
    let _log = init_logger(&cfg.logging)?;

    Daemon::builder().config(cfg).build().await?.run().await?;
    Ok(())
}
