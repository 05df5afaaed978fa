use clap::Parser;
use clientkit_replay::Cli;
use clientkit_replay::run_main;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_main(Cli::parse()).await
}
