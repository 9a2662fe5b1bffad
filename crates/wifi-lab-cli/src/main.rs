use clap::Parser;
use tracing::info;
use wifi_lab_cli::{Args, init_logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    info!("wifi-lab starting…");
    run(args).await
}
