use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use babylon::{Args, Config, RunFacade};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::resolve(&args)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if config.verbose { "debug" } else { "info" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let facade = RunFacade::new(config).await?;
    let result = facade.run(&args.description).await?;

    let secs = result.duration.as_secs_f64();
    println!(
        "\nstatus: {} ({:.1}s, ${:.4})",
        result.status, secs, result.cost.total_usd
    );
    if let Some(reason) = result.failure_reason() {
        println!("reason: {reason}");
    }

    std::process::exit(if result.status == coordination::task::TaskStatus::Completed {
        0
    } else {
        1
    });
}
