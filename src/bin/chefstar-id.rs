use anyhow::Result;
use chefstar_id::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    // Flush any buffered spans before exiting.
    cli::telemetry::shutdown_tracer();

    result
}
