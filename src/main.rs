use telemetry_refiner::engine::core::reduce::ReductionEngine;
use telemetry_refiner::logging;
use telemetry_refiner::pipeline::{HttpClient, MachineDataHandler, Pipeline, SchemaValidator};
use telemetry_refiner::shared::config::CONFIG;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _log_guard = logging::init()?;
    info!("Telemetry refiner is starting...");

    let Some(job) = CONFIG.pipeline.clone() else {
        anyhow::bail!("No [pipeline] job configured; set REFINER_CONFIG to a config file");
    };

    let pipeline = Pipeline::new(
        HttpClient::new(&CONFIG.fetch),
        SchemaValidator,
        ReductionEngine::new(CONFIG.engine.clone()),
    );
    let handler = MachineDataHandler::new(job.machine_id.clone(), pipeline);

    let output = handler.run_job(&job.job).await.inspect_err(|e| e.log_error())?;
    println!("{}", serde_json::to_string_pretty(&output.to_json())?);

    Ok(())
}
