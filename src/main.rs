use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod models;
mod services;
mod utils;

use api::alphavantage::AlphaVantageClient;
use api::s3::S3BlobStore;
use config::{Config, SYMBOLS};
use services::pipeline_service::{self, RunOutcome};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stockchart=info,aws_config=warn")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting stock chart run");

    let today = chrono::Local::now().date_naive();

    let outcome = pipeline_service::run_with(
        Config::from_env,
        |config| {
            (
                AlphaVantageClient::with_base_url(config.api_key.clone(), config.provider_url.clone()),
                S3BlobStore::new(config),
            )
        },
        &SYMBOLS,
        today,
    )
    .await;

    match &outcome {
        RunOutcome::Published { artifact, stats } => {
            info!(name = %artifact.name, symbols = stats.success, "Run finished")
        }
        RunOutcome::NoData { .. } => info!("Run finished without a chart"),
        _ => info!("Run finished with errors"),
    }

    std::process::exit(outcome.exit_code());
}
