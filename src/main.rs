use aws_config::BehaviorVersion;
use lambda_runtime::{service_fn, Error, LambdaEvent};

use layer_publisher::aws::{S3ObjectStore, SsmParameterStore};
use layer_publisher::config::Config;
use layer_publisher::pipeline::RunReport;

/// Lambda entrypoint. The event/context pair is not consulted; all inputs
/// come from the environment.
async fn handle_request(_event: LambdaEvent<serde_json::Value>) -> Result<RunReport, Error> {
    let config = Config::from_env().map_err(|e| Error::from(e.to_string()))?;
    config.trace_loaded();

    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let params = SsmParameterStore::new(&sdk_config);
    let store = S3ObjectStore::new(&sdk_config, config.bucket.clone());

    layer_publisher::run(&config, &store, &params)
        .await
        .map_err(|e| Error::from(e.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt::init();

    lambda_runtime::run(service_fn(handle_request)).await
}
