#![doc = "layer-publisher: mirrors Bitbucket package folders and publishes them as zipped layer archives."]

//! The pipeline runs inside one Lambda invocation: fetch the Bitbucket token
//! from the parameter store, mirror each configured root folder into the
//! scratch directory, resolve the package directory, zip it, upload the
//! archive to S3 and record its name back in the parameter store.
//!
//! External collaborators sit behind the traits in [`contract`]; the binary
//! wires in the real Bitbucket and AWS clients, tests wire in mocks.

pub mod archive;
pub mod aws;
pub mod bitbucket;
pub mod config;
pub mod contract;
pub mod materialise;
pub mod pipeline;
pub mod publish;
pub mod resolve;

use anyhow::{anyhow, Result};
use tracing::info;

use bitbucket::BitbucketClient;
use config::Config;
use contract::{ObjectStore, ParameterStore};
use pipeline::RunReport;

/// Full pipeline entrypoint for one invocation: fetch the bearer token once,
/// then process every configured root path.
///
/// Token retrieval failure is fatal; everything after it is isolated per
/// root path inside [`pipeline::run`].
pub async fn run<O, P>(config: &Config, store: &O, params: &P) -> Result<RunReport>
where
    O: ObjectStore + ?Sized,
    P: ParameterStore + ?Sized,
{
    let token = params
        .get_secret(&config.token_parameter)
        .await
        .map_err(|e| anyhow!("fetching bearer token: {e}"))?;
    info!("Fetched Bitbucket bearer token");

    let source = BitbucketClient::new(config, token);
    Ok(pipeline::run(config, &source, store, params).await)
}
