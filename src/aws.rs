//! AWS-backed implementations of the object-store and parameter-store seams.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_ssm::types::ParameterType;

use crate::contract::{ContractError, ObjectStore, ParameterStore};

pub struct S3ObjectStore {
    bucket: String,
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(sdk_config: &aws_config::SdkConfig, bucket: String) -> Self {
        S3ObjectStore {
            bucket,
            client: aws_sdk_s3::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), ContractError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| format!("failed to write object to s3: {e}").into())
    }
}

pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        SsmParameterStore {
            client: aws_sdk_ssm::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn get_secret(&self, name: &str) -> Result<String, ContractError> {
        let response = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| format!("failed to read parameter {name}: {e}"))?;
        response
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| format!("parameter {name} has no value").into())
    }

    async fn put_string(
        &self,
        name: &str,
        value: &str,
        description: &str,
    ) -> Result<(), ContractError> {
        self.client
            .put_parameter()
            .name(name)
            .value(value)
            .description(description)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| format!("failed to write parameter {name}: {e}").into())
    }
}
