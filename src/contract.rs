//! Trait seams between the pipeline and its external collaborators.
//!
//! The pipeline only ever talks to the source-hosting API, the object store
//! and the parameter store through the traits below. Real implementations
//! live in [`crate::bitbucket`] and [`crate::aws`]; tests use the generated
//! `mockall` mocks (feature-gated under `test-export-mocks`).

use async_trait::async_trait;
use serde::Deserialize;

/// Boxed error used across all trait seams.
pub type ContractError = Box<dyn std::error::Error + Send + Sync>;

/// One entry of a remote directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

/// Entry types as reported by the listing API. Anything the API may add
/// later lands in `Other` and is skipped with a warning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "commit_directory")]
    Directory,
    #[serde(rename = "commit_file")]
    File,
    #[serde(other)]
    Other,
}

/// Read access to the remote repository tree.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait RepoSource: Send + Sync {
    /// List all entries directly under `path`, across every pagination page.
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, ContractError>;

    /// Fetch the raw bytes of `file_name` inside `dir_path`.
    ///
    /// Returns `Ok(None)` when the file is not available (non-200 response);
    /// the caller records it as skipped rather than failing.
    async fn fetch_file(
        &self,
        dir_path: &str,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, ContractError>;
}

/// Write access to the archive object store.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `key` in the configured bucket.
    async fn put_object(&self, key: &str, body: Vec<u8>) -> Result<(), ContractError>;
}

/// Read/write access to the parameter store.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Read and decrypt a secret parameter.
    async fn get_secret(&self, name: &str) -> Result<String, ContractError>;

    /// Write (or overwrite) a plain string parameter with a description.
    async fn put_string(
        &self,
        name: &str,
        value: &str,
        description: &str,
    ) -> Result<(), ContractError>;
}
