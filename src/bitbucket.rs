//! Bitbucket Cloud source API client.
//!
//! Implements [`RepoSource`] on top of the `src` endpoint: directory listings
//! are JSON pages linked by a `next` cursor, file contents are raw bytes at
//! the same URL shape plus the file name.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::contract::{ContractError, RemoteEntry, RepoSource};

/// One page of a directory listing response.
#[derive(Debug, Deserialize)]
pub struct ListingPage {
    #[serde(default)]
    pub values: Vec<RemoteEntry>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Fetches a single listing page. Split out from [`BitbucketClient`] so the
/// pagination loop can be exercised against mock pages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
trait FetchPage: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<ListingPage, ContractError>;
}

/// Follow `next` cursors until exhausted, concatenating entries in page order.
async fn collect_entries<F>(fetcher: &F, first_url: String) -> Result<Vec<RemoteEntry>, ContractError>
where
    F: FetchPage + ?Sized,
{
    let mut entries = Vec::new();
    let mut next_url = Some(first_url);
    while let Some(url) = next_url {
        debug!(url = %url, "Fetching listing page");
        let page = fetcher.fetch_page(&url).await?;
        entries.extend(page.values);
        next_url = page.next;
    }
    Ok(entries)
}

pub struct BitbucketClient {
    http: reqwest::Client,
    base_url: String,
    workspace: String,
    repository: String,
    reference: String,
    token: String,
}

impl BitbucketClient {
    pub fn new(config: &Config, token: String) -> Self {
        BitbucketClient {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.clone(),
            workspace: config.workspace.clone(),
            repository: config.repository.clone(),
            reference: config.reference.clone(),
            token,
        }
    }

    fn src_url(&self, path: &str) -> String {
        format!(
            "{}/repositories/{}/{}/src/{}/{}",
            self.base_url,
            self.workspace,
            self.repository,
            self.reference,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl FetchPage for BitbucketClient {
    async fn fetch_page(&self, url: &str) -> Result<ListingPage, ContractError> {
        let response = self.http.get(url).bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("listing request to {url} returned {status}").into());
        }
        Ok(response.json::<ListingPage>().await?)
    }
}

#[async_trait]
impl RepoSource for BitbucketClient {
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>, ContractError> {
        collect_entries(self, self.src_url(path)).await
    }

    async fn fetch_file(
        &self,
        dir_path: &str,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, ContractError> {
        let url = format!("{}/{}", self.src_url(dir_path), file_name);
        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(url = %url, status = %status, "File not available, skipping");
            return Ok(None);
        }
        Ok(Some(response.bytes().await?.to_vec()))
    }
}
