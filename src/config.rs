use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub const DEFAULT_API_BASE_URL: &str = "https://api.bitbucket.org/2.0";
pub const DEFAULT_SCRATCH_DIR: &str = "/tmp";

/// Immutable run configuration, built once from the environment and passed
/// explicitly into every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bitbucket workspace the repository lives in.
    pub workspace: String,
    /// Repository slug within the workspace.
    pub repository: String,
    /// Name of the encrypted parameter holding the Bitbucket bearer token.
    pub token_parameter: String,
    /// Branch, tag or commit to read the tree from.
    pub reference: String,
    /// Destination bucket for the published archives.
    pub bucket: String,
    /// Root folder paths to mirror and archive, in configured order.
    pub root_paths: Vec<String>,
    /// Base URL of the source-hosting API.
    pub api_base_url: String,
    /// Local scratch root the remote tree is mirrored under.
    pub scratch_dir: PathBuf,
}

impl Config {
    /// Load the configuration from environment variables.
    ///
    /// `FOLDER_PATHS` is a comma-separated list; empty segments are dropped.
    pub fn from_env() -> Result<Self> {
        let workspace = require("WORKSPACE_NAME")?;
        let repository = require("REPOSITORY_NAME")?;
        let token_parameter = require("BITBUCKET_TOKEN_PARAMETER")?;
        let reference = require("BRANCH_NAME")?;
        let bucket = require("BUCKET_NAME")?;

        let folder_paths = require("FOLDER_PATHS")?;
        let root_paths: Vec<String> = folder_paths
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        anyhow::ensure!(
            !root_paths.is_empty(),
            "FOLDER_PATHS must contain at least one folder path"
        );

        let api_base_url = env::var("BITBUCKET_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let scratch_dir = env::var("SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SCRATCH_DIR));

        Ok(Config {
            workspace,
            repository,
            token_parameter,
            reference,
            bucket,
            root_paths,
            api_base_url,
            scratch_dir,
        })
    }

    pub fn trace_loaded(&self) {
        info!(
            workspace = %self.workspace,
            repository = %self.repository,
            reference = %self.reference,
            bucket = %self.bucket,
            root_paths = self.root_paths.len(),
            scratch_dir = %self.scratch_dir.display(),
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} environment variable not set"))
}
