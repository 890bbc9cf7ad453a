//! Pipeline driver: materialize → resolve → publish for each configured root
//! path, isolating failures per path.

use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::contract::{ObjectStore, ParameterStore, RepoSource};
use crate::materialise::materialise;
use crate::publish::archive_and_publish;
use crate::resolve::resolve_package;

/// Outcome of one full pipeline run, one entry per configured root path.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub roots: Vec<RootPathReport>,
}

impl RunReport {
    pub fn published(&self) -> usize {
        self.roots
            .iter()
            .filter(|r| matches!(r.outcome, RootOutcome::Published { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.roots
            .iter()
            .filter(|r| matches!(r.outcome, RootOutcome::Failed { .. }))
            .count()
    }
}

#[derive(Debug, Serialize)]
pub struct RootPathReport {
    /// The root path as configured, before any separator stripping.
    pub root_path: String,
    pub outcome: RootOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RootOutcome {
    Published {
        package: String,
        archive_name: String,
        parameter_name: String,
        files_downloaded: usize,
        files_skipped: usize,
    },
    /// The materialised tree yielded no archivable package directory.
    NoPackage,
    Failed {
        error: String,
    },
}

/// Run the pipeline for every configured root path, in configured order.
///
/// A root path's failure is recorded and logged but never aborts the
/// remaining root paths; the function itself does not fail.
pub async fn run<S, O, P>(config: &Config, source: &S, store: &O, params: &P) -> RunReport
where
    S: RepoSource + ?Sized,
    O: ObjectStore + ?Sized,
    P: ParameterStore + ?Sized,
{
    let mut roots = Vec::with_capacity(config.root_paths.len());
    for root_path in &config.root_paths {
        info!(root = %root_path, "Checking folder path");
        let outcome = match process_root(config, source, store, params, root_path).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(root = %root_path, error = %e, "Could not be executed for root path");
                RootOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        roots.push(RootPathReport {
            root_path: root_path.clone(),
            outcome,
        });
    }
    let report = RunReport { roots };
    info!(
        published = report.published(),
        failed = report.failed(),
        total = report.roots.len(),
        "Pipeline run complete"
    );
    report
}

async fn process_root<S, O, P>(
    config: &Config,
    source: &S,
    store: &O,
    params: &P,
    root_path: &str,
) -> anyhow::Result<RootOutcome>
where
    S: RepoSource + ?Sized,
    O: ObjectStore + ?Sized,
    P: ParameterStore + ?Sized,
{
    let report = materialise(source, root_path, &config.scratch_dir).await?;

    let package = report
        .last_directory()
        .and_then(|dir| resolve_package(root_path, dir));
    let Some(package) = package else {
        info!(root = %root_path, "No package resolved, nothing to archive");
        return Ok(RootOutcome::NoPackage);
    };

    let published =
        archive_and_publish(store, params, config, &report.root_path, &package).await?;
    Ok(RootOutcome::Published {
        package: published.package,
        archive_name: published.archive_name,
        parameter_name: published.parameter_name,
        files_downloaded: report.downloaded(),
        files_skipped: report.skipped(),
    })
}
