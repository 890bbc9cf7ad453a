//! Archiver & publisher: zips one package directory, uploads the archive to
//! the object store and records its name in the parameter store.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::archive::{archive_file_name, zip_directory};
use crate::config::Config;
use crate::contract::{ObjectStore, ParameterStore};

/// A successfully published archive.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedArchive {
    pub package: String,
    pub archive_name: String,
    pub parameter_name: String,
}

/// Removes scratch paths when dropped, so local cleanup runs on every exit
/// path of the publish step, not only on success.
struct ScratchGuard {
    paths: Vec<PathBuf>,
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            let result = match path.metadata() {
                Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
                Ok(_) => fs::remove_file(path),
                // Never created, nothing to clean up.
                Err(_) => continue,
            };
            if let Err(e) = result {
                warn!(path = %path.display(), error = ?e, "Failed to remove scratch path");
            }
        }
    }
}

/// Archive `{scratch}/{root}/{package}` and publish it.
///
/// `root` is the root path with its leading separator already stripped, as
/// reported by the materializer. The archive object key is the archive file
/// name; the parameter key is `/org/layer/package/{root}/{package}/zipArchive`.
pub async fn archive_and_publish<O, P>(
    store: &O,
    params: &P,
    config: &Config,
    root: &str,
    package: &str,
) -> Result<PublishedArchive>
where
    O: ObjectStore + ?Sized,
    P: ParameterStore + ?Sized,
{
    let archive_name = archive_file_name(package, Utc::now());
    let package_dir = config.scratch_dir.join(root).join(package);
    let zip_path = config.scratch_dir.join(&archive_name);

    let _guard = ScratchGuard {
        paths: vec![zip_path.clone(), package_dir.clone()],
    };

    zip_directory(&package_dir, &zip_path)
        .with_context(|| format!("archiving package directory {}", package_dir.display()))?;
    let body = fs::read(&zip_path)
        .with_context(|| format!("reading archive {}", zip_path.display()))?;

    store
        .put_object(&archive_name, body)
        .await
        .map_err(|e| anyhow!("uploading archive {archive_name}: {e}"))?;

    let parameter_name = format!("/org/layer/package/{root}/{package}/zipArchive");
    let description = format!(
        "Archive name for {package} in s3 bucket {}",
        config.bucket
    );
    params
        .put_string(&parameter_name, &archive_name, &description)
        .await
        .map_err(|e| anyhow!("recording archive under {parameter_name}: {e}"))?;

    info!(
        package = %package,
        archive = %archive_name,
        parameter = %parameter_name,
        "Package archived and published"
    );
    Ok(PublishedArchive {
        package: package.to_string(),
        archive_name,
        parameter_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_guard_removes_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("archive.zip");
        let tree = dir.path().join("pkg");
        fs::write(&file, b"zip").unwrap();
        fs::create_dir_all(tree.join("nested")).unwrap();

        {
            let _guard = ScratchGuard {
                paths: vec![file.clone(), tree.clone()],
            };
        }

        assert!(!file.exists());
        assert!(!tree.exists());
    }

    #[test]
    fn scratch_guard_runs_on_early_return() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("archive.zip");
        fs::write(&file, b"zip").unwrap();

        let failing = || -> Result<()> {
            let _guard = ScratchGuard {
                paths: vec![file.clone()],
            };
            anyhow::bail!("upload failed");
        };
        assert!(failing().is_err());
        assert!(!file.exists());
    }

    #[test]
    fn scratch_guard_ignores_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let _guard = ScratchGuard {
            paths: vec![dir.path().join("never-created")],
        };
    }
}
