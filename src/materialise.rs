//! Tree materializer: mirrors one remote root folder into the local scratch
//! directory.
//!
//! The walk is an explicit worklist rather than recursion, so tree depth
//! never grows the call stack. Ordering matches the remote API: entries are
//! handled in returned order, and a directory's subtree is fully processed
//! before the remaining sibling entries at its level.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};

use crate::contract::{EntryKind, RemoteEntry, RepoSource};

/// Outcome of a single remote file during materialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub remote_path: String,
    pub status: FileStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Downloaded,
    /// The content request returned non-200; the file is left out of the
    /// local tree and of any archive built from it.
    Skipped,
}

/// What one root path's walk produced.
#[derive(Debug)]
pub struct MaterialiseReport {
    /// Root path with a single leading separator stripped.
    pub root_path: String,
    /// First-level directories in listing order, relative to the scratch root.
    pub first_level_directories: Vec<String>,
    pub files: Vec<FileOutcome>,
    pub unrecognised_entries: usize,
}

impl MaterialiseReport {
    /// Path of the last directory-type entry at the root level. This is the
    /// value the package resolver consumes; when several first-level
    /// directories exist only this one leads to an archive.
    pub fn last_directory(&self) -> Option<&str> {
        self.first_level_directories.last().map(String::as_str)
    }

    pub fn downloaded(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Downloaded)
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.status == FileStatus::Skipped)
            .count()
    }
}

/// A unit of pending work: either a directory still to be listed, or the
/// unprocessed tail of an already-listed directory's entries (resumed after
/// a child subtree completes).
enum Task {
    List(String),
    Entries {
        folder: String,
        entries: std::vec::IntoIter<RemoteEntry>,
    },
}

/// Mirror the remote tree under `root_path` into `scratch_root`.
pub async fn materialise<S>(
    source: &S,
    root_path: &str,
    scratch_root: &Path,
) -> Result<MaterialiseReport>
where
    S: RepoSource + ?Sized,
{
    let root = root_path.trim_start_matches('/').to_string();
    info!(root = %root, "Materialising remote folder tree");

    let mut report = MaterialiseReport {
        root_path: root.clone(),
        first_level_directories: Vec::new(),
        files: Vec::new(),
        unrecognised_entries: 0,
    };

    let mut stack = vec![Task::List(root.clone())];
    while let Some(task) = stack.pop() {
        match task {
            Task::List(folder) => {
                let entries = source
                    .list_directory(&folder)
                    .await
                    .map_err(|e| anyhow!("listing failed for {folder}: {e}"))?;
                let local_dir = scratch_root.join(&folder);
                fs::create_dir_all(&local_dir)
                    .with_context(|| format!("creating local directory {}", local_dir.display()))?;
                debug!(path = %local_dir.display(), entries = entries.len(), "Listed remote directory");
                stack.push(Task::Entries {
                    folder,
                    entries: entries.into_iter(),
                });
            }
            Task::Entries { folder, mut entries } => {
                while let Some(entry) = entries.next() {
                    match entry.kind {
                        EntryKind::Directory => {
                            let segment = last_segment(&entry.path);
                            let child = format!("{folder}/{segment}");
                            let local_dir = scratch_root.join(&child);
                            fs::create_dir_all(&local_dir).with_context(|| {
                                format!("creating local directory {}", local_dir.display())
                            })?;
                            debug!(path = %local_dir.display(), "Created local subfolder");
                            if folder == root {
                                report.first_level_directories.push(child.clone());
                            }
                            // Descend into the child before the remaining
                            // entries at this level.
                            stack.push(Task::Entries { folder, entries });
                            stack.push(Task::List(child));
                            break;
                        }
                        EntryKind::File => {
                            let file_name = last_segment(&entry.path).to_string();
                            let status = match source
                                .fetch_file(&folder, &file_name)
                                .await
                                .map_err(|e| anyhow!("download failed for {}: {e}", entry.path))?
                            {
                                Some(bytes) => {
                                    let local_file = scratch_root.join(&folder).join(&file_name);
                                    fs::write(&local_file, bytes).with_context(|| {
                                        format!("writing local file {}", local_file.display())
                                    })?;
                                    debug!(path = %local_file.display(), "Wrote local file");
                                    FileStatus::Downloaded
                                }
                                None => FileStatus::Skipped,
                            };
                            report.files.push(FileOutcome {
                                remote_path: entry.path,
                                status,
                            });
                        }
                        EntryKind::Other => {
                            warn!(path = %entry.path, "Unknown entry type, skipping");
                            report.unrecognised_entries += 1;
                        }
                    }
                }
            }
        }
    }

    if report.first_level_directories.len() > 1 {
        warn!(
            root = %root,
            directories = ?report.first_level_directories,
            "Multiple first-level directories found; only the last one is archived"
        );
    }
    info!(
        root = %root,
        downloaded = report.downloaded(),
        skipped = report.skipped(),
        "Materialisation complete"
    );
    Ok(report)
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
