//! Zip archiving of one package directory.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Archive file name for a package, with second-resolution UTC timestamp.
pub fn archive_file_name(package: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.zip", package, at.format("%Y%m%d%H%M%S"))
}

/// Compress the contents of `source_dir` into a zip at `zip_path`.
///
/// Entry names are relative to `source_dir`, so extracting the archive
/// reproduces the package directory's contents, not its parent path.
pub fn zip_directory(source_dir: &Path, zip_path: &Path) -> Result<()> {
    let file = File::create(zip_path)
        .with_context(|| format!("creating archive file {}", zip_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut stack = vec![source_dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries: Vec<_> = fs::read_dir(&dir)
            .with_context(|| format!("reading directory {}", dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        if dir != source_dir {
            let rel = relative_name(source_dir, &dir)?;
            zip.add_directory(rel, options)
                .context("adding directory entry to archive")?;
        }

        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let rel = relative_name(source_dir, &path)?;
                let bytes = fs::read(&path)
                    .with_context(|| format!("reading file {}", path.display()))?;
                zip.start_file(rel, options)
                    .context("starting file entry in archive")?;
                zip.write_all(&bytes)
                    .context("writing file entry to archive")?;
            }
        }
    }

    zip.finish().context("finishing archive")?;
    Ok(())
}

fn relative_name(base: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(base)
        .with_context(|| format!("path {} outside archive root", path.display()))?;
    Ok(rel.to_string_lossy().replace('\\', "/"))
}
