//! Package resolution: maps a materialised directory path back to the
//! first-level package directory that becomes the archive unit.

use tracing::debug;

/// Resolve the package name for a root path.
///
/// A single leading separator is stripped from `root_path`. If
/// `materialised_path` starts with the stripped root, the remainder is split
/// on `/` and its second segment (index 1) is the package name. A prefix
/// mismatch or missing segment resolves to no package, which the caller
/// treats as a no-op for that root path.
pub fn resolve_package(root_path: &str, materialised_path: &str) -> Option<String> {
    let root = root_path.strip_prefix('/').unwrap_or(root_path);
    let remainder = materialised_path.strip_prefix(root)?;
    let package = remainder.split('/').nth(1).filter(|s| !s.is_empty())?;
    debug!(root = %root, package = %package, "Resolved package name");
    Some(package.to_string())
}
