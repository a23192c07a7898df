//! Directory traversal
//!
//! Enumerates candidate source files under a root in a stable order
//! (entries sorted by file name), skipping anything whose path matches the
//! exclusion pattern. Excluded directories are not descended into.

use crate::path;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while walking a directory tree
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("Failed to walk directory tree: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Which paths a walk visits
#[derive(Debug, Clone)]
pub struct WalkFilter {
    /// Matched against the slash-separated full path
    excludes: Option<Regex>,
    /// Matched against file paths only
    include: Regex,
}

impl WalkFilter {
    /// Build a filter for files ending in `.<extension>`
    ///
    /// # Arguments
    /// * `extension` - File extension without the dot, e.g. `js`
    /// * `excludes` - Optional regular expression over full paths
    pub fn new(extension: &str, excludes: Option<&str>) -> Result<Self, regex::Error> {
        let include = Regex::new(&format!(r"\.{}$", regex::escape(extension)))?;
        let excludes = excludes.map(Regex::new).transpose()?;
        Ok(Self { excludes, include })
    }

    /// Check whether a path is excluded
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excludes
            .as_ref()
            .is_some_and(|excludes| excludes.is_match(&path::to_slash(path)))
    }

    /// Check whether a file should be visited
    pub fn accepts(&self, path: &Path) -> bool {
        self.include.is_match(&path::to_slash(path)) && !self.is_excluded(path)
    }
}

/// Walk `root`, calling `visit` once for every accepted file
///
/// Stops at the first error returned by `visit`.
pub fn walk_tree<E, F>(root: &Path, filter: &WalkFilter, mut visit: F) -> Result<(), E>
where
    E: From<WalkError>,
    F: FnMut(PathBuf) -> Result<(), E>,
{
    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !filter.is_excluded(entry.path()));

    for entry in walker {
        let entry = entry.map_err(WalkError::from)?;
        if entry.file_type().is_file() && filter.accepts(entry.path()) {
            visit(entry.into_path())?;
        }
    }
    Ok(())
}

/// Collect every accepted file under `root`
pub fn collect_files(root: &Path, filter: &WalkFilter) -> Result<Vec<PathBuf>, WalkError> {
    let mut files = Vec::new();
    walk_tree(root, filter, |path| {
        files.push(path);
        Ok::<(), WalkError>(())
    })?;
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("lib/nested")).unwrap();
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join("b.js"), "").unwrap();
        fs::write(root.join("a.js"), "").unwrap();
        fs::write(root.join("readme.md"), "").unwrap();
        fs::write(root.join("lib/nested/c.js"), "").unwrap();
        fs::write(root.join("lib/c.json"), "").unwrap();
        fs::write(root.join("vendor/v.js"), "").unwrap();
        temp
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|file| path::to_slash(&path::relative_to(file, root)))
            .collect()
    }

    #[test]
    fn test_sorted_and_filtered_by_extension() {
        let temp = fixture();
        let filter = WalkFilter::new("js", None).unwrap();
        let files = collect_files(temp.path(), &filter).unwrap();
        assert_eq!(
            names(temp.path(), &files),
            vec!["a.js", "b.js", "lib/nested/c.js", "vendor/v.js"]
        );
    }

    #[test]
    fn test_excluded_directory_is_skipped() {
        let temp = fixture();
        let filter = WalkFilter::new("js", Some("/vendor(/|$)")).unwrap();
        let files = collect_files(temp.path(), &filter).unwrap();
        assert_eq!(
            names(temp.path(), &files),
            vec!["a.js", "b.js", "lib/nested/c.js"]
        );
    }

    #[test]
    fn test_invalid_exclusion_pattern() {
        assert!(WalkFilter::new("js", Some("(")).is_err());
    }

    #[test]
    fn test_visit_error_stops_walk() {
        let temp = fixture();
        let filter = WalkFilter::new("js", None).unwrap();
        let mut seen = 0;
        let result: Result<(), WalkError> = walk_tree(temp.path(), &filter, |_| {
            seen += 1;
            Err(WalkError::Walk(
                walkdir::WalkDir::new(temp.path().join("missing"))
                    .into_iter()
                    .next()
                    .unwrap()
                    .unwrap_err(),
            ))
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let filter = WalkFilter::new("js", None).unwrap();
        assert!(collect_files(&temp.path().join("absent"), &filter).is_err());
    }
}
