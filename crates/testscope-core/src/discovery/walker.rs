//! Recursive test file enumeration.

use ignore::WalkBuilder;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::error::DiscoveryError;

/// Files found under a root, plus entries that could not be read.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub files: Vec<PathBuf>,
    pub errors: Vec<DiscoveryError>,
}

/// Collects files ending in `suffix` under `root`.
///
/// Any directory whose base name is in `skip` is pruned with its whole
/// subtree. The root itself is never pruned. Entries are visited in file
/// name order so repeated walks of an unchanged tree agree.
pub fn collect_test_files(root: &Path, skip: &[String], suffix: &str) -> WalkOutcome {
    let skip: HashSet<String> = skip.iter().cloned().collect();
    let mut outcome = WalkOutcome::default();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !skip.contains(name.as_ref())
        })
        .build();

    for result in walker {
        match result {
            Ok(entry) => {
                let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                if !is_file {
                    continue;
                }
                let matches = entry
                    .file_name()
                    .to_str()
                    .map(|n| n.ends_with(suffix))
                    .unwrap_or(false);
                if matches {
                    outcome.files.push(entry.into_path());
                }
            }
            Err(err) => outcome.errors.push(DiscoveryError::Walk {
                path: error_path(&err).unwrap_or(root).to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    outcome
}

/// The entry a walk error is about, when the error carries one.
fn error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            error_path(err)
        }
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::Partial(errs) => errs.iter().find_map(error_path),
        _ => None,
    }
}

/// Same as [`collect_test_files`], off the async executor.
pub async fn collect_test_files_async(
    root: &Path,
    skip: &[String],
    suffix: &str,
) -> Result<WalkOutcome, DiscoveryError> {
    let root_buf = root.to_path_buf();
    let skip = skip.to_vec();
    let suffix = suffix.to_string();

    tokio::task::spawn_blocking(move || collect_test_files(&root_buf, &skip, &suffix))
        .await
        .map_err(|e| DiscoveryError::Walk {
            path: root.to_path_buf(),
            message: e.to_string(),
        })
}
