// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template file discovery.
//!
//! Template repositories tend to carry more than templates. Issue trackers,
//! editor state, and folders full of retired templates all live next to the
//! real thing. Discovery walks a checkout and keeps only XML files that are
//! not buried in one of those noise directories.

use ignore::{DirEntry, WalkBuilder};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Directory names to skip, matched as case-insensitive substrings.
const EXCLUDED_DIRS: &[&str] = &[
    ".git",
    ".github",
    "issues",
    "depricated",
    "deprecated",
    ".history",
    ".idea",
];

/// File names that end in `.xml` but are not templates.
const EXCLUDED_FILES: &[&str] = &["ca_profile.xml"];

/// Collect template files beneath target root.
///
/// Paths come back sorted so that later templates overwrite earlier ones in
/// the same order on every run. Entries that cannot be read are logged and
/// skipped.
///
/// # Errors
///
/// - Return [`ScanError::MissingRoot`] if root is not a directory.
pub fn scan_templates(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(ScanError::MissingRoot {
            path: root.to_path_buf(),
        });
    }

    // INVARIANT: Walk everything, gitignore rules of template authors do not apply.
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|entry| !is_excluded_dir(entry))
        .build();

    let mut templates = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!("skip unreadable entry under {:?}: {error}", root.display());
                continue;
            }
        };

        let is_file = entry.file_type().is_some_and(|kind| kind.is_file());
        if is_file && is_template_file(entry.path()) {
            templates.push(entry.into_path());
        }
    }
    templates.sort();

    Ok(templates)
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_some_and(|kind| kind.is_dir()) {
        return false;
    }

    let name = entry.file_name().to_string_lossy().to_lowercase();
    EXCLUDED_DIRS.iter().any(|excluded| name.contains(excluded))
}

fn is_template_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    let is_xml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));

    is_xml && !EXCLUDED_FILES.contains(&name)
}

/// Template discovery error types.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Root to scan is missing or not a directory.
    #[error("cannot scan {:?}, not a directory", path.display())]
    MissingRoot { path: PathBuf },
}

/// Friendly result alias :3
pub type Result<T, E = ScanError> = std::result::Result<T, E>;
