//! Discovery of a store left behind by a previously named installation.
//!
//! The application shipped under other names before `evalbook`; each kept
//! its database under its own per-user data directory. On first start the
//! bootstrapper asks this module for a candidate to copy in.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::store::STORE_FILENAME;

/// Data-directory names of earlier releases, newest first.
const LEGACY_APP_NAMES: &[&str] = &[
    "EvalBook",
    "evalbook-app",
    "GradingAssistant",
    "grading-assistant",
];

/// Fuzzy fallback: a sibling directory qualifies if its name contains one
/// of these, case-insensitively.
const LEGACY_NAME_HINTS: &[&str] = &["evalbook", "grading"];

/// Look for a legacy store next to the current data directory. Read-only;
/// any filesystem error is treated as "nothing found".
pub fn find_legacy_store(current_dir: &Path) -> Option<PathBuf> {
    match locate(current_dir) {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!("legacy store scan failed: {e:#}");
            None
        }
    }
}

fn locate(current_dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    let Some(parent) = current_dir.parent() else {
        return Ok(None);
    };
    let current_name = current_dir
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("");

    for name in LEGACY_APP_NAMES {
        if name.eq_ignore_ascii_case(current_name) {
            continue;
        }
        let candidate = parent.join(name).join(STORE_FILENAME);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }

    for entry in std::fs::read_dir(parent)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(OsStr::to_str) else {
            continue;
        };
        if name.eq_ignore_ascii_case(current_name) {
            continue;
        }
        let lower = name.to_lowercase();
        if !LEGACY_NAME_HINTS.iter().any(|hint| lower.contains(hint)) {
            continue;
        }
        let candidate = path.join(STORE_FILENAME);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}
