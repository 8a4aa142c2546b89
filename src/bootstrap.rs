use anyhow::{anyhow, Context};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::legacy;
use crate::settings;
use crate::store::{self, STORE_FILENAME};

/// Overrides the canonical per-user data directory. Set by the test
/// harness and by portable installs.
pub const DATA_DIR_ENV: &str = "EVALBOOK_DATA_DIR";

const APP_DIR_NAME: &str = "evalbook";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let base = dirs::data_dir().ok_or_else(|| anyhow!("no per-user data directory available"))?;
    Ok(base.join(APP_DIR_NAME))
}

/// One-time store bootstrap: resolve the canonical path, copy in a legacy
/// store if this is a first start, open, apply schema, seed settings.
/// Idempotent across restarts; fails only if the store itself cannot be
/// opened or written.
pub fn initialize() -> anyhow::Result<Connection> {
    let dir = data_dir()?;
    let store_path = dir.join(STORE_FILENAME);

    if !store_path.exists() {
        if let Some(old_store) = legacy::find_legacy_store(&dir) {
            migrate_legacy_store(&old_store, &dir);
        }
    }

    let conn = store::open_store(&dir)
        .with_context(|| format!("failed to open store in {}", dir.to_string_lossy()))?;
    settings::seed_defaults(&conn)?;

    tracing::info!("store ready at {}", store_path.to_string_lossy());
    Ok(conn)
}

/// Copy a legacy store into the current data directory. Copies only, the
/// source installation keeps its file. Failure means starting with a fresh
/// empty store instead; it must not fail the bootstrap.
fn migrate_legacy_store(old_store: &Path, dir: &Path) {
    if let Err(e) = std::fs::create_dir_all(dir) {
        tracing::warn!(
            "legacy migration skipped, cannot create {}: {e}",
            dir.to_string_lossy()
        );
        return;
    }

    let dst = dir.join(STORE_FILENAME);
    if let Err(e) = std::fs::copy(old_store, &dst) {
        tracing::warn!(
            "legacy store copy failed from {}: {e}; starting fresh",
            old_store.to_string_lossy()
        );
        return;
    }

    // Carry the WAL side files along when the old process left them behind;
    // without them uncommitted pages would be lost.
    for suffix in ["-wal", "-shm"] {
        let src = side_file(old_store, suffix);
        if !src.exists() {
            continue;
        }
        if let Err(e) = std::fs::copy(&src, side_file(&dst, suffix)) {
            tracing::warn!(
                "legacy side file copy failed for {}: {e}",
                src.to_string_lossy()
            );
        }
    }

    tracing::info!(
        "migrated legacy store from {}",
        old_store.to_string_lossy()
    );
}

fn side_file(store_path: &Path, suffix: &str) -> PathBuf {
    let mut os = store_path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}
