use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

pub const STORE_FILENAME: &str = "evalbook.sqlite3";

/// Failures the IPC boundary distinguishes by code. Everything else rides
/// inside plain `anyhow` context chains.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("import failed: {0}")]
    ImportFailed(String),
    #[error("store is not initialized")]
    StoreUnavailable,
}

pub fn open_store(dir: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(dir)?;
    let conn = Connection::open(dir.join(STORE_FILENAME))?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Idempotent: safe to run on every startup against any prior store.
pub fn create_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS projects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            module_number TEXT,
            module_prefix TEXT,
            weight_percent REAL,
            settings TEXT NOT NULL,
            students TEXT NOT NULL,
            objectives TEXT NOT NULL,
            grids TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // Stores written before the category/weight split lack these columns.
    ensure_projects_module_columns(conn)?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_projects_module ON projects(module_number)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_projects_updated ON projects(updated_at DESC)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_evaluations(
            user_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            opened_at TEXT NOT NULL,
            PRIMARY KEY(user_id, project_id),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(project_id) REFERENCES projects(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_user_evaluations_project ON user_evaluations(project_id)",
        [],
    )?;

    Ok(())
}

fn ensure_projects_module_columns(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "projects", "module_prefix")? {
        conn.execute("ALTER TABLE projects ADD COLUMN module_prefix TEXT", [])?;
    }
    if !table_has_column(conn, "projects", "weight_percent")? {
        conn.execute("ALTER TABLE projects ADD COLUMN weight_percent REAL", [])?;
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
