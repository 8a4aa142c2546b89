use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};

use crate::model::Settings;
use crate::store::StoreError;

/// Fixed key of the single application-settings row.
pub const SETTINGS_KEY: &str = "app";

/// Write the default document if no settings row exists yet. Runs on every
/// bootstrap; an existing row is left alone.
pub fn seed_defaults(conn: &Connection) -> anyhow::Result<()> {
    let defaults = serde_json::to_string(&Settings::default())?;
    conn.execute(
        "INSERT OR IGNORE INTO settings(key, value) VALUES(?, ?)",
        (SETTINGS_KEY, defaults),
    )?;
    Ok(())
}

/// Stored values win field by field; fields the stored record predates are
/// filled from `Settings::default()` during deserialization.
pub fn get(conn: &Connection) -> anyhow::Result<Settings> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key = ?",
            [SETTINGS_KEY],
            |r| r.get(0),
        )
        .optional()?;
    let raw = raw.ok_or_else(|| StoreError::NotFound("settings were never seeded".to_string()))?;
    serde_json::from_str(&raw).context("stored settings are not valid JSON")
}

pub fn set(conn: &Connection, settings: &Settings) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO settings(key, value) VALUES(?, ?)",
        (SETTINGS_KEY, serde_json::to_string(settings)?),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResultView;
    use crate::store;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        conn.execute_batch("PRAGMA foreign_keys = ON").expect("pragma");
        store::create_schema(&conn).expect("schema");
        conn
    }

    #[test]
    fn get_before_seed_is_not_found() {
        let conn = test_conn();
        let err = get(&conn).expect_err("unseeded get must fail");
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn seed_then_get_returns_defaults_and_is_stable() {
        let conn = test_conn();
        seed_defaults(&conn).expect("seed");
        let s = get(&conn).expect("get");
        assert_eq!(s.test_identifier, "EP1");

        // Seeding again must not clobber a modified record.
        let mut changed = s.clone();
        changed.corrector_name = "R. Keller".to_string();
        set(&conn, &changed).expect("set");
        seed_defaults(&conn).expect("reseed");
        assert_eq!(get(&conn).expect("get").corrector_name, "R. Keller");
    }

    #[test]
    fn partial_stored_record_is_completed_with_defaults() {
        let conn = test_conn();
        // Simulate a row written by an older build that knew fewer fields.
        conn.execute(
            "INSERT INTO settings(key, value) VALUES(?, ?)",
            (SETTINGS_KEY, r#"{"classAverage": 5.0, "schoolName": "BBZ"}"#),
        )
        .expect("insert old row");

        let s = get(&conn).expect("get");
        assert_eq!(s.class_average, 5.0);
        assert_eq!(s.school_name, "BBZ");
        assert_eq!(s.pass_threshold, 4.0);
        assert_eq!(s.result_view, ResultView::Points);
    }
}
