use anyhow::Context;
use chrono::Local;
use rusqlite::Connection;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::model::{Project, Settings};
use crate::projects::{self, InsertMode};
use crate::settings;
use crate::store::StoreError;

pub const EXPORT_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    pub entry_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ImportSummary {
    pub inserted: usize,
    pub skipped: usize,
    pub settings_applied: bool,
}

/// Whole-store export. Projects keep the recency order of `projects::list`.
pub fn export_all(conn: &Connection) -> anyhow::Result<Value> {
    let projects = projects::list(conn)?;
    let settings = settings::get(conn)?;
    Ok(json!({
        "version": EXPORT_VERSION,
        "exportedAt": exported_at(),
        "projects": projects,
        "settings": settings,
    }))
}

pub fn export_one(conn: &Connection, project_id: &str) -> anyhow::Result<Value> {
    let project = projects::get(conn, project_id)?
        .ok_or_else(|| StoreError::NotFound(format!("project {}", project_id)))?;
    Ok(single_project_document(&project))
}

fn single_project_document(project: &Project) -> Value {
    json!({
        "version": EXPORT_VERSION,
        "exportedAt": exported_at(),
        "project": project,
    })
}

/// One JSON file per project inside a dated folder, zipped. Callers flush
/// the working copy first so the archive sees the latest edits.
pub fn export_archive(conn: &Connection, out_path: &Path) -> anyhow::Result<ArchiveSummary> {
    let all = projects::list(conn)?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create archive file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let date = Local::now().format("%Y-%m-%d").to_string();
    let folder = format!("BACKUP_{}", date);

    let mut used_names: HashSet<String> = HashSet::new();
    let mut entry_count = 0usize;
    for project in &all {
        let name = archive_entry_name(project, &date, &mut used_names);
        zip.start_file(format!("{}/{}", folder, name), opts)
            .with_context(|| format!("failed to start archive entry {}", name))?;
        let doc = single_project_document(project);
        zip.write_all(
            serde_json::to_string_pretty(&doc)
                .context("failed to serialize project document")?
                .as_bytes(),
        )
        .with_context(|| format!("failed to write archive entry {}", name))?;
        entry_count += 1;
    }

    zip.finish().context("failed to finalize archive")?;
    Ok(ArchiveSummary { entry_count })
}

fn archive_entry_name(project: &Project, date: &str, used: &mut HashSet<String>) -> String {
    let module_part = project
        .module_number
        .clone()
        .unwrap_or_else(|| project.name.clone());
    let stem = sanitize_filename(&format!(
        "{}_{}",
        module_part, project.settings.test_identifier
    ));

    let mut name = format!("{}_{}.json", stem, date);
    let mut counter = 2;
    while !used.insert(name.clone()) {
        name = format!("{}_{}_{}.json", stem, date, counter);
        counter += 1;
    }
    name
}

/// Replace every character a filesystem may reject with an underscore.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '\\' | '/' => '_',
            other => other,
        })
        .collect()
}

/// Restore from an export document, whole-store or single-project shaped.
///
/// `merge = false` replaces the store: every existing project is deleted,
/// incoming ones are written unconditionally, and incoming settings (when
/// present) overwrite the stored record. `merge = true` only adds projects
/// whose id is not present yet — existing projects are never overwritten,
/// even by a newer incoming copy, and settings are left untouched.
///
/// Not transactional: a failure partway through leaves the rows already
/// applied in place, and the error reports what went wrong.
pub fn import_all(conn: &Connection, document: &Value, merge: bool) -> anyhow::Result<ImportSummary> {
    import_all_inner(conn, document, merge)
        .map_err(|e| StoreError::ImportFailed(format!("{e:#}")).into())
}

fn import_all_inner(
    conn: &Connection,
    document: &Value,
    merge: bool,
) -> anyhow::Result<ImportSummary> {
    // A single-project document is a one-element import.
    let incoming: Vec<Value> = if let Some(list) = document.get("projects").and_then(Value::as_array)
    {
        list.clone()
    } else if let Some(single) = document.get("project") {
        vec![single.clone()]
    } else {
        Vec::new()
    };

    if incoming.is_empty() {
        return Err(StoreError::InvalidInput(
            "import document contains no projects".to_string(),
        )
        .into());
    }

    if !merge {
        // Cascade clears the user_evaluations rows of the outgoing projects.
        conn.execute("DELETE FROM projects", [])?;
    }

    let mut summary = ImportSummary::default();
    for value in &incoming {
        let project: Project = serde_json::from_value(value.clone())
            .context("import document contains a malformed project")?;
        let mode = if merge {
            InsertMode::IgnoreExisting
        } else {
            InsertMode::Replace
        };
        if projects::insert(conn, &project, mode)? == 0 {
            summary.skipped += 1;
        } else {
            summary.inserted += 1;
        }
    }

    if !merge {
        if let Some(raw) = document.get("settings") {
            let incoming_settings: Settings = serde_json::from_value(raw.clone())
                .context("import document contains malformed settings")?;
            settings::set(conn, &incoming_settings)?;
            summary.settings_applied = true;
        }
    }

    Ok(summary)
}

fn exported_at() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
