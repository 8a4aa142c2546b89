use anyhow::Context;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::model::{now_iso, Grid, ModulePrefix, Objective, Project, Settings, Student};
use crate::module_code;
use crate::store::StoreError;

/// Appended to the name of a duplicated project.
pub const COPY_SUFFIX: &str = " (copy)";

/// Result of the best-effort write paths (grid upsert/remove, memory
/// flush). A missing project is an outcome, not an error: these run from
/// background autosave and must never take down an edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    MissingProject,
}

impl WriteOutcome {
    pub fn applied(self) -> bool {
        matches!(self, WriteOutcome::Applied)
    }
}

const PROJECT_COLUMNS: &str = "id, name, description, module_number, module_prefix, \
     weight_percent, settings, students, objectives, grids, created_at, updated_at";

pub fn create(conn: &Connection, name: &str, description: &str) -> anyhow::Result<Project> {
    let code = module_code::parse_module_code(name);
    let now = now_iso();
    let settings = Settings {
        module_name: name.to_string(),
        module_description: description.to_string(),
        ..Settings::default()
    };

    let project = Project {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: description.to_string(),
        created_at: now.clone(),
        updated_at: now,
        module_number: code.number,
        module_prefix: code.prefix,
        weight_percent: code.prefix.map(ModulePrefix::weight),
        settings,
        students: Vec::new(),
        objectives: Vec::new(),
        grids: Vec::new(),
    };
    insert(conn, &project, InsertMode::Plain)?;
    Ok(project)
}

/// All projects, most recently touched first. The ordering is exact: the
/// recent-projects list in the UI is driven directly by it.
pub fn list(conn: &Connection) -> anyhow::Result<Vec<Project>> {
    let sql = format!(
        "SELECT {} FROM projects ORDER BY updated_at DESC, rowid DESC",
        PROJECT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_row)?;

    let mut projects = Vec::new();
    for row in rows {
        projects.push(decode(row?)?);
    }
    Ok(projects)
}

pub fn get(conn: &Connection, id: &str) -> anyhow::Result<Option<Project>> {
    let sql = format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS);
    let raw = conn
        .query_row(&sql, [id], read_row)
        .optional()?;
    raw.map(decode).transpose()
}

/// Full replace of the mutable fields. `updatedAt` is always stamped here,
/// never taken from the caller; the stamp is returned so the caller's
/// working copy can follow.
pub fn update(conn: &Connection, project: &Project) -> anyhow::Result<String> {
    let updated_at = now_iso();
    let n = conn.execute(
        "UPDATE projects SET name = ?, description = ?, module_number = ?, module_prefix = ?,
             weight_percent = ?, settings = ?, students = ?, objectives = ?, grids = ?,
             updated_at = ?
         WHERE id = ?",
        params![
            project.name,
            project.description,
            project.module_number,
            project.module_prefix.map(ModulePrefix::as_str),
            project.weight_percent,
            encode_doc(&project.settings, "settings")?,
            encode_doc(&project.students, "students")?,
            encode_doc(&project.objectives, "objectives")?,
            encode_doc(&project.grids, "grids")?,
            updated_at,
            project.id,
        ],
    )?;
    if n == 0 {
        tracing::warn!(project_id = %project.id, "update targeted a project that does not exist");
    }
    Ok(updated_at)
}

pub fn delete(conn: &Connection, id: &str) -> anyhow::Result<()> {
    // user_evaluations rows go with the project via ON DELETE CASCADE.
    conn.execute("DELETE FROM projects WHERE id = ?", [id])?;
    Ok(())
}

/// Deep copy under a fresh id; nested collections are copied by value, so
/// edits to the duplicate never reach the source.
pub fn duplicate(conn: &Connection, id: &str) -> anyhow::Result<Project> {
    let source = require(conn, id)?;
    let now = now_iso();

    let mut copy = source.clone();
    copy.id = Uuid::new_v4().to_string();
    copy.name = format!("{}{}", source.name, COPY_SUFFIX);
    copy.created_at = now.clone();
    copy.updated_at = now;

    insert(conn, &copy, InsertMode::Plain)?;
    Ok(copy)
}

/// Derive the follow-up evaluation of a module: same roster and settings,
/// test identifier advanced past every sibling sharing the module number,
/// rubric and grids left empty for the template step to fill.
pub fn derive_evaluation(conn: &Connection, base_id: &str) -> anyhow::Result<Project> {
    let base = require(conn, base_id)?;

    // NULL module numbers group together: `IS` instead of `=`.
    let mut stmt = conn.prepare("SELECT settings FROM projects WHERE module_number IS ?")?;
    let rows = stmt.query_map([&base.module_number], |r| r.get::<_, String>(0))?;

    let mut max_seen = 0u32;
    for raw in rows {
        let Ok(sibling) = serde_json::from_str::<Settings>(&raw?) else {
            continue;
        };
        if let Some(seq) = module_code::eval_sequence(&sibling.test_identifier) {
            max_seen = max_seen.max(seq);
        }
    }

    let mut settings = base.settings.clone();
    settings.test_identifier = module_code::next_eval_identifier(max_seen);

    let now = now_iso();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        name: base.name.clone(),
        description: base.description.clone(),
        created_at: now.clone(),
        updated_at: now,
        module_number: base.module_number.clone(),
        module_prefix: base.module_prefix,
        weight_percent: base.weight_percent,
        settings,
        students: base.students.clone(),
        objectives: Vec::new(),
        grids: Vec::new(),
    };
    insert(conn, &project, InsertMode::Plain)?;
    Ok(project)
}

/// Replace the grid matching the student, or append. Invoked from the
/// autosave path: a project that no longer exists is logged and skipped.
pub fn upsert_grid(conn: &Connection, project_id: &str, grid: Grid) -> anyhow::Result<WriteOutcome> {
    let Some(mut project) = get(conn, project_id)? else {
        tracing::warn!(project_id, "grid upsert skipped: project does not exist");
        return Ok(WriteOutcome::MissingProject);
    };

    match project
        .grids
        .iter_mut()
        .find(|g| g.student_id == grid.student_id)
    {
        Some(slot) => *slot = grid,
        None => project.grids.push(grid),
    }

    write_grids(conn, project_id, &project.grids)?;
    Ok(WriteOutcome::Applied)
}

/// Remove a student's grid. With a project id, only that project is
/// touched; without one, every project is swept — the cleanup path after a
/// student is deleted globally, O(projects) and not for routine use.
/// Returns the number of grids removed.
pub fn remove_grid(
    conn: &Connection,
    student_id: &str,
    project_id: Option<&str>,
) -> anyhow::Result<usize> {
    match project_id {
        Some(pid) => {
            let Some(mut project) = get(conn, pid)? else {
                tracing::warn!(project_id = pid, "grid remove skipped: project does not exist");
                return Ok(0);
            };
            let before = project.grids.len();
            project.grids.retain(|g| g.student_id != student_id);
            let removed = before - project.grids.len();
            if removed > 0 {
                write_grids(conn, pid, &project.grids)?;
            }
            Ok(removed)
        }
        None => {
            let mut removed = 0usize;
            for mut project in list(conn)? {
                let before = project.grids.len();
                project.grids.retain(|g| g.student_id != student_id);
                let dropped = before - project.grids.len();
                if dropped > 0 {
                    write_grids(conn, &project.id, &project.grids)?;
                    removed += dropped;
                }
            }
            Ok(removed)
        }
    }
}

/// One-shot commit of the UI's in-memory working copy: students, objectives
/// and grids replaced in a single statement. Callers run this before any
/// export so exported data reflects the latest edits.
pub fn flush_working(
    conn: &Connection,
    project_id: Option<&str>,
    students: &[Student],
    objectives: &[Objective],
    grids: &[Grid],
) -> anyhow::Result<WriteOutcome> {
    let Some(pid) = project_id else {
        tracing::warn!("memory flush skipped: no active project id");
        return Ok(WriteOutcome::MissingProject);
    };

    let n = conn.execute(
        "UPDATE projects SET students = ?, objectives = ?, grids = ?, updated_at = ? WHERE id = ?",
        params![
            encode_doc(&students, "students")?,
            encode_doc(&objectives, "objectives")?,
            encode_doc(&grids, "grids")?,
            now_iso(),
            pid,
        ],
    )?;
    if n == 0 {
        tracing::warn!(project_id = pid, "memory flush skipped: project does not exist");
        return Ok(WriteOutcome::MissingProject);
    }
    Ok(WriteOutcome::Applied)
}

/// Record that a user opened a project, for the recency list. Best-effort.
pub fn record_opened(conn: &Connection, user_name: &str, project_id: &str) -> anyhow::Result<bool> {
    if get(conn, project_id)?.is_none() {
        tracing::warn!(project_id, "open not recorded: project does not exist");
        return Ok(false);
    }
    let user_id = ensure_user(conn, user_name)?;
    conn.execute(
        "INSERT INTO user_evaluations(user_id, project_id, opened_at) VALUES(?, ?, ?)
         ON CONFLICT(user_id, project_id) DO UPDATE SET opened_at = excluded.opened_at",
        params![user_id, project_id, now_iso()],
    )?;
    Ok(true)
}

fn ensure_user(conn: &Connection, name: &str) -> anyhow::Result<String> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM users WHERE name = ?", [name], |r| r.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    let id = Uuid::new_v4().to_string();
    conn.execute("INSERT INTO users(id, name) VALUES(?, ?)", (&id, name))?;
    Ok(id)
}

#[derive(Debug, Clone, Copy)]
pub enum InsertMode {
    Plain,
    Replace,
    IgnoreExisting,
}

/// Returns the number of rows written (0 only under `IgnoreExisting`).
pub fn insert(conn: &Connection, project: &Project, mode: InsertMode) -> anyhow::Result<usize> {
    let verb = match mode {
        InsertMode::Plain => "INSERT",
        InsertMode::Replace => "INSERT OR REPLACE",
        InsertMode::IgnoreExisting => "INSERT OR IGNORE",
    };
    let sql = format!(
        "{} INTO projects({}) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        verb, PROJECT_COLUMNS
    );
    let n = conn.execute(
        &sql,
        params![
            project.id,
            project.name,
            project.description,
            project.module_number,
            project.module_prefix.map(ModulePrefix::as_str),
            project.weight_percent,
            encode_doc(&project.settings, "settings")?,
            encode_doc(&project.students, "students")?,
            encode_doc(&project.objectives, "objectives")?,
            encode_doc(&project.grids, "grids")?,
            project.created_at,
            project.updated_at,
        ],
    )?;
    Ok(n)
}

fn require(conn: &Connection, id: &str) -> anyhow::Result<Project> {
    get(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("project {}", id)).into())
}

fn write_grids(conn: &Connection, project_id: &str, grids: &[Grid]) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE projects SET grids = ?, updated_at = ? WHERE id = ?",
        params![encode_doc(&grids, "grids")?, now_iso(), project_id],
    )?;
    Ok(())
}

fn encode_doc<T: serde::Serialize>(value: &T, what: &str) -> anyhow::Result<String> {
    serde_json::to_string(value).with_context(|| format!("failed to serialize {}", what))
}

struct ProjectRow {
    id: String,
    name: String,
    description: String,
    module_number: Option<String>,
    module_prefix: Option<String>,
    weight_percent: Option<f64>,
    settings: String,
    students: String,
    objectives: String,
    grids: String,
    created_at: String,
    updated_at: String,
}

fn read_row(row: &Row) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        module_number: row.get(3)?,
        module_prefix: row.get(4)?,
        weight_percent: row.get(5)?,
        settings: row.get(6)?,
        students: row.get(7)?,
        objectives: row.get(8)?,
        grids: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn decode(row: ProjectRow) -> anyhow::Result<Project> {
    Ok(Project {
        module_prefix: row.module_prefix.as_deref().and_then(ModulePrefix::from_code),
        settings: serde_json::from_str(&row.settings)
            .with_context(|| format!("project {} has a malformed settings column", row.id))?,
        students: serde_json::from_str(&row.students)
            .with_context(|| format!("project {} has a malformed students column", row.id))?,
        objectives: serde_json::from_str(&row.objectives)
            .with_context(|| format!("project {} has a malformed objectives column", row.id))?,
        grids: serde_json::from_str(&row.grids)
            .with_context(|| format!("project {} has a malformed grids column", row.id))?,
        id: row.id,
        name: row.name,
        description: row.description,
        module_number: row.module_number,
        weight_percent: row.weight_percent,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
