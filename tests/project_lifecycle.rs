use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}-{}",
        prefix,
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar(data_dir: &Path) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_evalbookd");
    let mut child = Command::new(exe)
        .env("EVALBOOK_DATA_DIR", data_dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn evalbookd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn result(value: &serde_json::Value) -> &serde_json::Value {
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "request failed: {}",
        value
    );
    value.get("result").expect("result")
}

#[test]
fn create_derives_module_code_from_the_name() {
    let data_dir = temp_dir("evalbook-lifecycle-create").join("evalbook");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&data_dir);

    let created = request(
        &mut stdin,
        &mut reader,
        "1",
        "projects.create",
        json!({ "name": "b231 Datenschutz", "description": "" }),
    );
    let project = result(&created).get("project").expect("project");
    assert_eq!(
        project.get("moduleNumber").and_then(|v| v.as_str()),
        Some("231")
    );
    assert_eq!(
        project.get("modulePrefix").and_then(|v| v.as_str()),
        Some("B")
    );
    assert_eq!(
        project.get("weightPercent").and_then(|v| v.as_f64()),
        Some(0.2)
    );
    assert_eq!(
        project
            .get("settings")
            .and_then(|s| s.get("moduleName"))
            .and_then(|v| v.as_str()),
        Some("b231 Datenschutz")
    );

    let created = request(
        &mut stdin,
        &mut reader,
        "2",
        "projects.create",
        json!({ "name": "Projektwoche 2024" }),
    );
    let project = result(&created).get("project").expect("project");
    assert!(project.get("moduleNumber").expect("field").is_null());
    assert!(project.get("modulePrefix").expect("field").is_null());
    assert!(project.get("weightPercent").expect("field").is_null());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(data_dir.parent().expect("parent"));
}

#[test]
fn list_is_ordered_by_recency_and_update_moves_to_front() {
    let data_dir = temp_dir("evalbook-lifecycle-order").join("evalbook");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&data_dir);

    let mut ids = Vec::new();
    for (i, name) in ["first", "second", "third"].iter().enumerate() {
        let created = request(
            &mut stdin,
            &mut reader,
            &format!("c{}", i),
            "projects.create",
            json!({ "name": name }),
        );
        ids.push(
            result(&created)
                .get("project")
                .and_then(|p| p.get("id"))
                .and_then(|v| v.as_str())
                .expect("id")
                .to_string(),
        );
    }

    let fetched = request(
        &mut stdin,
        &mut reader,
        "g1",
        "projects.get",
        json!({ "projectId": ids[0] }),
    );
    let project = result(&fetched).get("project").expect("project").clone();
    let _ = request(
        &mut stdin,
        &mut reader,
        "u1",
        "projects.update",
        json!({ "project": project }),
    );

    let listed = request(&mut stdin, &mut reader, "l1", "projects.list", json!({}));
    let order: Vec<String> = result(&listed)
        .get("projects")
        .and_then(|v| v.as_array())
        .expect("projects")
        .iter()
        .map(|p| p.get("id").and_then(|v| v.as_str()).expect("id").to_string())
        .collect();
    assert_eq!(order, vec![ids[0].clone(), ids[2].clone(), ids[1].clone()]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(data_dir.parent().expect("parent"));
}

#[test]
fn update_ignores_caller_supplied_timestamps() {
    let data_dir = temp_dir("evalbook-lifecycle-stamp").join("evalbook");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&data_dir);

    let created = request(
        &mut stdin,
        &mut reader,
        "1",
        "projects.create",
        json!({ "name": "Modul 117" }),
    );
    let mut project = result(&created).get("project").expect("project").clone();
    let project_id = project
        .get("id")
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();
    project["updatedAt"] = json!("1999-01-01T00:00:00.000000Z");

    let updated = request(
        &mut stdin,
        &mut reader,
        "2",
        "projects.update",
        json!({ "project": project }),
    );
    let stamped = result(&updated)
        .get("updatedAt")
        .and_then(|v| v.as_str())
        .expect("updatedAt")
        .to_string();
    assert!(stamped.starts_with("20"), "server stamp expected: {stamped}");

    let fetched = request(
        &mut stdin,
        &mut reader,
        "3",
        "projects.get",
        json!({ "projectId": project_id }),
    );
    assert_eq!(
        result(&fetched)
            .get("project")
            .and_then(|p| p.get("updatedAt"))
            .and_then(|v| v.as_str()),
        Some(stamped.as_str())
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(data_dir.parent().expect("parent"));
}

#[test]
fn duplicate_copies_content_by_value() {
    let data_dir = temp_dir("evalbook-lifecycle-dup").join("evalbook");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&data_dir);

    let created = request(
        &mut stdin,
        &mut reader,
        "1",
        "projects.create",
        json!({ "name": "A 117 Netzwerke" }),
    );
    let mut project = result(&created).get("project").expect("project").clone();
    let source_id = project
        .get("id")
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();
    project["students"] = json!([
        { "id": "s1", "firstName": "Mia", "lastName": "Muster" }
    ]);
    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "projects.update",
        json!({ "project": project }),
    );

    let duplicated = request(
        &mut stdin,
        &mut reader,
        "3",
        "projects.duplicate",
        json!({ "projectId": source_id }),
    );
    let mut copy = result(&duplicated).get("project").expect("project").clone();
    let copy_id = copy
        .get("id")
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();
    assert_ne!(copy_id, source_id);
    assert_eq!(
        copy.get("name").and_then(|v| v.as_str()),
        Some("A 117 Netzwerke (copy)")
    );
    assert_eq!(
        copy.get("students").and_then(|v| v.as_array()).map(Vec::len),
        Some(1)
    );

    // Emptying the copy's roster must not touch the source.
    copy["students"] = json!([]);
    let _ = request(
        &mut stdin,
        &mut reader,
        "4",
        "projects.update",
        json!({ "project": copy }),
    );
    let fetched = request(
        &mut stdin,
        &mut reader,
        "5",
        "projects.get",
        json!({ "projectId": source_id }),
    );
    assert_eq!(
        result(&fetched)
            .get("project")
            .and_then(|p| p.get("students"))
            .and_then(|v| v.as_array())
            .map(Vec::len),
        Some(1)
    );

    let missing = request(
        &mut stdin,
        &mut reader,
        "6",
        "projects.duplicate",
        json!({ "projectId": "does-not-exist" }),
    );
    assert_eq!(
        missing
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("not_found")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(data_dir.parent().expect("parent"));
}

#[test]
fn delete_removes_the_project() {
    let data_dir = temp_dir("evalbook-lifecycle-delete").join("evalbook");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&data_dir);

    let created = request(
        &mut stdin,
        &mut reader,
        "1",
        "projects.create",
        json!({ "name": "Modul 320" }),
    );
    let project_id = result(&created)
        .get("project")
        .and_then(|p| p.get("id"))
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();

    let _ = request(
        &mut stdin,
        &mut reader,
        "2",
        "projects.open",
        json!({ "projectId": project_id }),
    );
    let _ = request(
        &mut stdin,
        &mut reader,
        "3",
        "projects.delete",
        json!({ "projectId": project_id }),
    );
    let fetched = request(
        &mut stdin,
        &mut reader,
        "4",
        "projects.get",
        json!({ "projectId": project_id }),
    );
    assert!(result(&fetched).get("project").expect("field").is_null());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(data_dir.parent().expect("parent"));
}
