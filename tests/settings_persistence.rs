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
fn settings_survive_a_restart_without_being_reseeded() {
    let data_dir = temp_dir("evalbook-settings").join("evalbook");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar(&data_dir);

        let fetched = request(&mut stdin, &mut reader, "1", "settings.get", json!({}));
        let mut settings = result(&fetched).get("settings").expect("settings").clone();
        assert_eq!(
            settings.get("testIdentifier").and_then(|v| v.as_str()),
            Some("EP1")
        );
        assert_eq!(
            settings.get("passThreshold").and_then(|v| v.as_f64()),
            Some(4.0)
        );

        settings["correctorName"] = json!("R. Keller");
        settings["schoolName"] = json!("BBZ");
        let _ = result(&request(
            &mut stdin,
            &mut reader,
            "2",
            "settings.set",
            json!({ "settings": settings }),
        ));

        drop(stdin);
        let _ = child.wait();
    }

    // The seed step on the next start must not clobber the stored record.
    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar(&data_dir);
        let fetched = request(&mut stdin, &mut reader, "1", "settings.get", json!({}));
        let settings = result(&fetched).get("settings").expect("settings");
        assert_eq!(
            settings.get("correctorName").and_then(|v| v.as_str()),
            Some("R. Keller")
        );
        assert_eq!(
            settings.get("schoolName").and_then(|v| v.as_str()),
            Some("BBZ")
        );
        drop(stdin);
        let _ = child.wait();
    }

    let _ = std::fs::remove_dir_all(data_dir.parent().expect("parent"));
}
