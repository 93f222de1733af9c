use serde_json::json;
use sha2::{Digest, Sha256};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .env_remove("GRADEBOOK_DATA_DIR")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
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
    let req = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", req).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response");
    serde_json::from_str(line.trim()).expect("parse response")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(value["ok"], true, "{} failed: {}", method, value);
    value["result"].clone()
}

#[test]
fn export_then_import_into_fresh_workspace() {
    let src = tempfile::tempdir().expect("src dir");
    let dst = tempfile::tempdir().expect("dst dir");
    let out = tempfile::tempdir().expect("out dir");
    let bundle = out.path().join("gradebook-backup.zip");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (i, r) = (&mut stdin, &mut reader);
    request_ok(i, r, "1", "workspace.select", json!({ "path": src.path().to_string_lossy() }));
    request_ok(
        i,
        r,
        "2",
        "auth.bootstrap",
        json!({ "firstName": "Ms", "lastName": "Frizzle", "username": "frizzle", "password": "bus" }),
    );
    let class = request_ok(i, r, "3", "classes.create", json!({ "name": "Field Trips" }))["classId"]
        .clone();
    let student = request_ok(
        i,
        r,
        "4",
        "students.create",
        json!({ "firstName": "Arnold", "lastName": "Perlstein", "username": "arnold", "password": "rocks" }),
    )["studentId"]
        .clone();
    request_ok(i, r, "5", "classes.enroll", json!({ "classId": class, "studentId": student }));
    let assignment = request_ok(
        i,
        r,
        "6",
        "assignments.create",
        json!({ "classId": class, "name": "Volcano" }),
    )["assignmentId"]
        .clone();
    request_ok(
        i,
        r,
        "7",
        "assignments.grade",
        json!({ "classId": class, "studentId": student, "assignmentId": assignment, "grade": 92.5 }),
    );

    let export = request_ok(
        i,
        r,
        "8",
        "backup.export",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(export["bundleFormat"], "gradebook-workspace-v1");
    assert_eq!(export["fileCount"], 4);

    let file = std::fs::File::open(&bundle).expect("open bundle");
    let mut archive = zip::ZipArchive::new(file).expect("zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    let manifest: serde_json::Value = serde_json::from_str(&manifest).expect("manifest json");
    assert_eq!(manifest["files"].as_array().map(|f| f.len()), Some(4));
    assert!(manifest["files"][0]["sha256"].as_str().is_some_and(|s| s.len() == 64));

    request_ok(i, r, "9", "workspace.select", json!({ "path": dst.path().to_string_lossy() }));
    let imported = request_ok(i, r, "10", "backup.import", json!({ "inPath": bundle.to_string_lossy() }));
    assert_eq!(imported["fileCount"], 4);
    assert_eq!(imported["needsBootstrap"], false);

    let grades = request_ok(
        i,
        r,
        "11",
        "grades.student",
        json!({ "classId": class, "studentId": student }),
    );
    assert_eq!(grades["assignments"][0]["grade"].as_f64(), Some(92.5));
    assert_eq!(grades["average"].as_f64(), Some(92.5));

    for name in ["admins.txt", "students.txt", "classrooms.txt"] {
        assert_eq!(
            std::fs::read(src.path().join(name)).expect("src file"),
            std::fs::read(dst.path().join(name)).expect("dst file"),
            "{name} differs"
        );
    }

    drop(stdin);
    let _ = child.wait();
}

/// Bundle whose checksums all match but whose contents do not load.
fn write_unloadable_bundle(path: &std::path::Path) {
    let files: [(&str, &[u8]); 3] = [
        ("admins.txt", b"Root\nAdmin\nroot\nlnp\n1111111111\n"),
        ("students.txt", b"2\n"),
        ("classrooms.txt", b"0\n"),
    ];
    let manifest = json!({
        "format": "gradebook-workspace-v1",
        "appVersion": "0.0.0",
        "exportedAt": "2024-01-01T00:00:00Z",
        "files": files
            .iter()
            .map(|(name, bytes)| json!({
                "name": name,
                "sha256": format!("{:x}", Sha256::digest(bytes)),
                "bytes": bytes.len(),
            }))
            .collect::<Vec<_>>(),
    });
    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).expect("create bundle"));
    let opts = zip::write::FileOptions::default();
    zip.start_file("manifest.json", opts).expect("manifest entry");
    zip.write_all(manifest.to_string().as_bytes()).expect("write manifest");
    for (name, bytes) in files {
        zip.start_file(format!("data/{name}"), opts).expect("data entry");
        zip.write_all(bytes).expect("write data");
    }
    zip.finish().expect("finish bundle");
}

#[test]
fn unloadable_import_keeps_disk_and_memory() {
    let ws = tempfile::tempdir().expect("ws dir");
    let out = tempfile::tempdir().expect("out dir");
    let bundle = out.path().join("bad.zip");
    write_unloadable_bundle(&bundle);

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let (i, r) = (&mut stdin, &mut reader);
    request_ok(i, r, "1", "workspace.select", json!({ "path": ws.path().to_string_lossy() }));
    request_ok(
        i,
        r,
        "2",
        "auth.bootstrap",
        json!({ "firstName": "Ms", "lastName": "Frizzle", "username": "frizzle", "password": "bus" }),
    );
    request_ok(
        i,
        r,
        "3",
        "students.create",
        json!({ "firstName": "Wanda", "lastName": "Li", "username": "wanda", "password": "w" }),
    );
    let admins_before = std::fs::read(ws.path().join("admins.txt")).expect("admins file");
    let students_before = std::fs::read(ws.path().join("students.txt")).expect("students file");

    let resp = request(i, r, "4", "backup.import", json!({ "inPath": bundle.to_string_lossy() }));
    assert_eq!(resp["ok"], false, "{}", resp);
    assert_eq!(resp["error"]["code"], "malformed_record");

    assert_eq!(std::fs::read(ws.path().join("admins.txt")).expect("admins kept"), admins_before);
    assert_eq!(
        std::fs::read(ws.path().join("students.txt")).expect("students kept"),
        students_before
    );
    let listed = request_ok(i, r, "5", "students.list", json!({}));
    assert_eq!(listed["students"].as_array().map(|a| a.len()), Some(1));

    drop(stdin);
    let _ = child.wait();

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let reopened = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": ws.path().to_string_lossy() }),
    );
    assert_eq!(reopened["studentCount"], 1);
    drop(stdin);
    let _ = child.wait();
}
