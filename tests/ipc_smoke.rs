use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    fn spawn() -> Self {
        let exe = env!("CARGO_BIN_EXE_gradebookd");
        let mut child = Command::new(exe)
            .args(["--seed", "7"])
            .env_remove("GRADEBOOK_DATA_DIR")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn gradebookd");
        let stdin = child.stdin.take().expect("child stdin");
        let stdout = child.stdout.take().expect("child stdout");
        Self {
            child,
            stdin,
            reader: BufReader::new(stdout),
            next_id: 0,
        }
    }

    fn request(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        self.next_id += 1;
        let id = self.next_id.to_string();
        let payload = json!({ "id": id, "method": method, "params": params });
        writeln!(self.stdin, "{}", payload).expect("write request");
        self.stdin.flush().expect("flush request");

        let mut line = String::new();
        self.reader.read_line(&mut line).expect("read response line");
        assert!(!line.trim().is_empty(), "empty response for {}", method);
        let value: serde_json::Value =
            serde_json::from_str(line.trim()).expect("parse response json");
        assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id.as_str()));
        value
    }

    fn request_ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let value = self.request(method, params);
        assert_eq!(
            value.get("ok").and_then(|v| v.as_bool()),
            Some(true),
            "{} failed: {}",
            method,
            value
        );
        value.get("result").cloned().unwrap_or_default()
    }

    fn request_err(&mut self, method: &str, params: serde_json::Value) -> String {
        let value = self.request(method, params);
        assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
        value["error"]["code"].as_str().unwrap_or("").to_string()
    }

    fn shutdown(mut self) {
        drop(self.stdin);
        let status = self.child.wait().expect("wait for gradebookd");
        assert!(status.success());
    }
}

fn student(first: &str) -> serde_json::Value {
    json!({
        "firstName": first,
        "lastName": "Okafor",
        "username": first.to_ascii_lowercase(),
        "password": format!("{first}-pass"),
    })
}

fn select(sc: &mut Sidecar, dir: &Path) -> serde_json::Value {
    sc.request_ok("workspace.select", json!({ "path": dir.to_string_lossy() }))
}

#[test]
fn grading_flow_survives_restart() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut sc = Sidecar::spawn();

    assert_eq!(sc.request_err("students.list", json!({})), "no_workspace");
    let opened = select(&mut sc, dir.path());
    assert_eq!(opened["needsBootstrap"], true);

    let root = sc.request_ok(
        "auth.bootstrap",
        json!({ "firstName": "Grace", "lastName": "Hopper", "username": "grace", "password": "cobol" }),
    )["adminId"]
        .as_i64()
        .expect("admin id");
    assert!((1_000_000_000..=9_999_999_999).contains(&root));

    let class = sc.request_ok("classes.create", json!({ "name": "Biology" }))["classId"]
        .as_i64()
        .expect("class id");
    let students: Vec<i64> = ["Ada", "Ben", "Cleo"]
        .iter()
        .map(|n| {
            let id = sc.request_ok("students.create", student(n))["studentId"]
                .as_i64()
                .expect("student id");
            sc.request_ok("classes.enroll", json!({ "classId": class, "studentId": id }));
            id
        })
        .collect();

    let lab = sc.request_ok(
        "assignments.create",
        json!({ "classId": class, "name": "Lab Report" }),
    )["assignmentId"]
        .as_i64()
        .expect("assignment id");
    sc.request_ok(
        "assignments.grade",
        json!({ "classId": class, "studentId": students[0], "assignmentId": lab, "grade": 80.0 }),
    );
    sc.request_ok(
        "assignments.grade",
        json!({ "classId": class, "studentId": students[2], "assignmentId": lab, "grade": 90 }),
    );

    let avg = sc.request_ok(
        "assignments.average",
        json!({ "classId": class, "assignmentId": lab }),
    );
    assert_eq!(avg["average"].as_f64(), Some(85.0));
    assert_eq!(avg["ungradedCount"], 1);

    let class_avg = sc.request_ok("classes.average", json!({ "classId": class }));
    assert_eq!(class_avg["rosterSize"], 3);
    assert_eq!(class_avg["average"].as_f64(), Some(170.0 / 3.0));

    assert_eq!(
        sc.request_err("classes.roster", json!({ "classId": 100000 })),
        "not_found"
    );
    assert_eq!(sc.request_err("grades.frobnicate", json!({})), "not_implemented");
    sc.shutdown();

    let mut sc = Sidecar::spawn();
    let reopened = select(&mut sc, dir.path());
    assert_eq!(reopened["needsBootstrap"], false);
    assert_eq!(reopened["studentCount"], 3);
    assert_eq!(
        sc.request_err("auth.login", json!({ "username": "grace", "password": "nope" })),
        "bad_params"
    );
    let login = sc.request_ok("auth.login", json!({ "username": "grace", "password": "cobol" }));
    assert_eq!(login["adminId"].as_i64(), Some(root));

    let grades = sc.request_ok(
        "grades.student",
        json!({ "classId": class, "studentId": students[0] }),
    );
    assert_eq!(grades["assignments"][0]["name"], "Lab Report");
    assert_eq!(grades["assignments"][0]["grade"].as_f64(), Some(80.0));
    let ungraded = sc.request_ok(
        "grades.student",
        json!({ "classId": class, "studentId": students[1] }),
    );
    assert!(ungraded["assignments"][0]["grade"].is_null());
    assert!(ungraded["average"].is_null());

    let assignments_file = dir.path().join(format!("{class}Assignments.txt"));
    assert!(assignments_file.is_file());
    sc.request_ok("classes.delete", json!({ "classId": class }));
    assert!(!assignments_file.exists());
    let list = sc.request_ok("classes.list", json!({}));
    assert_eq!(list["classes"].as_array().map(|a| a.len()), Some(0));
    sc.shutdown();
}

#[test]
fn purge_requires_login_and_keeps_the_acting_admin() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut sc = Sidecar::spawn();
    select(&mut sc, dir.path());
    let root = sc.request_ok(
        "auth.bootstrap",
        json!({ "firstName": "Root", "lastName": "User", "username": "root", "password": "pw" }),
    )["adminId"]
        .as_i64()
        .expect("admin id");
    sc.request_ok(
        "admins.create",
        json!({ "firstName": "Second", "lastName": "User", "username": "second", "password": "pw2" }),
    );
    let class = sc.request_ok("classes.create", json!({ "name": "Drama" }))["classId"]
        .as_i64()
        .expect("class id");
    let s = sc.request_ok("students.create", student("Dana"))["studentId"]
        .as_i64()
        .expect("student id");
    sc.request_ok("classes.enroll", json!({ "classId": class, "studentId": s }));

    assert_eq!(
        sc.request_err("auth.bootstrap", student("Again")),
        "bad_params"
    );

    let purged = sc.request_ok("workspace.purge", json!({}));
    assert_eq!(purged["keptAdminId"].as_i64(), Some(root));
    let admins = sc.request_ok("admins.list", json!({}));
    assert_eq!(admins["admins"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(admins["admins"][0]["classroomCount"], 0);
    let students = sc.request_ok("students.list", json!({}));
    assert_eq!(students["students"].as_array().map(|a| a.len()), Some(0));
    assert!(!dir.path().join(format!("{class}Assignments.txt")).exists());
    sc.shutdown();

    let mut sc = Sidecar::spawn();
    select(&mut sc, dir.path());
    assert_eq!(sc.request_err("workspace.purge", json!({})), "no_session");
    sc.shutdown();
}

#[test]
fn malformed_files_are_reported_with_location() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("students.txt"), "2\n1234567890\nOnly\n").expect("write");
    let mut sc = Sidecar::spawn();
    let resp = sc.request(
        "workspace.select",
        json!({ "path": dir.path().to_string_lossy() }),
    );
    assert_eq!(resp["ok"], false);
    assert_eq!(resp["error"]["code"], "malformed_record");
    assert_eq!(resp["error"]["details"]["line"], 4);
    sc.shutdown();
}

#[test]
fn minus_one_mean_is_reported_as_a_number() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut sc = Sidecar::spawn();
    select(&mut sc, dir.path());
    sc.request_ok(
        "auth.bootstrap",
        json!({ "firstName": "Root", "lastName": "User", "username": "root", "password": "pw" }),
    );
    let class = sc.request_ok("classes.create", json!({ "name": "Physics" }))["classId"]
        .as_i64()
        .expect("class id");
    let s = sc.request_ok("students.create", student("Eve"))["studentId"]
        .as_i64()
        .expect("student id");
    sc.request_ok("classes.enroll", json!({ "classId": class, "studentId": s }));
    for grade in [-3.0, 1.0] {
        let a = sc.request_ok(
            "assignments.create",
            json!({ "classId": class, "name": format!("Quiz {grade}") }),
        )["assignmentId"]
            .as_i64()
            .expect("assignment id");
        sc.request_ok(
            "assignments.grade",
            json!({ "classId": class, "studentId": s, "assignmentId": a, "grade": grade }),
        );
    }

    let grades = sc.request_ok("grades.student", json!({ "classId": class, "studentId": s }));
    assert_eq!(grades["average"].as_f64(), Some(-1.0));
    assert_eq!(grades["gradedCount"], 2);

    let class_avg = sc.request_ok("classes.average", json!({ "classId": class }));
    assert_eq!(class_avg["rosterSize"], 1);
    assert_eq!(class_avg["average"].as_f64(), Some(-1.0));
    assert_eq!(class_avg["students"][0]["average"].as_f64(), Some(-1.0));

    let empty = sc.request_ok("classes.create", json!({ "name": "Empty" }))["classId"]
        .as_i64()
        .expect("class id");
    let empty_avg = sc.request_ok("classes.average", json!({ "classId": empty }));
    assert!(empty_avg["average"].is_null());
    sc.shutdown();
}

#[test]
fn failed_save_keeps_memory_and_next_save_catches_up() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut sc = Sidecar::spawn();
    select(&mut sc, dir.path());
    sc.request_ok(
        "auth.bootstrap",
        json!({ "firstName": "Root", "lastName": "User", "username": "root", "password": "pw" }),
    );
    sc.request_ok("students.create", student("Finn"));

    let students_file = dir.path().join("students.txt");
    std::fs::remove_file(&students_file).expect("remove students file");
    std::fs::create_dir(&students_file).expect("block students file");

    assert_eq!(
        sc.request_err("students.create", student("Gail")),
        "persist_failed"
    );
    let listed = sc.request_ok("students.list", json!({}));
    let names: Vec<&str> = listed["students"]
        .as_array()
        .expect("students array")
        .iter()
        .filter_map(|s| s["firstName"].as_str())
        .collect();
    assert!(names.contains(&"Gail"), "{listed}");

    std::fs::remove_dir(&students_file).expect("unblock students file");
    sc.request_ok("students.create", student("Hana"));
    let text = std::fs::read_to_string(&students_file).expect("students file rewritten");
    assert_eq!(text.lines().next(), Some("3"));
    assert!(text.lines().any(|l| l == "Gail"));
    sc.shutdown();

    let mut sc = Sidecar::spawn();
    assert_eq!(select(&mut sc, dir.path())["studentCount"], 3);
    sc.shutdown();
}
