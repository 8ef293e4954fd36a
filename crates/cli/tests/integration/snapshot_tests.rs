use serial_test::serial;

use super::common::TestEnv;

#[test]
#[serial]
fn test_snapshot_list_empty() {
  let env = TestEnv::new(&[]);

  let output = env.pkgsnap_cmd().args(["snapshot", "list"]).output().unwrap();
  assert!(output.status.success());
  let stdout = String::from_utf8_lossy(&output.stdout);
  assert!(stdout.contains("No snapshots"));
}

#[test]
#[serial]
fn test_snapshot_save_and_list() {
  let env = TestEnv::new(&[("requests", "2.31.0"), ("idna", "3.6")]);

  let stdout = env.run_ok(&["snapshot", "save", "--label", "baseline"]);
  assert!(stdout.contains("Saved snapshot"));
  assert!(stdout.contains("(2 packages)"));

  let stdout = env.run_ok(&["snapshot", "list"]);
  assert!(stdout.contains("[baseline]"));
  assert!(stdout.contains("1 snapshot(s) total"));
}

#[test]
#[serial]
fn test_snapshot_list_json_newest_first() {
  let env = TestEnv::new(&[("six", "1.16.0")]);
  let first = env.save_snapshot("first");
  env.set_packages(&[("six", "1.17.0")]);
  let second = env.save_snapshot("second");

  let stdout = env.run_ok(&["snapshot", "list", "-o", "json"]);
  let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
  let ids: Vec<&str> = parsed["snapshots"]
    .as_array()
    .unwrap()
    .iter()
    .map(|s| s["id"].as_str().unwrap())
    .collect();
  assert_eq!(ids, vec![second.as_str(), first.as_str()]);
  assert_eq!(parsed["snapshots"][0]["package_count"], 1);
}

#[test]
#[serial]
fn test_snapshot_record_is_requirements_file() {
  let env = TestEnv::new(&[("requests", "2.31.0"), ("idna", "3.6")]);
  let id = env.save_snapshot("pinned");

  let record = std::fs::read_to_string(env.data_path().join("snapshots").join(format!("{}.txt", id))).unwrap();
  let requirements: Vec<&str> = record.lines().filter(|l| !l.starts_with('#')).collect();
  assert_eq!(requirements, vec!["idna==3.6", "requests==2.31.0"]);
  assert!(record.contains("# label: pinned"));
  assert!(record.contains("# interpreter: CPython 3.12.1 (linux, venv)"));
}

#[test]
#[serial]
fn test_snapshot_show() {
  let env = TestEnv::new(&[("requests", "2.31.0")]);
  let id = env.save_snapshot("show-me");

  let stdout = env.run_ok(&["snapshot", "show", &id]);
  assert!(stdout.contains("Snapshot:"));
  assert!(stdout.contains(&id));
  assert!(stdout.contains("requests==2.31.0"));
  assert!(stdout.contains("CPython 3.12.1"));
}

#[test]
#[serial]
fn test_snapshot_show_json() {
  let env = TestEnv::new(&[("requests", "2.31.0")]);
  let id = env.save_snapshot("json");

  let stdout = env.run_ok(&["snapshot", "show", &id, "-o", "json"]);
  let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
  assert_eq!(parsed["id"].as_str(), Some(id.as_str()));
  assert_eq!(parsed["label"].as_str(), Some("json"));
}

#[test]
#[serial]
fn test_snapshot_show_unknown_fails() {
  let env = TestEnv::new(&[]);

  env
    .pkgsnap_cmd()
    .args(["snapshot", "show", "20260101T000000000Z"])
    .assert()
    .failure();
}

#[test]
#[serial]
fn test_snapshot_delete() {
  let env = TestEnv::new(&[("six", "1.16.0")]);
  let id = env.save_snapshot("doomed");

  let stdout = env.run_ok(&["snapshot", "delete", &id, "--force"]);
  assert!(stdout.contains("Deleted 1 snapshot(s)"));

  let stdout = env.run_ok(&["snapshot", "list"]);
  assert!(stdout.contains("No snapshots"));
}

#[test]
#[serial]
fn test_snapshot_delete_requires_force_when_not_interactive() {
  let env = TestEnv::new(&[("six", "1.16.0")]);
  let id = env.save_snapshot("kept");

  let output = env.pkgsnap_cmd().args(["snapshot", "delete", &id]).output().unwrap();
  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

  let stdout = env.run_ok(&["snapshot", "list"]);
  assert!(stdout.contains(&id));
}

#[test]
#[serial]
fn test_snapshot_delete_unknown_reports_failure() {
  let env = TestEnv::new(&[]);

  let output = env
    .pkgsnap_cmd()
    .args(["snapshot", "delete", "20260101T000000000Z", "--force", "-o", "json"])
    .output()
    .unwrap();
  assert!(!output.status.success());

  let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
  assert_eq!(parsed["deleted"].as_array().unwrap().len(), 0);
  assert_eq!(parsed["failed"][0]["id"].as_str(), Some("20260101T000000000Z"));
}
