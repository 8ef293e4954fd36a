use serial_test::serial;

use super::common::TestEnv;

#[test]
#[serial]
fn test_diff_against_current() {
  let env = TestEnv::new(&[("a", "1"), ("b", "1"), ("c", "1")]);
  let id = env.save_snapshot("before");
  env.set_packages(&[("a", "2"), ("c", "1"), ("d", "1")]);

  let stdout = env.run_ok(&["diff", &id]);
  assert!(stdout.contains(&format!("Comparing current → {}", id)));
  assert!(stdout.contains("+ b==1"));
  assert!(stdout.contains("- d==1"));
  assert!(stdout.contains("~ a 2 → 1"));
  assert!(stdout.contains("1 added, 1 removed, 1 changed, 1 unchanged"));
}

#[test]
#[serial]
fn test_diff_no_changes() {
  let env = TestEnv::new(&[("six", "1.16.0")]);
  let id = env.save_snapshot("same");

  let stdout = env.run_ok(&["diff", &id]);
  assert!(stdout.contains("No changes."));
}

#[test]
#[serial]
fn test_diff_between_snapshots_json() {
  let env = TestEnv::new(&[("six", "1.16.0")]);
  let first = env.save_snapshot("first");
  env.set_packages(&[("six", "1.17.0"), ("idna", "3.6")]);
  let second = env.save_snapshot("second");

  let stdout = env.run_ok(&["diff", &first, &second, "-o", "json"]);
  let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
  assert_eq!(parsed["source"].as_str(), Some(first.as_str()));
  assert_eq!(parsed["target"].as_str(), Some(second.as_str()));
  assert_eq!(parsed["diff"]["added"][0]["name"], "idna");
  assert_eq!(parsed["diff"]["changed"][0]["old_version"], "1.16.0");
  assert_eq!(parsed["diff"]["changed"][0]["new_version"], "1.17.0");
  assert!(parsed["diff"]["removed"].as_array().unwrap().is_empty());
}

#[test]
#[serial]
fn test_plan_lists_commands_in_order() {
  let env = TestEnv::new(&[("a", "1"), ("b", "1"), ("c", "1")]);
  let id = env.save_snapshot("before");
  env.set_packages(&[("a", "2"), ("c", "1"), ("d", "1")]);

  let stdout = env.run_ok(&["plan", &id]);
  let commands: Vec<&str> = stdout
    .lines()
    .filter(|l| l.contains(" -m pip "))
    .map(|l| l.split(" -m pip ").nth(1).unwrap())
    .collect();
  assert_eq!(commands, vec!["uninstall -y d", "install a==1", "install b==1"]);

  assert_eq!(env.packages(), vec!["a==2", "c==1", "d==1"]);
}

#[test]
#[serial]
fn test_plan_json_after_restore_is_empty() {
  let env = TestEnv::new(&[("a", "1")]);
  let id = env.save_snapshot("before");
  env.set_packages(&[]);

  env.run_ok(&["restore", &id, "--force"]);

  let stdout = env.run_ok(&["plan", &id, "-o", "json"]);
  let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON");
  assert!(parsed["plan"]["operations"].as_array().unwrap().is_empty());
  assert!(parsed["commands"].as_array().unwrap().is_empty());
}

#[test]
#[serial]
fn test_diff_unknown_snapshot_fails() {
  let env = TestEnv::new(&[]);

  env
    .pkgsnap_cmd()
    .args(["diff", "20260101T000000000Z"])
    .assert()
    .failure();
}
