use serial_test::serial;

use super::common::TestEnv;

#[test]
#[serial]
fn test_install_pinned_version() {
  let env = TestEnv::new(&[("idna", "3.6")]);

  let stdout = env.run_ok(&["install", "requests", "--version", "2.31.0"]);
  assert!(stdout.contains("==> install requests==2.31.0"));
  assert!(stdout.contains("Successfully installed requests-2.31.0"));
  assert!(stdout.contains("post-check: inventory refreshed (2 packages)"));
  assert!(stdout.contains("install succeeded"));

  assert_eq!(env.packages(), vec!["idna==3.6", "requests==2.31.0"]);
}

#[test]
#[serial]
fn test_upgrade_installs_latest() {
  let env = TestEnv::new(&[("attrs", "22.0")]);

  env.run_ok(&["upgrade", "attrs"]);

  assert_eq!(env.packages(), vec!["attrs==99.0"]);
}

#[test]
#[serial]
fn test_uninstall_multiple() {
  let env = TestEnv::new(&[("six", "1.16.0"), ("idna", "3.6"), ("attrs", "22.0")]);

  let stdout = env.run_ok(&["uninstall", "six", "idna", "--force"]);
  assert!(stdout.contains("2 operation(s)"));

  assert_eq!(env.packages(), vec!["attrs==22.0"]);
}

#[test]
#[serial]
fn test_uninstall_requires_force_when_not_interactive() {
  let env = TestEnv::new(&[("six", "1.16.0")]);

  env.pkgsnap_cmd().args(["uninstall", "six"]).assert().failure();

  assert_eq!(env.packages(), vec!["six==1.16.0"]);
}

#[test]
#[serial]
fn test_failed_install_reports_reason_and_output() {
  let env = TestEnv::new(&[("idna", "3.6")]);

  let output = env
    .pkgsnap_cmd()
    .args(["install", "broken-pkg", "--version", "1.0"])
    .output()
    .unwrap();
  assert_eq!(output.status.code(), Some(1));

  let stdout = String::from_utf8_lossy(&output.stdout);
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("ERROR: No matching distribution found for broken-pkg==1.0"));
  assert!(stderr.contains("failed after 0 of 1 operation(s)"));
  assert!(stderr.contains("install broken-pkg==1.0 exited with status 1"));
  assert!(stdout.contains("post-check: broken-pkg is not installed"));

  assert_eq!(env.packages(), vec!["idna==3.6"]);
}

#[test]
#[serial]
fn test_restore_converges_on_snapshot() {
  let env = TestEnv::new(&[("a", "1"), ("b", "1"), ("c", "1")]);
  let id = env.save_snapshot("before");

  env.set_packages(&[("a", "2"), ("c", "1"), ("d", "1")]);

  let stdout = env.run_ok(&["restore", &id, "--force"]);
  let uninstall_d = stdout.find("==> uninstall d").expect("uninstall d ran");
  let install_a = stdout.find("==> install a==1").expect("install a ran");
  let install_b = stdout.find("==> install b==1").expect("install b ran");
  assert!(uninstall_d < install_a && install_a < install_b);
  assert!(stdout.contains("batch-restore succeeded (3 operation(s)"));

  assert_eq!(env.packages(), vec!["a==1", "b==1", "c==1"]);

  let stdout = env.run_ok(&["restore", &id, "--force"]);
  assert!(stdout.contains("nothing to do"));
}

#[test]
#[serial]
fn test_restore_requires_force_when_not_interactive() {
  let env = TestEnv::new(&[("a", "1")]);
  let id = env.save_snapshot("before");
  env.set_packages(&[("a", "2")]);

  let output = env.pkgsnap_cmd().args(["restore", &id]).output().unwrap();
  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stdout).contains("-m pip install a==1"));

  assert_eq!(env.packages(), vec!["a==2"]);
}

#[test]
#[serial]
fn test_failed_restore_stops_at_first_failure() {
  let env = TestEnv::new(&[("broken-dep", "1"), ("zlib-ng", "1")]);
  let id = env.save_snapshot("before");
  env.set_packages(&[("extra", "1")]);

  let output = env
    .pkgsnap_cmd()
    .args(["restore", &id, "--force"])
    .output()
    .unwrap();
  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("failed after 1 of 3 operation(s)"));

  assert!(env.packages().is_empty());
}

#[test]
#[serial]
fn test_jobs_write_log_and_audit_journal() {
  let env = TestEnv::new(&[]);

  env.run_ok(&["install", "requests", "--version", "2.31.0"]);

  let logs: Vec<_> = std::fs::read_dir(env.data_path().join("jobs"))
    .unwrap()
    .map(|e| e.unwrap().path())
    .collect();
  assert_eq!(logs.len(), 1);
  let log = std::fs::read_to_string(&logs[0]).unwrap();
  assert!(log.contains("kind=install operations=1"));
  assert!(log.contains("[1/1] stdout: Successfully installed requests-2.31.0"));
  assert!(log.ends_with("# status: succeeded\n"));

  let audit = std::fs::read_to_string(env.data_path().join("audit.jsonl")).unwrap();
  let lines: Vec<&str> = audit.lines().collect();
  assert_eq!(lines.len(), 1);
  let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
  assert_eq!(record["action"], "install");
  assert_eq!(record["package"], "requests");
  assert_eq!(record["version"], "2.31.0");
  assert_eq!(record["outcome"], "succeeded");
  assert_eq!(record["exit_code"], 0);
  assert_eq!(record["interpreter"], "CPython 3.12.1 (linux, venv)");
}
