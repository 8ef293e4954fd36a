//! Shared test helpers for CLI integration tests.

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Stand-in for `python`: answers the interpreter probe and the pip
/// subcommands pkgsnap uses, keeping `name==version` lines in
/// `$PKGSNAP_FAKE_STATE`.
///
/// Installing a package whose name starts with `broken` fails the way pip
/// does when no distribution matches. `--upgrade` installs version 99.0.
const FAKE_PYTHON: &str = r#"#!/bin/sh
state="$PKGSNAP_FAKE_STATE"

if [ "$1" = "-c" ]; then
  echo "CPython 3.12.1 (linux, venv)"
  exit 0
fi

for arg; do target="$arg"; done

case "$3" in
  list)
    printf '['
    sed -e 's/^\(.*\)==\(.*\)$/{"name": "\1", "version": "\2"}/' "$state" | paste -sd, -
    printf ']\n'
    ;;
  freeze)
    cat "$state"
    ;;
  install)
    case " $* " in
      *" --upgrade "*) name="$target"; version="99.0" ;;
      *) name="${target%%==*}"; version="${target#*==}" ;;
    esac
    case "$name" in
      broken*)
        echo "ERROR: No matching distribution found for $target" >&2
        exit 1
        ;;
    esac
    grep -iv "^$name==" "$state" > "$state.tmp" || true
    echo "$name==$version" >> "$state.tmp"
    mv "$state.tmp" "$state"
    echo "Successfully installed $name-$version"
    ;;
  uninstall)
    if ! grep -qi "^$target==" "$state"; then
      echo "WARNING: Skipping $target as it is not installed." >&2
      exit 0
    fi
    grep -iv "^$target==" "$state" > "$state.tmp" || true
    mv "$state.tmp" "$state"
    echo "Successfully uninstalled $target"
    ;;
  *)
    echo "unsupported: $*" >&2
    exit 2
    ;;
esac
"#;

/// Isolated test environment.
///
/// Each test gets its own temporary directory holding the fake interpreter,
/// its package state and the pkgsnap data directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  /// Create an environment with `packages` installed.
  pub fn new(packages: &[(&str, &str)]) -> Self {
    let temp = TempDir::new().unwrap();
    let env = Self { temp };

    let python = env.python_path();
    std::fs::write(&python, FAKE_PYTHON).unwrap();
    std::fs::set_permissions(&python, std::fs::Permissions::from_mode(0o755)).unwrap();

    env.set_packages(packages);
    env
  }

  pub fn python_path(&self) -> PathBuf {
    self.temp.path().join("python")
  }

  pub fn state_path(&self) -> PathBuf {
    self.temp.path().join("installed.txt")
  }

  /// Data path for snapshots, job logs and the audit journal.
  pub fn data_path(&self) -> PathBuf {
    let p = self.temp.path().join("data");
    std::fs::create_dir_all(&p).unwrap();
    dunce::canonicalize(&p).unwrap_or(p)
  }

  /// Replace the installed package set.
  pub fn set_packages(&self, packages: &[(&str, &str)]) {
    let content: String = packages
      .iter()
      .map(|(name, version)| format!("{}=={}\n", name, version))
      .collect();
    std::fs::write(self.state_path(), content).unwrap();
  }

  /// Installed packages as sorted `name==version` lines.
  pub fn packages(&self) -> Vec<String> {
    let content = std::fs::read_to_string(self.state_path()).unwrap();
    let mut lines: Vec<String> = content
      .lines()
      .filter(|l| !l.is_empty())
      .map(str::to_string)
      .collect();
    lines.sort();
    lines
  }

  /// Get a pre-configured Command for the pkgsnap binary.
  ///
  /// Sets environment variables for isolated testing:
  /// - `PKGSNAP_PYTHON`: the fake interpreter
  /// - `PKGSNAP_DATA_DIR`: isolated data path
  /// - `PKGSNAP_FAKE_STATE`: package state read and written by the fake interpreter
  pub fn pkgsnap_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("pkgsnap");
    cmd.env("PKGSNAP_PYTHON", self.python_path());
    cmd.env("PKGSNAP_DATA_DIR", self.data_path());
    cmd.env("PKGSNAP_FAKE_STATE", self.state_path());
    cmd.env_remove("PKGSNAP_MAX_QUEUED_JOBS");
    cmd.env_remove("PKGSNAP_OPERATION_TIMEOUT");
    cmd
  }

  /// Run a command that must succeed and return its stdout.
  pub fn run_ok(&self, args: &[&str]) -> String {
    let output = self.pkgsnap_cmd().args(args).output().unwrap();
    assert!(
      output.status.success(),
      "{:?} failed: {}",
      args,
      String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
  }

  /// Save a snapshot and return its id.
  pub fn save_snapshot(&self, label: &str) -> String {
    let stdout = self.run_ok(&["snapshot", "save", "--label", label, "-o", "json"]);
    let metadata: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    metadata["id"].as_str().unwrap().to_string()
  }
}
