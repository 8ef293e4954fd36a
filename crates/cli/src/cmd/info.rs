use anyhow::Result;
use serde::Serialize;

use pkgsnap_lib::Config;

use crate::cmd::Console;
use crate::output::{OutputFormat, print_json, print_stat, print_warning};

#[derive(Debug, Serialize)]
struct InfoOutput {
  python: String,
  interpreter: Option<String>,
  snapshots_dir: String,
  jobs_dir: String,
  audit_log: String,
  snapshot_count: usize,
}

pub async fn cmd_info(console: &Console, config: &Config, output: OutputFormat) -> Result<()> {
  let interpreter = match console.interpreter_info().await {
    Ok(info) => Some(info),
    Err(e) => {
      if !output.is_json() {
        print_warning(&format!("Interpreter unavailable: {}", e));
      }
      None
    }
  };
  let snapshot_count = console.list_snapshots()?.len();

  let info = InfoOutput {
    python: config.python.display().to_string(),
    interpreter,
    snapshots_dir: config.snapshots_dir().display().to_string(),
    jobs_dir: config.jobs_dir().display().to_string(),
    audit_log: config.audit_path().display().to_string(),
    snapshot_count,
  };

  if output.is_json() {
    return print_json(&info);
  }

  println!("Environment:");
  print_stat("Python", &info.python);
  print_stat("Interpreter", info.interpreter.as_deref().unwrap_or("unavailable"));
  println!("Storage:");
  print_stat("Snapshots", &format!("{} ({})", info.snapshots_dir, info.snapshot_count));
  print_stat("Job logs", &info.jobs_dir);
  print_stat("Audit log", &info.audit_log);

  Ok(())
}
