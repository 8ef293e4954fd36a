use anyhow::{Context, Result};

use crate::cmd::Console;
use crate::output::{OutputFormat, print_info, print_json, print_warning};

pub async fn cmd_plan(console: &Console, snapshot: &str, output: OutputFormat) -> Result<()> {
  let preview = console
    .preview_restore(snapshot)
    .await
    .with_context(|| format!("Failed to plan restore of {}", snapshot))?;

  if output.is_json() {
    return print_json(&preview);
  }

  if preview.plan.is_empty() {
    print_info("Environment already matches snapshot; nothing to do");
    return Ok(());
  }

  println!("Restoring {} would run:", preview.snapshot.id);
  for command in &preview.commands {
    println!("  {}", command);
  }
  if preview.unpinned_count > 0 {
    print_warning(&format!(
      "{} unpinned requirement(s) in the snapshot will be skipped",
      preview.unpinned_count
    ));
  }
  print_info(&format!("{} operation(s)", preview.plan.operations.len()));

  Ok(())
}
