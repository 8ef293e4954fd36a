use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use tracing::{debug, info};

use crate::cmd::Console;
use crate::output::{
  OutputFormat, format_age, print_error, print_info, print_json, print_stat, print_success, truncate_hash,
};
use crate::prompts::confirm;

#[derive(Subcommand, Debug)]
pub enum SnapshotCommand {
  /// Record the current package set
  Save {
    /// Short human-readable label
    #[arg(short, long)]
    label: Option<String>,

    /// Free-form note stored with the snapshot
    #[arg(short, long)]
    comment: Option<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// List all snapshots, newest first
  List {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Show details of a specific snapshot
  Show {
    /// Snapshot ID to show
    id: String,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Delete snapshots
  Delete {
    /// Snapshot IDs to delete
    #[arg(required = true)]
    ids: Vec<String>,

    /// Skip confirmation prompt
    #[arg(long)]
    force: bool,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

#[derive(Debug, Serialize)]
struct DeleteResult {
  deleted: Vec<String>,
  failed: Vec<DeleteFailure>,
}

#[derive(Debug, Serialize)]
struct DeleteFailure {
  id: String,
  error: String,
}

pub async fn cmd_snapshot(console: &Console, command: SnapshotCommand) -> Result<()> {
  match command {
    SnapshotCommand::Save { label, comment, output } => {
      cmd_save(console, label.as_deref(), comment.as_deref(), output).await
    }
    SnapshotCommand::List { output } => cmd_list(console, output),
    SnapshotCommand::Show { id, output } => cmd_show(console, &id, output),
    SnapshotCommand::Delete { ids, force, output } => cmd_delete(console, ids, force, output),
  }
}

async fn cmd_save(console: &Console, label: Option<&str>, comment: Option<&str>, output: OutputFormat) -> Result<()> {
  let snapshot = console
    .save_snapshot(label, comment)
    .await
    .context("Failed to save snapshot")?;

  if output.is_json() {
    return print_json(&snapshot.metadata());
  }

  print_success(&format!(
    "Saved snapshot {} ({} packages)",
    snapshot.id,
    snapshot.packages.len()
  ));
  Ok(())
}

fn cmd_list(console: &Console, output: OutputFormat) -> Result<()> {
  let snapshots = console.list_snapshots()?;

  if output.is_json() {
    #[derive(Serialize)]
    struct ListOutput<'a> {
      snapshots: &'a [pkgsnap_lib::snapshot::SnapshotMetadata],
    }
    return print_json(&ListOutput { snapshots: &snapshots });
  }

  if snapshots.is_empty() {
    print_info("No snapshots found");
    return Ok(());
  }

  for snapshot in &snapshots {
    let label = snapshot
      .label
      .as_ref()
      .map(|l| format!(" [{}]", l))
      .unwrap_or_default();
    println!(
      "{}{} - {} ({} packages)",
      snapshot.id,
      label,
      format_age(snapshot.created_at),
      snapshot.package_count
    );
  }

  print_info(&format!("{} snapshot(s) total", snapshots.len()));
  Ok(())
}

fn cmd_show(console: &Console, id: &str, output: OutputFormat) -> Result<()> {
  let snapshot = console
    .load_snapshot(id)
    .with_context(|| format!("Failed to load snapshot: {}", id))?;

  if output.is_json() {
    return print_json(&snapshot);
  }

  let metadata = snapshot.metadata();
  println!("Snapshot: {}", snapshot.id);
  if let Some(label) = &snapshot.label {
    print_stat("Label", label);
  }
  if let Some(comment) = &snapshot.comment {
    print_stat("Comment", comment);
  }
  print_stat("Created", &format_age(snapshot.created_at));
  print_stat("Interpreter", &snapshot.interpreter);
  print_stat("Digest", truncate_hash(&metadata.digest));
  print_stat("Packages", &snapshot.packages.len().to_string());

  if !snapshot.packages.is_empty() {
    println!();
    for line in snapshot.packages.requirement_lines() {
      println!("  {}", line);
    }
  }
  if !snapshot.unpinned.is_empty() {
    println!("\nUnpinned (not restorable):");
    for line in &snapshot.unpinned {
      println!("  {}", line);
    }
  }

  Ok(())
}

fn cmd_delete(console: &Console, ids: Vec<String>, force: bool, output: OutputFormat) -> Result<()> {
  if !output.is_json() {
    println!("The following snapshots will be deleted:");
    for id in &ids {
      println!("  {}", id);
    }
  }

  if !confirm(&format!("Delete {} snapshot(s)?", ids.len()), force)? {
    if output.is_json() {
      print_json(&DeleteResult {
        deleted: vec![],
        failed: vec![],
      })?;
    } else {
      print_info("Cancelled");
    }
    return Ok(());
  }

  let mut deleted = Vec::new();
  let mut failed = Vec::new();

  for id in ids {
    debug!(snapshot_id = %id, "deleting snapshot");
    match console.delete_snapshot(&id) {
      Ok(()) => {
        info!(snapshot_id = %id, "deleted snapshot");
        deleted.push(id);
      }
      Err(e) => {
        debug!(snapshot_id = %id, error = %e, "failed to delete snapshot");
        failed.push(DeleteFailure {
          id,
          error: e.to_string(),
        });
      }
    }
  }

  let any_failed = !failed.is_empty();
  if output.is_json() {
    print_json(&DeleteResult { deleted, failed })?;
  } else {
    if !deleted.is_empty() {
      print_success(&format!("Deleted {} snapshot(s)", deleted.len()));
    }
    for f in &failed {
      print_error(&format!("Failed to delete {}: {}", f.id, f.error));
    }
  }

  if any_failed {
    anyhow::bail!("Some snapshots could not be deleted");
  }
  Ok(())
}
