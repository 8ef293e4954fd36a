//! Diff command implementation.
//!
//! Shows what restoring a snapshot would change in the live environment, or
//! how two snapshots differ.

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

use pkgsnap_lib::snapshot::PackageDiff;

use crate::cmd::Console;
use crate::output::{OutputFormat, print_json, symbols};

#[derive(Serialize)]
struct DiffOutput<'a> {
  source: &'a str,
  target: &'a str,
  diff: &'a PackageDiff,
}

pub async fn cmd_diff(
  console: &Console,
  snapshot: &str,
  other: Option<&str>,
  show_unchanged: bool,
  output: OutputFormat,
) -> Result<()> {
  let (source, target, diff) = match other {
    Some(other) => {
      let diff = console
        .diff_snapshots(snapshot, other)
        .with_context(|| format!("Failed to compare {} with {}", snapshot, other))?;
      (snapshot, other, diff)
    }
    None => {
      let diff = console
        .diff_snapshot_vs_current(snapshot)
        .await
        .with_context(|| format!("Failed to compare current environment with {}", snapshot))?;
      ("current", snapshot, diff)
    }
  };

  if output.is_json() {
    return print_json(&DiffOutput {
      source,
      target,
      diff: &diff,
    });
  }

  print_human_diff(source, target, &diff, show_unchanged);
  Ok(())
}

fn print_human_diff(source: &str, target: &str, diff: &PackageDiff, show_unchanged: bool) {
  println!("Comparing {} {} {}", source, symbols::ARROW, target);
  println!();

  if diff.is_empty() {
    println!("No changes.");
    if show_unchanged {
      print_unchanged(diff);
    }
    return;
  }

  for record in &diff.added {
    println!(
      "  {} {}",
      symbols::ADD.if_supports_color(Stream::Stdout, |s| s.green()),
      record.requirement()
    );
  }
  for record in &diff.removed {
    println!(
      "  {} {}",
      symbols::REMOVE.if_supports_color(Stream::Stdout, |s| s.red()),
      record.requirement()
    );
  }
  for change in &diff.changed {
    println!(
      "  {} {} {} {} {}",
      symbols::MODIFY.if_supports_color(Stream::Stdout, |s| s.yellow()),
      change.name,
      change.old_version,
      symbols::ARROW,
      change.new_version
    );
  }

  if show_unchanged {
    print_unchanged(diff);
  }

  println!();
  println!(
    "{} added, {} removed, {} changed, {} unchanged",
    diff.added.len(),
    diff.removed.len(),
    diff.changed.len(),
    diff.unchanged.len()
  );
}

fn print_unchanged(diff: &PackageDiff) {
  for record in &diff.unchanged {
    println!(
      "    {}",
      record.requirement().if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
  }
}
