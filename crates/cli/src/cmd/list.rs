use anyhow::{Context, Result};
use serde::Serialize;

use crate::cmd::Console;
use crate::output::{OutputFormat, print_info, print_json};

#[derive(Debug, Serialize)]
struct ListOutput {
  count: usize,
  packages: Vec<PackageItem>,
}

#[derive(Debug, Serialize)]
struct PackageItem {
  name: String,
  version: String,
}

pub async fn cmd_list(console: &Console, output: OutputFormat) -> Result<()> {
  let inventory = console
    .refresh_inventory()
    .await
    .context("Failed to read installed packages")?;

  if output.is_json() {
    let packages = inventory
      .iter()
      .map(|p| PackageItem {
        name: p.name.clone(),
        version: p.version.clone(),
      })
      .collect();
    return print_json(&ListOutput {
      count: inventory.len(),
      packages,
    });
  }

  if inventory.is_empty() {
    print_info("No packages installed");
    return Ok(());
  }

  let width = inventory.iter().map(|p| p.name.len()).max().unwrap_or(0);
  for package in inventory.iter() {
    println!("{:width$}  {}", package.name, package.version, width = width);
  }
  print_info(&format!("{} package(s) installed", inventory.len()));

  Ok(())
}
