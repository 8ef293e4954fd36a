use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal, Write};

/// Ask a yes/no question on stderr; `force` answers yes without asking.
///
/// Fails when there is no terminal to ask on, so scripted runs must pass
/// `--force` to mutate anything.
pub fn confirm(message: &str, force: bool) -> Result<bool> {
  if force {
    return Ok(true);
  }

  if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
    bail!("Cannot prompt for confirmation in non-interactive mode. Use --force to proceed.");
  }

  ask(message, &mut io::stdin().lock(), &mut io::stderr())
}

fn ask(message: &str, input: &mut impl BufRead, prompt: &mut impl Write) -> Result<bool> {
  write!(prompt, "{} [y/N] ", message)?;
  prompt.flush()?;

  let mut answer = String::new();
  input.read_line(&mut answer)?;

  Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
  matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
