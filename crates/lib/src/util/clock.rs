//! Wall-clock helpers and timestamp-derived identifiers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

static LAST_ID_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Seconds since the Unix epoch.
pub fn now_secs() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_secs())
    .unwrap_or(0)
}

fn now_millis() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|d| d.as_millis() as u64)
    .unwrap_or(0)
}

/// Millisecond timestamp that strictly increases across calls in this process.
fn next_unique_millis() -> u64 {
  let now = now_millis();
  let mut last = LAST_ID_MILLIS.load(Ordering::Relaxed);
  loop {
    let next = now.max(last + 1);
    match LAST_ID_MILLIS.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
      Ok(_) => return next,
      Err(actual) => last = actual,
    }
  }
}

/// Generate a compact, sortable id such as `20261016T101500123Z`.
///
/// Ids are unique within a process and sort in creation order.
pub fn timestamp_id() -> String {
  let millis = next_unique_millis();
  let time = UNIX_EPOCH + Duration::from_millis(millis);
  humantime::format_rfc3339_millis(time)
    .to_string()
    .chars()
    .filter(|c| !matches!(c, '-' | ':' | '.'))
    .collect()
}

/// Render Unix seconds as RFC 3339 (`2026-10-16T10:15:00Z`).
pub fn format_timestamp(secs: u64) -> String {
  humantime::format_rfc3339_seconds(UNIX_EPOCH + Duration::from_secs(secs)).to_string()
}

/// Parse an RFC 3339 timestamp back into Unix seconds.
pub fn parse_timestamp(text: &str) -> Option<u64> {
  let time = humantime::parse_rfc3339(text.trim()).ok()?;
  time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}
