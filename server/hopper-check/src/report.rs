//! Render summaries and outcomes for people and for machines.

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::error::CheckError;
use crate::types::{ControllerSummary, Outcome, OutcomeKind, Window};

const NO_VALUE: &str = "-";

/// Epoch milliseconds to UTC. Out-of-range values clamp to the epoch.
pub fn timestamp(ms: i64) -> DateTime<Utc> {
  DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

/// Header lines of the text report.
pub fn header(window: Option<&Window>) -> Vec<String> {
  let span = match window {
    Some(w) => format!(
      "{} to {}",
      w.start.format("%Y-%b-%d %H:%M:%S"),
      w.end.format("%Y-%b-%d %H:%M:%S")
    ),
    None => "no events".to_string(),
  };
  vec![
    "Feeder Summary".to_string(),
    format!("{span}\n"),
    row("controller", "feeder", "error", "count"),
    "-".repeat(35),
  ]
}

/// Table rows for one controller.
pub fn summary_lines(summary: &ControllerSummary) -> Vec<String> {
  let controller = summary.controller.as_deref().unwrap_or(NO_VALUE);
  summary
    .rows
    .iter()
    .map(|r| {
      row(
        controller,
        r.hopper_id.as_deref().unwrap_or(NO_VALUE),
        r.kind.as_str(),
        &r.count.to_string(),
      )
    })
    .collect()
}

/// Full text table: header followed by every controller's rows.
pub fn render_table(summaries: &[ControllerSummary], window: Option<&Window>) -> String {
  let mut lines = header(window);
  for summary in summaries {
    lines.extend(summary_lines(summary));
  }
  lines.join("\n")
}

/// One JSON object per controller, one per line.
pub fn write_json_lines<W: Write>(out: &mut W, summaries: &[ControllerSummary]) -> Result<(), CheckError> {
  for summary in summaries {
    serde_json::to_writer(&mut *out, summary)?;
    writeln!(out)?;
  }
  Ok(())
}

/// One-line diagnostic for a detected problem, e.g.
/// `2014-09-11 14:02:23.000: error switch bounce 2 (250.000000 ms)`.
pub fn describe(outcome: &Outcome) -> String {
  let ts = timestamp(outcome.time).format("%Y-%m-%d %H:%M:%S%.3f");
  let hopper = outcome.hopper_id.as_deref().unwrap_or(NO_VALUE);
  let what = match outcome.kind {
    OutcomeKind::None => "fed",
    OutcomeKind::StuckUp | OutcomeKind::LowerFailure => "error lowering",
    OutcomeKind::StuckDown | OutcomeKind::RaiseFailure => "error raising",
    OutcomeKind::Bounce => "error switch bounce",
  };
  let mut line = format!("{ts}: {what} {hopper}");
  if let Some(controller) = &outcome.controller {
    line.push_str(&format!(" on {controller}"));
  }
  if let Some(elapsed) = outcome.elapsed_ms {
    line.push_str(&format!(" ({elapsed:.6} ms)"));
  }
  line
}

/// Closing line of a streaming run.
pub fn totals_line(feed_commands: u64, outcomes: &[Outcome]) -> String {
  let bounces = outcomes.iter().filter(|o| o.kind == OutcomeKind::Bounce).count();
  let failures = outcomes
    .iter()
    .filter(|o| o.kind.is_error() && o.kind != OutcomeKind::Bounce)
    .count();
  format!("feed events: {feed_commands}, failures: {failures}, bounces: {bounces}")
}

fn row(controller: &str, feeder: &str, error: &str, count: &str) -> String {
  format!("{controller:<10}   {feeder:<6}   {error:<6}   {count}")
}
