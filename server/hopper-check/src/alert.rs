//! Threshold alerts for controllers with too many hopper errors.
//!
//! Deciding *whether* to alert lives here; delivering the message is up to a
//! [`Notifier`].

use tracing::{info, warn};

use crate::error::CheckError;
use crate::report;
use crate::types::{Alert, ControllerSummary, Window};

/// Sink for alerts (mail relay, chat hook, ...).
pub trait Notifier {
  fn notify(&mut self, alert: &Alert) -> Result<(), CheckError>;
}

/// Writes alerts to the diagnostic log.
#[derive(Debug, Default)]
pub struct LogNotifier {
  sent: u64,
}

impl LogNotifier {
  pub fn sent(&self) -> u64 {
    self.sent
  }
}

impl Notifier for LogNotifier {
  fn notify(&mut self, alert: &Alert) -> Result<(), CheckError> {
    warn!(
      alert_id = %alert.alert_id,
      controller = alert.controller.as_deref().unwrap_or("-"),
      total_errors = alert.total_errors,
      max_errors = alert.max_errors,
      "hopper issues\n{}",
      alert.body
    );
    self.sent += 1;
    Ok(())
  }
}

/// Build an alert when `total_errors >= max_errors`.
pub fn evaluate(summary: &ControllerSummary, max_errors: u64, window: Option<&Window>) -> Option<Alert> {
  if summary.total_errors < max_errors {
    return None;
  }

  let mut lines = report::header(window);
  lines.extend(report::summary_lines(summary));

  Some(Alert {
    alert_id: alert_id(summary, window),
    controller: summary.controller.clone(),
    total_errors: summary.total_errors,
    max_errors,
    window: window.copied(),
    body: lines.join("\n"),
  })
}

/// Evaluate every summary and hand the resulting alerts to `notifier`.
/// Returns the alerts that were sent.
pub fn dispatch<N: Notifier>(
  summaries: &[ControllerSummary],
  max_errors: u64,
  window: Option<&Window>,
  notifier: &mut N,
) -> Result<Vec<Alert>, CheckError> {
  let mut sent = Vec::new();
  for summary in summaries {
    if let Some(alert) = evaluate(summary, max_errors, window) {
      notifier.notify(&alert)?;
      info!(alert_id = %alert.alert_id, "alert sent");
      sent.push(alert);
    }
  }
  Ok(sent)
}

/// Stable alert ID: hash of controller + window start + counted rows.
fn alert_id(summary: &ControllerSummary, window: Option<&Window>) -> String {
  let mut hasher = blake3::Hasher::new();
  hasher.update(summary.controller.as_deref().unwrap_or("").as_bytes());
  hasher.update(b"|");
  if let Some(w) = window {
    hasher.update(w.start.format("%Y-%m-%dT%H:%M").to_string().as_bytes());
  }
  for row in &summary.rows {
    hasher.update(b"|");
    hasher.update(row.hopper_id.as_deref().unwrap_or("").as_bytes());
    hasher.update(b":");
    hasher.update(row.kind.as_str().as_bytes());
    hasher.update(b"=");
    hasher.update(row.count.to_string().as_bytes());
  }
  let hex = hasher.finalize().to_hex();
  format!("hop-{}", &hex[..16])
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{OutcomeKind, SummaryRow};

  fn summary(controller: &str, errors: u64) -> ControllerSummary {
    ControllerSummary {
      controller: Some(controller.into()),
      rows: vec![SummaryRow {
        hopper_id: Some("1".into()),
        kind: OutcomeKind::RaiseFailure,
        count: errors,
      }],
      total_feeds: 0,
      total_errors: errors,
    }
  }

  #[derive(Default)]
  struct Recorder(Vec<Alert>);

  impl Notifier for Recorder {
    fn notify(&mut self, alert: &Alert) -> Result<(), CheckError> {
      self.0.push(alert.clone());
      Ok(())
    }
  }

  #[test]
  fn below_threshold_is_quiet() {
    assert!(evaluate(&summary("box1", 1), 2, None).is_none());
  }

  #[test]
  fn threshold_is_inclusive() {
    let alert = evaluate(&summary("box1", 2), 2, None).unwrap();
    assert_eq!(alert.controller.as_deref(), Some("box1"));
    assert!(alert.alert_id.starts_with("hop-"));
    assert_eq!(alert.alert_id.len(), 20);
    assert!(alert.body.contains("raise_failure"));
  }

  #[test]
  fn alert_id_is_stable() {
    let a = evaluate(&summary("box1", 3), 2, None).unwrap();
    let b = evaluate(&summary("box1", 3), 2, None).unwrap();
    let c = evaluate(&summary("box2", 3), 2, None).unwrap();
    assert_eq!(a.alert_id, b.alert_id);
    assert_ne!(a.alert_id, c.alert_id);
  }

  #[test]
  fn dispatch_notifies_only_failing_controllers() {
    let mut recorder = Recorder::default();
    let sent = dispatch(
      &[summary("box1", 0), summary("box2", 5)],
      2,
      None,
      &mut recorder,
    )
    .unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(recorder.0.len(), 1);
    assert_eq!(recorder.0[0].controller.as_deref(), Some("box2"));
  }

  #[test]
  fn log_notifier_counts() {
    let mut notifier = LogNotifier::default();
    let alert = evaluate(&summary("box1", 2), 2, None).unwrap();
    notifier.notify(&alert).unwrap();
    assert_eq!(notifier.sent(), 1);
  }
}
