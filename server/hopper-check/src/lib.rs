//! Hopper consistency checker: replays a feeder event log and verifies that
//! every feeder command is followed by the matching hopper movement.
//!
//! ```text
//! jsonl ──► source ──► normalize ──► checker ──► aggregate ──► report / alert
//! ```
//!
//! Hardware problems are data ([`Outcome`]); only an unreadable source is an
//! error. No DB, no network; pure computation over a finite log.

pub mod aggregate;
pub mod alert;
pub mod checker;
pub mod config;
pub mod error;
pub mod normalize;
pub mod report;
pub mod source;
pub mod types;

use tracing::{debug, warn};

pub use checker::Checker;
pub use config::Config;
pub use error::CheckError;
pub use source::JsonlReader;
pub use types::{ControllerSummary, NormalizedEvent, Outcome, OutcomeKind, RawEvent, Record, Strategy};

use types::{PassStats, Window};

/// Result of one pass over a log.
#[derive(Debug, Clone)]
pub struct Report {
  /// Outcomes in the order the checker produced them.
  pub outcomes: Vec<Outcome>,
  pub summaries: Vec<ControllerSummary>,
  /// Span of the hopper events that were analysed.
  pub window: Option<Window>,
  pub stats: PassStats,
}

/// Run records through the normalizer, checker and aggregator.
///
/// Records that cannot be interpreted are logged and skipped. The only error
/// returned is a failure of the record source itself.
pub fn check<I>(records: I, config: &Config) -> Result<Report, CheckError>
where
  I: IntoIterator<Item = Result<Record, CheckError>>,
{
  let mut checker = Checker::new(config.strategy);
  let mut outcomes = Vec::new();
  let mut stats = PassStats::default();
  let mut span: Option<(i64, i64)> = None;

  for record in records {
    let record = record?;
    stats.records += 1;

    let event = match normalize::normalize(&record.event, config.address_mode) {
      Ok(Some(event)) => event,
      Ok(None) => {
        stats.irrelevant += 1;
        continue;
      }
      Err(e) => {
        stats.malformed += 1;
        let err = CheckError::malformed(record.line, e.to_string());
        warn!(
          line = record.line,
          addr = record.event.addr.as_deref().unwrap_or("-"),
          time = ?record.event.time,
          "skipping record: {err}"
        );
        continue;
      }
    };

    let t = event.time();
    span = Some(match span {
      Some((lo, hi)) => (lo.min(t), hi.max(t)),
      None => (t, t),
    });

    if let Some(outcome) = checker.process(&event) {
      debug!(kind = %outcome.kind, time = outcome.time, "outcome");
      outcomes.push(outcome);
    }
  }

  stats.dangling = checker.dangling();
  stats.feed_commands = checker.feed_commands();
  if stats.dangling > 0 {
    debug!(dangling = stats.dangling, "dropping commands without a response");
  }
  for (controller, state) in checker.states() {
    debug!(
      controller = controller.unwrap_or("-"),
      hopper_up = state.hopper_up,
      pending = state.pending.is_some(),
      feed_commands = state.feed_commands,
      "final controller state"
    );
  }

  Ok(Report {
    summaries: aggregate::aggregate(&outcomes),
    outcomes,
    window: span.map(|(lo, hi)| Window {
      start: report::timestamp(lo),
      end: report::timestamp(hi),
    }),
    stats,
  })
}
