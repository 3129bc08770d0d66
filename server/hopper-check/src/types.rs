//! Core types for the hopper checker (JSON contracts + internal models).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CheckError;

// ---------------------------------------------------------------------------
// Inbound types (JSON contract, one line of the event log)
// ---------------------------------------------------------------------------

/// One raw event log line. Unknown fields are silently ignored.
///
/// Every field is optional at this layer; the normalizer decides whether the
/// record is relevant and whether a missing field is an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawEvent {
  /// Epoch milliseconds.
  #[serde(default)]
  pub time: Option<i64>,
  #[serde(default)]
  pub addr: Option<String>,
  /// Present on feeder command records.
  #[serde(default)]
  pub feeding: Option<bool>,
  /// Present on hopper position records.
  #[serde(default)]
  pub up: Option<bool>,
}

/// A parsed log line together with its 1-based line number in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
  pub line: usize,
  pub event: RawEvent,
}

// ---------------------------------------------------------------------------
// Pass options
// ---------------------------------------------------------------------------

/// How commands are matched against hopper observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
  /// Offline: each command is paired with the next event of its controller.
  #[default]
  Paired,
  /// Level-based: last-known hopper position is carried across commands.
  Streaming,
}

impl FromStr for Strategy {
  type Err = CheckError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "paired" | "offline" => Ok(Self::Paired),
      "streaming" | "stream" => Ok(Self::Streaming),
      other => Err(CheckError::parse(format!(
        "unknown strategy {other:?}, expected paired|streaming"
      ))),
    }
  }
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Paired => write!(f, "paired"),
      Self::Streaming => write!(f, "streaming"),
    }
  }
}

/// Which address convention the log uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressMode {
  /// Bare addresses (`feeder_2`, `hopper`); everything belongs to one controller.
  Flat,
  /// `controller.component` addresses (`box3.feeder_2`, `box3.hopper`).
  #[default]
  Grouped,
}

// ---------------------------------------------------------------------------
// Internal normalized types
// ---------------------------------------------------------------------------

/// Canonical hopper-related event after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedEvent {
  /// The controller switched a feeder on (`activate`) or off.
  Command {
    controller: Option<String>,
    hopper_id: String,
    time: i64,
    activate: bool,
  },
  /// The hopper position switch reported up or down.
  Observation {
    controller: Option<String>,
    hopper_id: Option<String>,
    time: i64,
    up: bool,
  },
}

impl NormalizedEvent {
  pub fn controller(&self) -> Option<&str> {
    match self {
      Self::Command { controller, .. } | Self::Observation { controller, .. } => {
        controller.as_deref()
      }
    }
  }

  pub fn time(&self) -> i64 {
    match self {
      Self::Command { time, .. } | Self::Observation { time, .. } => *time,
    }
  }
}

// ---------------------------------------------------------------------------
// Per-controller checker state
// ---------------------------------------------------------------------------

/// A command still waiting for its hopper to respond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
  pub hopper_id: String,
  pub activate: bool,
  pub time: i64,
}

/// Everything the checker remembers about one controller.
///
/// The paired strategy only maintains `pending`, `last_time` and
/// `feed_commands`; the position fields belong to the streaming strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerState {
  pub pending: Option<PendingCommand>,
  /// Hopper named by the most recent command.
  pub last_hopper_id: Option<String>,
  /// Last reported hopper position; starts down.
  pub hopper_up: bool,
  /// Direction of the most recent command.
  pub feeding: bool,
  pub last_rise_time: Option<i64>,
  pub last_time: Option<i64>,
  /// Number of activating commands seen.
  pub feed_commands: u64,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
  /// The command was followed by the expected hopper movement.
  None,
  /// Paired: feeder switched on but the hopper did not report up.
  RaiseFailure,
  /// Paired: feeder switched off but the hopper did not report down.
  LowerFailure,
  /// Streaming: feeder switched on while the hopper was still up.
  StuckUp,
  /// Streaming: feeder switched off while the hopper never rose.
  StuckDown,
  /// Streaming: hopper dropped while its feeder was still on.
  Bounce,
}

impl OutcomeKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::None => "none",
      Self::RaiseFailure => "raise_failure",
      Self::LowerFailure => "lower_failure",
      Self::StuckUp => "stuck_up",
      Self::StuckDown => "stuck_down",
      Self::Bounce => "bounce",
    }
  }

  pub fn is_error(self) -> bool {
    !matches!(self, Self::None)
  }
}

impl fmt::Display for OutcomeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// One classified command (or bounce) for one hopper.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
  pub controller: Option<String>,
  pub hopper_id: Option<String>,
  pub time: i64,
  pub kind: OutcomeKind,
  /// Milliseconds since the hopper last rose; bounces only.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub elapsed_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// Output types (JSON contract, what we emit)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
  pub hopper_id: Option<String>,
  pub kind: OutcomeKind,
  pub count: u64,
}

/// Counts for one controller, rows ordered by `(hopper_id, kind)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerSummary {
  pub controller: Option<String>,
  pub rows: Vec<SummaryRow>,
  pub total_feeds: u64,
  pub total_errors: u64,
}

/// Time span covered by a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Window {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

/// Counters describing one pass over a log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassStats {
  pub records: u64,
  pub irrelevant: u64,
  pub malformed: u64,
  /// Commands still pending when the log ended.
  pub dangling: u64,
  pub feed_commands: u64,
}

/// Raised when a controller's error count reaches the configured threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
  pub alert_id: String,
  pub controller: Option<String>,
  pub total_errors: u64,
  pub max_errors: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub window: Option<Window>,
  pub body: String,
}
