//! Per-controller hopper state machine.
//!
//! Every controller gets its own [`ControllerState`]; events from different
//! controllers never touch each other's state. Two matching strategies are
//! supported:
//!
//! - [`Strategy::Paired`]: a command is paired with the next event of the same
//!   controller. Matching observation → `none`, anything else →
//!   `raise_failure` / `lower_failure`.
//! - [`Strategy::Streaming`]: the last known hopper position is carried across
//!   commands. Commands that find the hopper in the wrong position produce
//!   `stuck_up` / `stuck_down`, confirmations produce `none`, and a hopper that
//!   drops while its feeder is still on produces `bounce`.
//!
//! In both strategies a command still pending at the end of the log produces no
//! outcome.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::types::*;

/// The consistency checker. Holds per-controller state for one pass.
pub struct Checker {
  strategy: Strategy,
  controllers: BTreeMap<Option<String>, ControllerState>,
}

impl Checker {
  pub fn new(strategy: Strategy) -> Self {
    Self {
      strategy,
      controllers: BTreeMap::new(),
    }
  }

  pub fn strategy(&self) -> Strategy {
    self.strategy
  }

  /// Feed one event. Returns the outcome it completes, if any.
  pub fn process(&mut self, event: &NormalizedEvent) -> Option<Outcome> {
    let controller = event.controller().map(str::to_string);
    let state = self.controllers.entry(controller.clone()).or_default();

    let time = event.time();
    if let Some(last) = state.last_time {
      if time < last {
        warn!(
          controller = controller.as_deref().unwrap_or("-"),
          time, last, "event out of time order"
        );
      }
    }
    state.last_time = Some(time);

    match self.strategy {
      Strategy::Paired => process_paired(state, controller, event),
      Strategy::Streaming => process_streaming(state, controller, event),
    }
  }

  /// Per-controller state, ordered by controller.
  pub fn states(&self) -> impl Iterator<Item = (Option<&str>, &ControllerState)> {
    self
      .controllers
      .iter()
      .map(|(controller, state)| (controller.as_deref(), state))
  }

  /// Commands that never received a response. These are dropped, not reported.
  pub fn dangling(&self) -> u64 {
    self
      .controllers
      .values()
      .filter(|s| s.pending.is_some())
      .count() as u64
  }

  pub fn feed_commands(&self) -> u64 {
    self.controllers.values().map(|s| s.feed_commands).sum()
  }
}

fn process_paired(
  state: &mut ControllerState,
  controller: Option<String>,
  event: &NormalizedEvent,
) -> Option<Outcome> {
  // A pending command consumes whatever comes next, command or not.
  if let Some(cmd) = state.pending.take() {
    let confirmed = matches!(event, NormalizedEvent::Observation { up, .. } if *up == cmd.activate);
    let kind = match (confirmed, cmd.activate) {
      (true, _) => OutcomeKind::None,
      (false, true) => OutcomeKind::RaiseFailure,
      (false, false) => OutcomeKind::LowerFailure,
    };
    return Some(Outcome {
      controller,
      hopper_id: Some(cmd.hopper_id),
      time: cmd.time,
      kind,
      elapsed_ms: None,
    });
  }

  match event {
    NormalizedEvent::Command {
      hopper_id,
      time,
      activate,
      ..
    } => {
      if *activate {
        state.feed_commands += 1;
      }
      state.pending = Some(PendingCommand {
        hopper_id: hopper_id.clone(),
        activate: *activate,
        time: *time,
      });
    }
    NormalizedEvent::Observation { up, .. } => {
      debug!(up, "observation without pending command");
    }
  }
  None
}

fn process_streaming(
  state: &mut ControllerState,
  controller: Option<String>,
  event: &NormalizedEvent,
) -> Option<Outcome> {
  match event {
    NormalizedEvent::Command {
      hopper_id,
      time,
      activate,
      ..
    } => {
      let kind = match (*activate, state.hopper_up) {
        (true, true) => Some(OutcomeKind::StuckUp),
        (false, false) => Some(OutcomeKind::StuckDown),
        _ => None,
      };
      let outcome = kind.map(|kind| {
        // Stuck up blames the hopper that never came down, not the new one.
        let blamed = match kind {
          OutcomeKind::StuckUp => state.last_hopper_id.clone(),
          _ => None,
        };
        Outcome {
          controller,
          hopper_id: blamed.or_else(|| Some(hopper_id.clone())),
          time: *time,
          kind,
          elapsed_ms: None,
        }
      });

      state.pending = match outcome {
        Some(_) => None,
        None => Some(PendingCommand {
          hopper_id: hopper_id.clone(),
          activate: *activate,
          time: *time,
        }),
      };
      if *activate {
        state.feed_commands += 1;
      }
      state.feeding = *activate;
      state.last_hopper_id = Some(hopper_id.clone());
      outcome
    }
    NormalizedEvent::Observation {
      hopper_id,
      time,
      up,
      ..
    } => {
      let target = hopper_id.clone().or_else(|| state.last_hopper_id.clone());
      let mut outcome = None;

      if !*up && state.feeding {
        outcome = Some(Outcome {
          controller,
          hopper_id: target,
          time: *time,
          kind: OutcomeKind::Bounce,
          elapsed_ms: state.last_rise_time.map(|t| *time as f64 - t as f64),
        });
      } else if let Some(cmd) = state.pending.take() {
        if cmd.activate == *up {
          outcome = Some(Outcome {
            controller,
            hopper_id: Some(cmd.hopper_id),
            time: cmd.time,
            kind: OutcomeKind::None,
            elapsed_ms: None,
          });
        } else {
          state.pending = Some(cmd);
        }
      }

      if *up {
        state.last_rise_time = Some(*time);
      }
      state.hopper_up = *up;
      outcome
    }
  }
}
