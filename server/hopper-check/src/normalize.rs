//! Normalize raw log records into hopper commands and observations.

use crate::error::CheckError;
use crate::types::*;

const HOPPER: &str = "hopper";
const FEEDER_PREFIXES: [&str; 2] = ["feeder", "feed"];

/// Classify a raw record.
///
/// Returns `Ok(None)` for records that have nothing to do with the hoppers
/// (other devices, or feeder/hopper records without a payload). Returns an
/// error only for relevant records that cannot be interpreted.
pub fn normalize(raw: &RawEvent, mode: AddressMode) -> Result<Option<NormalizedEvent>, CheckError> {
  let addr = match raw.addr.as_deref() {
    Some(a) if !a.is_empty() => a,
    _ => return Ok(None),
  };

  let (controller, component) = match mode {
    AddressMode::Flat => (None, addr),
    AddressMode::Grouped => split_addr(addr),
  };
  if !is_relevant(addr, component, mode) {
    return Ok(None);
  }

  if component == HOPPER {
    let Some(up) = raw.up else {
      return Ok(None);
    };
    return Ok(Some(NormalizedEvent::Observation {
      controller: controller.map(str::to_string),
      hopper_id: None,
      time: required_time(raw)?,
      up,
    }));
  }

  let Some(activate) = raw.feeding else {
    return Ok(None);
  };
  let hopper_id = hopper_id(component)
    .ok_or_else(|| CheckError::validation("addr", &format!("no hopper id in {component:?}")))?;
  Ok(Some(NormalizedEvent::Command {
    controller: controller.map(str::to_string),
    hopper_id: hopper_id.to_string(),
    time: required_time(raw)?,
    activate,
  }))
}

/// Split `controller.component`. Anything that is not exactly two parts is a
/// bare component with no controller.
pub fn split_addr(addr: &str) -> (Option<&str>, &str) {
  let mut parts = addr.split('.');
  match (parts.next(), parts.next(), parts.next()) {
    (Some(controller), Some(component), None) => (Some(controller), component),
    _ => (None, addr),
  }
}

/// Hopper id of a feeder component: the segment after the first `_`
/// (`feeder_2` → `2`), or whatever follows the prefix (`feeder2` → `2`).
pub fn hopper_id(component: &str) -> Option<&str> {
  if let Some(id) = component.split('_').nth(1) {
    return Some(id).filter(|id| !id.is_empty());
  }
  FEEDER_PREFIXES
    .iter()
    .find_map(|p| component.strip_prefix(p))
    .filter(|id| !id.is_empty())
}

fn is_relevant(addr: &str, component: &str, mode: AddressMode) -> bool {
  match mode {
    AddressMode::Flat => addr.starts_with(FEEDER_PREFIXES[0]) || addr == HOPPER,
    AddressMode::Grouped => component == HOPPER || component.starts_with(FEEDER_PREFIXES[1]),
  }
}

fn required_time(raw: &RawEvent) -> Result<i64, CheckError> {
  raw
    .time
    .ok_or_else(|| CheckError::validation("time", "missing on hopper record"))
}
