//! Reduce outcomes into per-controller count tables.

use std::collections::{BTreeMap, HashMap};

use crate::types::{ControllerSummary, Outcome, OutcomeKind, SummaryRow};

/// Group outcomes by controller (in order of first appearance), then count
/// them per `(hopper_id, kind)`.
///
/// Rows are sorted by hopper id, then by kind label, so the table renders the
/// same way every run.
pub fn aggregate<'a, I>(outcomes: I) -> Vec<ControllerSummary>
where
  I: IntoIterator<Item = &'a Outcome>,
{
  let mut index: HashMap<Option<String>, usize> = HashMap::new();
  let mut groups: Vec<(Option<String>, BTreeMap<(Option<String>, &'static str), (OutcomeKind, u64)>)> =
    Vec::new();

  for outcome in outcomes {
    let slot = *index.entry(outcome.controller.clone()).or_insert_with(|| {
      groups.push((outcome.controller.clone(), BTreeMap::new()));
      groups.len() - 1
    });
    let counts = &mut groups[slot].1;
    counts
      .entry((outcome.hopper_id.clone(), outcome.kind.as_str()))
      .or_insert((outcome.kind, 0))
      .1 += 1;
  }

  groups
    .into_iter()
    .map(|(controller, counts)| {
      let rows: Vec<SummaryRow> = counts
        .into_iter()
        .map(|((hopper_id, _), (kind, count))| SummaryRow {
          hopper_id,
          kind,
          count,
        })
        .collect();
      let total_errors = rows.iter().filter(|r| r.kind.is_error()).map(|r| r.count).sum();
      let total_feeds = rows.iter().filter(|r| !r.kind.is_error()).map(|r| r.count).sum();
      ControllerSummary {
        controller,
        rows,
        total_feeds,
        total_errors,
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn outcome(controller: &str, hopper: &str, kind: OutcomeKind) -> Outcome {
    Outcome {
      controller: Some(controller.into()),
      hopper_id: Some(hopper.into()),
      time: 0,
      kind,
      elapsed_ms: None,
    }
  }

  #[test]
  fn counts_per_hopper_and_kind() {
    let outcomes = vec![
      outcome("a", "2", OutcomeKind::None),
      outcome("a", "1", OutcomeKind::RaiseFailure),
      outcome("a", "2", OutcomeKind::None),
      outcome("a", "1", OutcomeKind::None),
    ];
    let summaries = aggregate(&outcomes);
    assert_eq!(summaries.len(), 1);
    let s = &summaries[0];
    let rows: Vec<_> = s
      .rows
      .iter()
      .map(|r| (r.hopper_id.as_deref().unwrap(), r.kind, r.count))
      .collect();
    assert_eq!(
      rows,
      vec![
        ("1", OutcomeKind::None, 1),
        ("1", OutcomeKind::RaiseFailure, 1),
        ("2", OutcomeKind::None, 2),
      ]
    );
    assert_eq!(s.total_feeds, 3);
    assert_eq!(s.total_errors, 1);
  }

  #[test]
  fn kinds_sort_by_label() {
    let outcomes = vec![
      outcome("a", "1", OutcomeKind::RaiseFailure),
      outcome("a", "1", OutcomeKind::None),
      outcome("a", "1", OutcomeKind::LowerFailure),
    ];
    let kinds: Vec<_> = aggregate(&outcomes)[0].rows.iter().map(|r| r.kind).collect();
    assert_eq!(
      kinds,
      vec![OutcomeKind::LowerFailure, OutcomeKind::None, OutcomeKind::RaiseFailure]
    );
  }

  #[test]
  fn controllers_keep_first_appearance_order() {
    let outcomes = vec![
      outcome("zeta", "1", OutcomeKind::None),
      outcome("alpha", "1", OutcomeKind::Bounce),
      outcome("zeta", "1", OutcomeKind::StuckUp),
    ];
    let summaries = aggregate(&outcomes);
    let names: Vec<_> = summaries.iter().map(|s| s.controller.as_deref()).collect();
    assert_eq!(names, vec![Some("zeta"), Some("alpha")]);
    assert_eq!(summaries[0].total_errors, 1);
    assert_eq!(summaries[1].total_errors, 1);
    assert_eq!(summaries[1].total_feeds, 0);
  }

  #[test]
  fn aggregation_is_repeatable() {
    let outcomes = vec![
      outcome("a", "1", OutcomeKind::None),
      outcome("b", "3", OutcomeKind::LowerFailure),
    ];
    assert_eq!(aggregate(&outcomes), aggregate(&outcomes));
  }

  #[test]
  fn empty_input_gives_empty_table() {
    assert!(aggregate(&Vec::<Outcome>::new()).is_empty());
  }
}
