//! Combining per-policy outcomes into one response.

use std::collections::HashSet;
use std::sync::Arc;

use crate::decision::{Decision, DecisionOutcome, DecisionResponse};
use crate::statistics::PdpStatistics;

/// Final status for a list of outcomes.
///
/// Deny wins, then Permit, then Indeterminate; an empty or all-NotApplicable
/// list is NotApplicable. Order and count do not matter.
#[must_use]
pub fn resolve_status(outcomes: &[DecisionOutcome]) -> Decision {
    let any = |d: Decision| outcomes.iter().any(|o| o.decision == d);
    if any(Decision::Deny) {
        Decision::Deny
    } else if any(Decision::Permit) {
        Decision::Permit
    } else if any(Decision::Indeterminate) {
        Decision::Indeterminate
    } else {
        Decision::NotApplicable
    }
}

/// Merges outcomes and counts the finished request.
#[derive(Debug, Clone)]
pub struct DecisionCombiner {
    statistics: Arc<PdpStatistics>,
}

impl DecisionCombiner {
    #[must_use]
    pub fn new(statistics: Arc<PdpStatistics>) -> Self {
        Self { statistics }
    }

    /// Combine outcomes in router order.
    ///
    /// Obligations and advice come only from outcomes whose decision equals
    /// the final status. Duplicate ids keep the first occurrence.
    pub fn combine(&self, outcomes: Vec<DecisionOutcome>) -> DecisionResponse {
        let status = resolve_status(&outcomes);

        let mut obligations = Vec::new();
        let mut advice = Vec::new();
        let mut seen_obligations = HashSet::new();
        let mut seen_advice = HashSet::new();

        for outcome in outcomes.into_iter().filter(|o| o.decision == status) {
            for obligation in outcome.obligations {
                if seen_obligations.insert(obligation.id.clone()) {
                    obligations.push(obligation);
                }
            }
            for item in outcome.advice {
                if seen_advice.insert(item.id.clone()) {
                    advice.push(item);
                }
            }
        }

        self.statistics.increment_decision(status);

        DecisionResponse {
            status,
            obligations,
            advice,
        }
    }
}
