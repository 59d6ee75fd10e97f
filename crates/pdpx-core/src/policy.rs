//! Translated policies: the unit the evaluation oracle evaluates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::decision::Decision;
use crate::document::{PolicyIdentifier, PolicyTypeIdentifier};
use crate::expr::{Condition, Target, VariableDefinition};

// =============================================================================
// Effects and Combining
// =============================================================================

/// Effect of a rule whose target and condition hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Permit,
    Deny,
}

impl Effect {
    /// The decision this effect produces.
    #[must_use]
    pub fn decision(&self) -> Decision {
        match self {
            Self::Permit => Decision::Permit,
            Self::Deny => Decision::Deny,
        }
    }

    /// The effect a decision corresponds to, if any.
    #[must_use]
    pub fn from_decision(decision: Decision) -> Option<Self> {
        match decision {
            Decision::Permit => Some(Self::Permit),
            Decision::Deny => Some(Self::Deny),
            Decision::Indeterminate | Decision::NotApplicable => None,
        }
    }
}

/// How a policy combines the results of its rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombiningAlgorithm {
    DenyOverrides,
    PermitOverrides,
    FirstApplicable,
    DenyUnlessPermit,
    PermitUnlessDeny,
}

impl CombiningAlgorithm {
    /// Combine rule results in rule order.
    #[must_use]
    pub fn combine(&self, results: &[Decision]) -> Decision {
        let any = |d: Decision| results.contains(&d);
        match self {
            Self::DenyOverrides => {
                if any(Decision::Deny) {
                    Decision::Deny
                } else if any(Decision::Indeterminate) {
                    Decision::Indeterminate
                } else if any(Decision::Permit) {
                    Decision::Permit
                } else {
                    Decision::NotApplicable
                }
            }
            Self::PermitOverrides => {
                if any(Decision::Permit) {
                    Decision::Permit
                } else if any(Decision::Indeterminate) {
                    Decision::Indeterminate
                } else if any(Decision::Deny) {
                    Decision::Deny
                } else {
                    Decision::NotApplicable
                }
            }
            Self::FirstApplicable => results
                .iter()
                .copied()
                .find(|d| *d != Decision::NotApplicable)
                .unwrap_or(Decision::NotApplicable),
            Self::DenyUnlessPermit => {
                if any(Decision::Permit) {
                    Decision::Permit
                } else {
                    Decision::Deny
                }
            }
            Self::PermitUnlessDeny => {
                if any(Decision::Deny) {
                    Decision::Deny
                } else {
                    Decision::Permit
                }
            }
        }
    }
}

// =============================================================================
// Obligations and Advice
// =============================================================================

/// Annotation the caller must act upon when the decision matches `fulfill_on`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obligation {
    pub id: String,
    pub fulfill_on: Effect,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// Informational annotation returned when the decision matches `applies_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advice {
    pub id: String,
    pub applies_to: Effect,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

// =============================================================================
// Rules and Policies
// =============================================================================

/// A single rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub id: String,
    pub effect: Effect,
    pub target: Target,
    pub condition: Option<Condition>,
}

impl Rule {
    /// A rule with no target and no condition.
    #[must_use]
    pub fn unconditional(id: impl Into<String>, effect: Effect) -> Self {
        Self {
            id: id.into(),
            effect,
            target: Target::any(),
            condition: None,
        }
    }
}

/// A policy in evaluable form.
///
/// Built once at deployment and never edited; re-deployment replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedPolicy {
    /// Identity of the document this policy came from.
    pub id: PolicyIdentifier,
    pub policy_type: PolicyTypeIdentifier,
    pub target: Target,
    pub rules: Vec<Rule>,
    pub variables: Vec<VariableDefinition>,
    pub obligations: Vec<Obligation>,
    pub advice: Vec<Advice>,
    pub combining: CombiningAlgorithm,
}

impl TranslatedPolicy {
    /// Look up a variable definition by id.
    #[must_use]
    pub fn variable(&self, variable_id: &str) -> Option<&VariableDefinition> {
        self.variables
            .iter()
            .find(|definition| definition.variable_id == variable_id)
    }

    /// Obligations to attach to a decision.
    #[must_use]
    pub fn obligations_for(&self, decision: Decision) -> Vec<Obligation> {
        match Effect::from_decision(decision) {
            Some(effect) => self
                .obligations
                .iter()
                .filter(|o| o.fulfill_on == effect)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Advice to attach to a decision.
    #[must_use]
    pub fn advice_for(&self, decision: Decision) -> Vec<Advice> {
        match Effect::from_decision(decision) {
            Some(effect) => self
                .advice
                .iter()
                .filter(|a| a.applies_to == effect)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision::*;

    #[test]
    fn deny_overrides() {
        assert_eq!(CombiningAlgorithm::DenyOverrides.combine(&[Permit, Deny]), Deny);
        assert_eq!(
            CombiningAlgorithm::DenyOverrides.combine(&[Permit, Indeterminate]),
            Indeterminate
        );
        assert_eq!(CombiningAlgorithm::DenyOverrides.combine(&[]), NotApplicable);
    }

    #[test]
    fn permit_overrides() {
        assert_eq!(CombiningAlgorithm::PermitOverrides.combine(&[Deny, Permit]), Permit);
        assert_eq!(CombiningAlgorithm::PermitOverrides.combine(&[Deny]), Deny);
    }

    #[test]
    fn first_applicable_skips_not_applicable() {
        assert_eq!(
            CombiningAlgorithm::FirstApplicable.combine(&[NotApplicable, Deny, Permit]),
            Deny
        );
    }

    #[test]
    fn unless_algorithms_never_return_not_applicable() {
        assert_eq!(CombiningAlgorithm::DenyUnlessPermit.combine(&[NotApplicable]), Deny);
        assert_eq!(CombiningAlgorithm::DenyUnlessPermit.combine(&[Indeterminate]), Deny);
        assert_eq!(CombiningAlgorithm::PermitUnlessDeny.combine(&[]), Permit);
    }

    #[test]
    fn obligations_filtered_by_effect() {
        let policy = TranslatedPolicy {
            id: PolicyIdentifier::new("p", "1.0.0"),
            policy_type: PolicyTypeIdentifier::new("t", "1.0.0"),
            target: Target::any(),
            rules: vec![Rule::unconditional("r", Effect::Permit)],
            variables: Vec::new(),
            obligations: vec![Obligation {
                id: "on-permit".into(),
                fulfill_on: Effect::Permit,
                attributes: Map::new(),
            }],
            advice: Vec::new(),
            combining: CombiningAlgorithm::FirstApplicable,
        };

        assert_eq!(policy.obligations_for(Permit).len(), 1);
        assert!(policy.obligations_for(Deny).is_empty());
        assert!(policy.obligations_for(Indeterminate).is_empty());
    }
}
