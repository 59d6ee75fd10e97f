//! Translator that returns matching policies themselves as the decision.
//!
//! A request names policy types or ids in its resource attributes; every
//! deployed policy that matches permits and carries its own body back as an
//! obligation. Used by applications whose callers want the policy content
//! rather than a yes/no answer.

use serde_json::{Map, Value};

use crate::document::PolicyDocument;
use crate::error::TranslationError;
use crate::expr::{MatchClause, Target, TreeFragment, attach_target_disjunction};
use crate::policy::{CombiningAlgorithm, Effect, Obligation, Rule, TranslatedPolicy};

use super::PolicyTranslator;

/// Resource attribute naming requested policy ids.
pub const POLICY_ID_ATTRIBUTE: &str = "policy-id";

/// Resource attribute naming requested policy types.
pub const POLICY_TYPE_ATTRIBUTE: &str = "policy-type";

#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedResultsTranslator;

impl CombinedResultsTranslator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PolicyTranslator for CombinedResultsTranslator {
    fn translate(
        &self,
        document: &PolicyDocument,
    ) -> Result<Vec<TranslatedPolicy>, TranslationError> {
        if document.name.trim().is_empty() {
            return Err(TranslationError::missing_field(&document.name, "name"));
        }
        if document.type_name.trim().is_empty() {
            return Err(TranslationError::missing_field(&document.name, "type"));
        }

        let by_id: TreeFragment =
            MatchClause::resource_equals(POLICY_ID_ATTRIBUTE, &document.name).into();
        let by_type: TreeFragment =
            MatchClause::resource_equals(POLICY_TYPE_ATTRIBUTE, &document.type_name).into();
        let target = attach_target_disjunction(
            attach_target_disjunction(Target::any(), by_id),
            by_type,
        );

        let mut attributes = Map::new();
        attributes.insert("policy-id".into(), Value::String(document.name.clone()));
        attributes.insert("policy-version".into(), Value::String(document.version.clone()));
        attributes.insert("policy-type".into(), Value::String(document.type_name.clone()));
        attributes.insert(
            "policy-type-version".into(),
            Value::String(document.type_version.clone()),
        );
        attributes.insert(
            "properties".into(),
            Value::Object(document.properties.clone()),
        );

        Ok(vec![TranslatedPolicy {
            id: document.identifier(),
            policy_type: document.policy_type(),
            target,
            rules: vec![Rule::unconditional(format!("{}:permit", document.name), Effect::Permit)],
            variables: Vec::new(),
            obligations: vec![Obligation {
                id: document.name.clone(),
                fulfill_on: Effect::Permit,
                attributes,
            }],
            advice: Vec::new(),
            combining: CombiningAlgorithm::FirstApplicable,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PolicyTypeIdentifier;
    use serde_json::json;

    fn naming_document() -> PolicyDocument {
        PolicyDocument::new(
            "SDNC_Policy.ONAP_NF_NAMING_TIMESTAMP",
            "1.0.0",
            &PolicyTypeIdentifier::new("onap.policies.Naming", "1.0.0"),
        )
        .with_property("policy-instance-name", "ONAP_NF_NAMING_TIMESTAMP")
        .with_property("naming-models", json!([{ "naming-type": "VNF" }]))
    }

    #[test]
    fn target_matches_by_id_or_type() {
        let policies = CombinedResultsTranslator::new().translate(&naming_document()).unwrap();
        assert_eq!(policies.len(), 1);

        let target = &policies[0].target;
        assert_eq!(target.disjunction.len(), 2);
        assert_eq!(
            target.disjunction.conjunctions[0].clauses[0].attribute_id(),
            POLICY_ID_ATTRIBUTE
        );
        assert_eq!(
            target.disjunction.conjunctions[1].clauses[0].attribute_id(),
            POLICY_TYPE_ATTRIBUTE
        );
    }

    #[test]
    fn obligation_carries_policy_body() {
        let policies = CombinedResultsTranslator::new().translate(&naming_document()).unwrap();
        let obligation = &policies[0].obligations[0];
        assert_eq!(obligation.id, "SDNC_Policy.ONAP_NF_NAMING_TIMESTAMP");
        assert_eq!(obligation.fulfill_on, Effect::Permit);
        assert_eq!(
            obligation.attributes["properties"]["policy-instance-name"],
            json!("ONAP_NF_NAMING_TIMESTAMP")
        );
    }

    #[test]
    fn translation_is_deterministic() {
        let translator = CombinedResultsTranslator::new();
        assert_eq!(
            translator.translate(&naming_document()).unwrap(),
            translator.translate(&naming_document()).unwrap()
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        let mut document = naming_document();
        document.name = String::new();
        let err = CombinedResultsTranslator::new().translate(&document).unwrap_err();
        assert_eq!(err.field(), Some("name"));
    }
}
