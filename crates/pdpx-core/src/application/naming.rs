//! Naming application: returns naming policies by type or id.

use std::sync::Arc;

use crate::document::PolicyTypeIdentifier;
use crate::oracle::EvaluationOracle;
use crate::translator::CombinedResultsTranslator;

use super::StdApplication;

pub const NAMING_APPLICATION: &str = "naming";
pub const NAMING_ACTION: &str = "naming";
pub const NAMING_POLICY_TYPE: &str = "onap.policies.Naming";

#[must_use]
pub fn naming_policy_types() -> Vec<PolicyTypeIdentifier> {
    vec![PolicyTypeIdentifier::new(NAMING_POLICY_TYPE, "1.0.0")]
}

/// Build the naming application.
#[must_use]
pub fn naming_application(oracle: Arc<dyn EvaluationOracle>) -> StdApplication {
    StdApplication::new(
        NAMING_APPLICATION,
        vec![NAMING_ACTION.to_string()],
        naming_policy_types(),
        Box::new(CombinedResultsTranslator::new()),
        oracle,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::PolicyApplication;
    use crate::decision::{Decision, DecisionRequest, EvaluationContext};
    use crate::document::PolicyDocument;
    use crate::oracle::RuleTreeEvaluator;
    use serde_json::json;
    use time::macros::time;

    #[test]
    fn declares_naming_action_and_type() {
        let app = naming_application(Arc::new(RuleTreeEvaluator::new()));
        assert_eq!(app.name(), "naming");
        assert!(app.handles_action("naming"));
        assert!(app.supports(&PolicyTypeIdentifier::new("onap.policies.Naming", "1.0.0")));
        assert!(!app.supports(&PolicyTypeIdentifier::new("onap.policies.Naming", "1.0.1")));
    }

    #[tokio::test]
    async fn naming_request_returns_policy_body() {
        let app = naming_application(Arc::new(RuleTreeEvaluator::new()));
        let document = PolicyDocument::new(
            "SDNC_Policy.ONAP_NF_NAMING_TIMESTAMP",
            "1.0.0",
            &naming_policy_types()[0],
        )
        .with_property("policy-instance-name", "ONAP_NF_NAMING_TIMESTAMP");
        app.deploy(&document).await.unwrap();

        let request = DecisionRequest::new("SDNC", "naming")
            .with_resource("policy-type", json!(["onap.policies.Naming"]));
        let outcomes = app.decide(&EvaluationContext::at(&request, time!(09:30)));

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].decision, Decision::Permit);
        assert_eq!(
            outcomes[0].obligations[0].attributes["policy-id"],
            json!("SDNC_Policy.ONAP_NF_NAMING_TIMESTAMP")
        );
    }
}
