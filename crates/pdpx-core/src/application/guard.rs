//! Guard application: decides whether a control loop operation may run.

use std::sync::Arc;

use crate::document::PolicyTypeIdentifier;
use crate::oracle::EvaluationOracle;
use crate::translator::{BLACKLIST_POLICY_TYPE, FREQUENCY_LIMITER_POLICY_TYPE, GuardTranslator};

use super::StdApplication;

pub const GUARD_APPLICATION: &str = "guard";
pub const GUARD_ACTION: &str = "guard";

#[must_use]
pub fn guard_policy_types() -> Vec<PolicyTypeIdentifier> {
    vec![
        PolicyTypeIdentifier::new(FREQUENCY_LIMITER_POLICY_TYPE, "1.0.0"),
        PolicyTypeIdentifier::new(BLACKLIST_POLICY_TYPE, "1.0.0"),
    ]
}

#[must_use]
pub fn guard_application(oracle: Arc<dyn EvaluationOracle>) -> StdApplication {
    StdApplication::new(
        GUARD_APPLICATION,
        vec![GUARD_ACTION.to_string()],
        guard_policy_types(),
        Box::new(GuardTranslator::new()),
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

    #[tokio::test]
    async fn frequency_and_blacklist_deploy_side_by_side() {
        let app = guard_application(Arc::new(RuleTreeEvaluator::new()));
        let types = guard_policy_types();

        let frequency = PolicyDocument::new("guard.frequency", "1.0.0", &types[0])
            .with_property("actor", "foo")
            .with_property("recipe", "bar");
        let blacklist = PolicyDocument::new("guard.blacklist", "1.0.0", &types[1])
            .with_property("actor", "foo")
            .with_property("recipe", "bar")
            .with_property("blacklist", json!(["badvnf"]));

        app.deploy(&frequency).await.unwrap();
        app.deploy(&blacklist).await.unwrap();
        assert_eq!(app.policy_count(), 2);

        let request = DecisionRequest::new("usecases", "guard")
            .with_resource("actor", "foo")
            .with_resource("recipe", "bar")
            .with_resource("target", "badvnf");
        let decisions: Vec<Decision> = app
            .decide(&EvaluationContext::at(&request, time!(12:00)))
            .into_iter()
            .map(|o| o.decision)
            .collect();
        assert_eq!(decisions, vec![Decision::Permit, Decision::Deny]);
    }
}
