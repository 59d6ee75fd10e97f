//! Decision service: route, evaluate, combine, count.
//!
//! # Example
//!
//! ```ignore
//! use pdpx_core::{DecisionService, ApplicationRouter, PdpStatistics};
//!
//! let service = DecisionService::new(router, Arc::new(PdpStatistics::new()))
//!     .with_timeout(Duration::from_millis(500));
//! service.deploy(&document).await?;
//! let response = service.decide(request).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, timeout_at};

use crate::PdpResult;
use crate::application::PolicyApplication;
use crate::combiner::DecisionCombiner;
use crate::decision::{DecisionOutcome, DecisionRequest, DecisionResponse, EvaluationContext};
use crate::document::{PolicyDocument, PolicyIdentifier};
use crate::error::DeployError;
use crate::router::ApplicationRouter;
use crate::statistics::{PdpStatistics, StatisticsSnapshot};

/// Default per-request evaluation budget.
pub const DEFAULT_DECISION_TIMEOUT: Duration = Duration::from_secs(5);

/// Entry point for decisions and deployments.
#[derive(Clone)]
pub struct DecisionService {
    router: Arc<ApplicationRouter>,
    combiner: DecisionCombiner,
    statistics: Arc<PdpStatistics>,
    decision_timeout: Duration,
}

impl DecisionService {
    #[must_use]
    pub fn new(router: ApplicationRouter, statistics: Arc<PdpStatistics>) -> Self {
        Self {
            router: Arc::new(router),
            combiner: DecisionCombiner::new(statistics.clone()),
            statistics,
            decision_timeout: DEFAULT_DECISION_TIMEOUT,
        }
    }

    /// Set the per-request evaluation budget.
    #[must_use]
    pub fn with_timeout(mut self, decision_timeout: Duration) -> Self {
        self.decision_timeout = decision_timeout;
        self
    }

    #[must_use]
    pub fn router(&self) -> &ApplicationRouter {
        &self.router
    }

    // =========================================================================
    // Decisions
    // =========================================================================

    /// Decide one request.
    ///
    /// Each routed application evaluates on the blocking pool. All of them
    /// share one deadline; an application that misses it, or whose task
    /// fails, contributes a single Indeterminate outcome.
    pub async fn decide(&self, request: DecisionRequest) -> PdpResult<DecisionResponse> {
        let applications = match self.router.route(&request.action) {
            Ok(applications) => applications,
            Err(e) => {
                self.statistics.increment_error();
                tracing::warn!(
                    action = %request.action,
                    request_id = request.request_id.as_deref().unwrap_or("-"),
                    "No application for action"
                );
                return Err(e.into());
            }
        };

        let current_time = match EvaluationContext::new(&request) {
            Ok(ctx) => ctx.current_time(),
            Err(e) => {
                self.statistics.increment_error();
                tracing::warn!(
                    action = %request.action,
                    request_id = request.request_id.as_deref().unwrap_or("-"),
                    error = %e,
                    "Rejected decision request"
                );
                return Err(e);
            }
        };
        let request = Arc::new(request);
        let deadline = Instant::now() + self.decision_timeout;

        let tasks: Vec<_> = applications
            .into_iter()
            .map(|application| {
                let request = request.clone();
                let app = application.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    app.decide(&EvaluationContext::at(&request, current_time))
                });
                (application, handle)
            })
            .collect();

        let mut outcomes = Vec::new();
        for (application, handle) in tasks {
            let produced = match timeout_at(deadline, handle).await {
                Ok(Ok(produced)) => produced,
                Ok(Err(e)) => {
                    self.statistics.increment_error();
                    tracing::warn!(
                        application = %application.name(),
                        error = %e,
                        "Application evaluation task failed"
                    );
                    vec![DecisionOutcome::indeterminate()]
                }
                Err(_) => {
                    self.statistics.increment_error();
                    tracing::warn!(
                        application = %application.name(),
                        timeout_ms = self.decision_timeout.as_millis() as u64,
                        "Application evaluation timed out"
                    );
                    vec![DecisionOutcome::indeterminate()]
                }
            };

            for outcome in &produced {
                self.statistics
                    .record_application_outcome(application.name(), outcome.decision);
            }
            outcomes.extend(produced);
        }

        let response = self.combiner.combine(outcomes);
        tracing::debug!(
            action = %request.action,
            request_id = request.request_id.as_deref().unwrap_or("-"),
            status = %response.status,
            "Decision complete"
        );
        Ok(response)
    }

    // =========================================================================
    // Deployment
    // =========================================================================

    /// Deploy a document to the first application supporting its type.
    pub async fn deploy(&self, document: &PolicyDocument) -> PdpResult<usize> {
        let policy_type = document.policy_type();
        let Some(application) = self.router.for_policy_type(&policy_type) else {
            self.statistics.increment_deploy_failure();
            tracing::warn!(policy_type = %policy_type, "No application supports policy type");
            return Err(DeployError::UnsupportedPolicyType { policy_type }.into());
        };

        match application.deploy(document).await {
            Ok(count) => {
                self.statistics.increment_deploy_success();
                Ok(count)
            }
            Err(e) => {
                self.statistics.increment_deploy_failure();
                tracing::warn!(
                    application = %application.name(),
                    policy_id = %document.identifier(),
                    error = %e,
                    "Policy translation failed"
                );
                Err(DeployError::from(e).into())
            }
        }
    }

    /// Remove a deployed policy from whichever application holds it.
    pub async fn undeploy(&self, policy_id: &PolicyIdentifier) -> PdpResult<()> {
        for application in self.router.applications() {
            if application.undeploy(policy_id).await {
                self.statistics.increment_undeploy_success();
                return Ok(());
            }
        }

        self.statistics.increment_undeploy_failure();
        Err(DeployError::PolicyNotFound {
            policy_id: policy_id.clone(),
        }
        .into())
    }

    /// Counters plus the policy totals of the live sets at call time.
    #[must_use]
    pub fn statistics(&self) -> StatisticsSnapshot {
        self.statistics
            .snapshot()
            .with_policy_totals(self.router.total_policy_types(), self.router.total_policies())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{guard_application, guard_policy_types, naming_application};
    use crate::decision::Decision;
    use crate::document::PolicyTypeIdentifier;
    use crate::error::{ErrorCode, PdpError, TranslationError};
    use crate::oracle::RuleTreeEvaluator;
    use async_trait::async_trait;

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn service() -> DecisionService {
        let oracle = Arc::new(RuleTreeEvaluator::new());
        let router = ApplicationRouter::new()
            .with(Arc::new(naming_application(oracle.clone())))
            .with(Arc::new(guard_application(oracle)));
        DecisionService::new(router, Arc::new(PdpStatistics::new()))
    }

    fn guard_document() -> PolicyDocument {
        PolicyDocument::new("guard.frequency.phoneyloop", "1.0.0", &guard_policy_types()[0])
            .with_property("actor", "foo")
            .with_property("recipe", "bar")
            .with_property("clname", "phoneyloop")
            .with_property("targets", "somevnf")
    }

    fn guard_request() -> DecisionRequest {
        DecisionRequest::new("usecases", "guard")
            .with_resource("actor", "foo")
            .with_resource("recipe", "bar")
            .with_resource("target", "somevnf")
            .with_resource("clname", "phoneyloop")
    }

    /// Application whose evaluation blocks longer than any test timeout.
    struct StalledApplication {
        actions: Vec<String>,
    }

    #[async_trait]
    impl PolicyApplication for StalledApplication {
        fn name(&self) -> &str {
            "stalled"
        }

        fn actions(&self) -> &[String] {
            &self.actions
        }

        fn supported_policy_types(&self) -> &[PolicyTypeIdentifier] {
            &[]
        }

        async fn deploy(&self, document: &PolicyDocument) -> Result<usize, TranslationError> {
            Err(TranslationError::UnsupportedPolicyType {
                policy_type: document.policy_type(),
            })
        }

        async fn undeploy(&self, _policy_id: &PolicyIdentifier) -> bool {
            false
        }

        fn decide(&self, _ctx: &EvaluationContext<'_>) -> Vec<DecisionOutcome> {
            std::thread::sleep(Duration::from_millis(300));
            vec![DecisionOutcome::bare(Decision::Permit, None)]
        }

        fn policy_count(&self) -> usize {
            0
        }
    }

    // -------------------------------------------------------------------------
    // Decisions
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn guard_request_is_permitted() {
        let service = service();
        service.deploy(&guard_document()).await.unwrap();

        let response = service.decide(guard_request()).await.unwrap();
        assert_eq!(response.status, Decision::Permit);

        let stats = service.statistics();
        assert_eq!(stats.permit_decisions_count, 1);
        assert_eq!(stats.application_metrics["guard"]["permit_decision_count"], 1);
    }

    #[tokio::test]
    async fn unknown_action_is_routing_error_and_counted() {
        let service = service();
        let before = service.statistics().total_error_count;

        let err = service
            .decide(DecisionRequest::new("usecases", "foo"))
            .await
            .unwrap_err();

        assert!(matches!(err, PdpError::Routing(_)));
        assert_eq!(err.code(), ErrorCode::BadRequest);
        assert_eq!(err.to_string(), "No application for action foo");
        assert_eq!(service.statistics().total_error_count, before + 1);
    }

    #[tokio::test]
    async fn malformed_current_time_is_rejected_and_counted() {
        let service = service();
        let mut request = guard_request();
        request.current_time = Some("25:99:00Z".to_string());

        let err = service.decide(request).await.unwrap_err();
        assert!(matches!(err, PdpError::InvalidRequest { .. }));
        assert_eq!(err.code(), ErrorCode::BadRequest);

        let stats = service.statistics();
        assert_eq!(stats.total_error_count, 1);
        assert_eq!(stats.indeterminant_decisions_count, 0);
    }

    #[tokio::test]
    async fn routed_request_without_matching_policy_is_not_applicable() {
        let service = service();
        let response = service.decide(guard_request()).await.unwrap();
        assert_eq!(response.status, Decision::NotApplicable);
        assert_eq!(service.statistics().not_applicable_decisions_count, 1);
    }

    #[tokio::test]
    async fn stalled_application_times_out_as_indeterminate() {
        let router = ApplicationRouter::new().with(Arc::new(StalledApplication {
            actions: vec!["slow".to_string()],
        }));
        let service = DecisionService::new(router, Arc::new(PdpStatistics::new()))
            .with_timeout(Duration::from_millis(20));

        let response = service
            .decide(DecisionRequest::new("usecases", "slow"))
            .await
            .unwrap();

        assert_eq!(response.status, Decision::Indeterminate);
        let stats = service.statistics();
        assert_eq!(stats.total_error_count, 1);
        assert_eq!(stats.indeterminant_decisions_count, 1);
    }

    // -------------------------------------------------------------------------
    // Deployment
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn deploy_counts_success_and_totals() {
        let service = service();
        service.deploy(&guard_document()).await.unwrap();
        service.deploy(&guard_document()).await.unwrap();

        let stats = service.statistics();
        assert_eq!(stats.deploy_success_count, 2);
        assert_eq!(stats.total_policies_count, 1);
        assert_eq!(stats.total_policy_types_count, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_deploys_report_live_totals() {
        let service = service();
        let deploys: Vec<_> = (0..16)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    let mut document = guard_document();
                    document.name = format!("guard.frequency.{i}");
                    service.deploy(&document).await
                })
            })
            .collect();
        for deploy in deploys {
            deploy.await.unwrap().unwrap();
        }

        let stats = service.statistics();
        assert_eq!(stats.deploy_success_count, 16);
        assert_eq!(stats.total_policies_count, 16);
        assert_eq!(stats.total_policies_count as usize, service.router().total_policies());
    }

    #[tokio::test]
    async fn unsupported_type_counts_failure() {
        let service = service();
        let document = PolicyDocument::new(
            "x",
            "1.0.0",
            &PolicyTypeIdentifier::new("onap.policies.Unknown", "1.0.0"),
        );
        let err = service.deploy(&document).await.unwrap_err();
        assert!(matches!(
            err,
            PdpError::Deploy(DeployError::UnsupportedPolicyType { .. })
        ));
        assert_eq!(service.statistics().deploy_failure_count, 1);
    }

    #[tokio::test]
    async fn translation_failure_counts_failure() {
        let service = service();
        let mut document = guard_document();
        document.properties.remove("recipe");

        let err = service.deploy(&document).await.unwrap_err();
        assert!(err.to_string().contains("recipe"));
        assert_eq!(service.statistics().deploy_failure_count, 1);
        assert_eq!(service.statistics().total_policies_count, 0);
    }

    #[tokio::test]
    async fn undeploy_counts_success_and_failure() {
        let service = service();
        service.deploy(&guard_document()).await.unwrap();

        let id = guard_document().identifier();
        service.undeploy(&id).await.unwrap();
        let err = service.undeploy(&id).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);

        let stats = service.statistics();
        assert_eq!(stats.undeploy_success_count, 1);
        assert_eq!(stats.undeploy_failure_count, 1);
        assert_eq!(stats.total_policies_count, 0);
    }
}
