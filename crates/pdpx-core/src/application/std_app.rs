//! Standard application backed by a translator and an evaluation oracle.

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::Mutex;

use crate::decision::{DecisionOutcome, EvaluationContext};
use crate::document::{PolicyDocument, PolicyIdentifier, PolicyTypeIdentifier};
use crate::error::TranslationError;
use crate::oracle::EvaluationOracle;
use crate::policy::TranslatedPolicy;
use crate::translator::PolicyTranslator;

use super::PolicyApplication;

// =============================================================================
// Policy Set
// =============================================================================

/// Immutable snapshot of an application's deployed policies.
///
/// Policies are kept in deployment order; re-deploying an identifier keeps
/// its original position.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    policies: IndexMap<PolicyIdentifier, Arc<Vec<TranslatedPolicy>>>,
    generation: u64,
}

impl PolicySet {
    /// Number of deployed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Incremented on every successful deploy or undeploy.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn get(&self, policy_id: &PolicyIdentifier) -> Option<&[TranslatedPolicy]> {
        self.policies.get(policy_id).map(|p| p.as_slice())
    }

    /// All translated policies in deployment order.
    pub fn translated(&self) -> impl Iterator<Item = &TranslatedPolicy> {
        self.policies.values().flat_map(|p| p.iter())
    }
}

// =============================================================================
// Standard Application
// =============================================================================

/// Application whose deployed policies live in a swapped snapshot.
///
/// Readers load the current [`PolicySet`] without locking. Deployments build
/// a complete replacement outside the read path and publish it with a single
/// pointer store; a mutex serializes deployments to this application only.
pub struct StdApplication {
    name: String,
    actions: Vec<String>,
    policy_types: Vec<PolicyTypeIdentifier>,
    translator: Box<dyn PolicyTranslator>,
    oracle: Arc<dyn EvaluationOracle>,
    live: ArcSwap<PolicySet>,
    deploy_lock: Mutex<()>,
}

impl StdApplication {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        actions: Vec<String>,
        policy_types: Vec<PolicyTypeIdentifier>,
        translator: Box<dyn PolicyTranslator>,
        oracle: Arc<dyn EvaluationOracle>,
    ) -> Self {
        Self {
            name: name.into(),
            actions,
            policy_types,
            translator,
            oracle,
            live: ArcSwap::from_pointee(PolicySet::default()),
            deploy_lock: Mutex::new(()),
        }
    }

    /// The current snapshot.
    #[must_use]
    pub fn policies(&self) -> Arc<PolicySet> {
        self.live.load_full()
    }

    fn evaluate_one(
        &self,
        policy: &TranslatedPolicy,
        ctx: &EvaluationContext<'_>,
    ) -> Option<DecisionOutcome> {
        match self.oracle.matches_target(&policy.target, ctx) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                tracing::debug!(
                    application = %self.name,
                    policy_id = %policy.id,
                    error = %e,
                    "Policy target indeterminate"
                );
                return Some(DecisionOutcome::indeterminate_for(policy.id.clone()));
            }
        }

        match self.oracle.evaluate(policy, ctx) {
            Ok(decision) => {
                tracing::debug!(
                    application = %self.name,
                    policy_id = %policy.id,
                    decision = %decision,
                    "Policy evaluated"
                );
                Some(DecisionOutcome {
                    decision,
                    obligations: policy.obligations_for(decision),
                    advice: policy.advice_for(decision),
                    policy_id: Some(policy.id.clone()),
                })
            }
            Err(e) => {
                tracing::debug!(
                    application = %self.name,
                    policy_id = %policy.id,
                    error = %e,
                    "Policy evaluation failed"
                );
                Some(DecisionOutcome::indeterminate_for(policy.id.clone()))
            }
        }
    }
}

#[async_trait]
impl PolicyApplication for StdApplication {
    fn name(&self) -> &str {
        &self.name
    }

    fn actions(&self) -> &[String] {
        &self.actions
    }

    fn supported_policy_types(&self) -> &[PolicyTypeIdentifier] {
        &self.policy_types
    }

    async fn deploy(&self, document: &PolicyDocument) -> Result<usize, TranslationError> {
        let policy_type = document.policy_type();
        if !self.supports(&policy_type) {
            return Err(TranslationError::UnsupportedPolicyType { policy_type });
        }

        // Translate before taking the lock; a failure leaves the set as is.
        let translated = self.translator.translate(document)?;
        let count = translated.len();
        let policy_id = document.identifier();

        let _guard = self.deploy_lock.lock().await;
        let mut next = PolicySet::clone(&self.live.load());
        let replaced = next
            .policies
            .insert(policy_id.clone(), Arc::new(translated))
            .is_some();
        next.generation += 1;
        self.live.store(Arc::new(next));

        tracing::info!(
            application = %self.name,
            policy_id = %policy_id,
            translated = count,
            replaced,
            "Policy deployed"
        );
        Ok(count)
    }

    async fn undeploy(&self, policy_id: &PolicyIdentifier) -> bool {
        let _guard = self.deploy_lock.lock().await;
        let current = self.live.load_full();
        if current.get(policy_id).is_none() {
            return false;
        }

        let mut next = PolicySet::clone(&current);
        next.policies.shift_remove(policy_id);
        next.generation += 1;
        self.live.store(Arc::new(next));

        tracing::info!(application = %self.name, policy_id = %policy_id, "Policy undeployed");
        true
    }

    fn decide(&self, ctx: &EvaluationContext<'_>) -> Vec<DecisionOutcome> {
        let snapshot = self.live.load();
        snapshot
            .translated()
            .filter_map(|policy| self.evaluate_one(policy, ctx))
            .collect()
    }

    fn policy_count(&self) -> usize {
        self.live.load().len()
    }
}
