//! Applications: pluggable owners of a family of policy types.
//!
//! An application declares the actions it answers for and the policy types
//! it can deploy. It keeps the translated trees of its deployed policies and
//! evaluates them when the router hands it a request.

mod guard;
mod naming;
mod std_app;

pub use guard::{GUARD_ACTION, GUARD_APPLICATION, guard_application, guard_policy_types};
pub use naming::{
    NAMING_ACTION, NAMING_APPLICATION, NAMING_POLICY_TYPE, naming_application,
    naming_policy_types,
};
pub use std_app::{PolicySet, StdApplication};

use async_trait::async_trait;

use crate::decision::{DecisionOutcome, EvaluationContext};
use crate::document::{PolicyDocument, PolicyIdentifier, PolicyTypeIdentifier};
use crate::error::TranslationError;

/// Contract every registered application fulfils.
#[async_trait]
pub trait PolicyApplication: Send + Sync {
    /// Application name, used as the key in per-application metrics.
    fn name(&self) -> &str;

    /// Actions this application answers for.
    fn actions(&self) -> &[String];

    /// Policy types this application can deploy.
    fn supported_policy_types(&self) -> &[PolicyTypeIdentifier];

    /// Exact match on name and version.
    fn supports(&self, policy_type: &PolicyTypeIdentifier) -> bool {
        self.supported_policy_types()
            .iter()
            .any(|supported| supported == policy_type)
    }

    fn handles_action(&self, action: &str) -> bool {
        self.actions().iter().any(|a| a == action)
    }

    /// Translate and install a document, replacing any policy with the same
    /// identifier. Returns the number of translated policies installed.
    ///
    /// On error the live set is unchanged.
    async fn deploy(&self, document: &PolicyDocument) -> Result<usize, TranslationError>;

    /// Remove a deployed policy. Returns `false` if it was not deployed.
    async fn undeploy(&self, policy_id: &PolicyIdentifier) -> bool;

    /// Evaluate every deployed policy whose target matches.
    ///
    /// Synchronous; may be run on a blocking thread.
    fn decide(&self, ctx: &EvaluationContext<'_>) -> Vec<DecisionOutcome>;

    /// Number of deployed policy documents.
    fn policy_count(&self) -> usize;
}
