//! Action-based routing to registered applications.

use std::sync::Arc;

use crate::application::PolicyApplication;
use crate::document::PolicyTypeIdentifier;
use crate::error::RoutingError;

/// Ordered registry of applications.
///
/// Registration order is kept; routing results follow it.
#[derive(Default, Clone)]
pub struct ApplicationRouter {
    applications: Vec<Arc<dyn PolicyApplication>>,
}

impl ApplicationRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application, builder style.
    #[must_use]
    pub fn with(mut self, application: Arc<dyn PolicyApplication>) -> Self {
        self.register(application);
        self
    }

    pub fn register(&mut self, application: Arc<dyn PolicyApplication>) {
        tracing::debug!(
            application = %application.name(),
            actions = ?application.actions(),
            "Registered application"
        );
        self.applications.push(application);
    }

    /// Every application declaring `action`, in registration order.
    pub fn route(&self, action: &str) -> Result<Vec<Arc<dyn PolicyApplication>>, RoutingError> {
        let matched: Vec<_> = self
            .applications
            .iter()
            .filter(|app| app.handles_action(action))
            .cloned()
            .collect();

        if matched.is_empty() {
            return Err(RoutingError::no_application(action));
        }
        Ok(matched)
    }

    /// First application supporting the policy type.
    #[must_use]
    pub fn for_policy_type(
        &self,
        policy_type: &PolicyTypeIdentifier,
    ) -> Option<Arc<dyn PolicyApplication>> {
        self.applications
            .iter()
            .find(|app| app.supports(policy_type))
            .cloned()
    }

    #[must_use]
    pub fn applications(&self) -> &[Arc<dyn PolicyApplication>] {
        &self.applications
    }

    /// Distinct policy types across all applications.
    #[must_use]
    pub fn total_policy_types(&self) -> usize {
        let mut types: Vec<&PolicyTypeIdentifier> = self
            .applications
            .iter()
            .flat_map(|app| app.supported_policy_types())
            .collect();
        types.sort();
        types.dedup();
        types.len()
    }

    /// Deployed policy documents across all applications.
    #[must_use]
    pub fn total_policies(&self) -> usize {
        self.applications.iter().map(|app| app.policy_count()).sum()
    }
}
