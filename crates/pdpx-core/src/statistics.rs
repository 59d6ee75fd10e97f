//! Process-wide decision and deployment counters.
//!
//! Counters only ever increase. Each is an independent atomic, so a snapshot
//! is consistent per counter but not across counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::decision::Decision;

/// Counters shared by the decision service and the deployment path.
#[derive(Debug, Default)]
pub struct PdpStatistics {
    permit: AtomicU64,
    deny: AtomicU64,
    indeterminate: AtomicU64,
    not_applicable: AtomicU64,
    errors: AtomicU64,
    deploy_success: AtomicU64,
    deploy_failure: AtomicU64,
    undeploy_success: AtomicU64,
    undeploy_failure: AtomicU64,
    application_metrics: DashMap<String, DashMap<String, u64>>,
}

impl PdpStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one finished request.
    pub fn increment_decision(&self, decision: Decision) {
        let counter = match decision {
            Decision::Permit => &self.permit,
            Decision::Deny => &self.deny,
            Decision::Indeterminate => &self.indeterminate,
            Decision::NotApplicable => &self.not_applicable,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deploy_success(&self) {
        self.deploy_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deploy_failure(&self) {
        self.deploy_failure.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_undeploy_success(&self) {
        self.undeploy_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_undeploy_failure(&self) {
        self.undeploy_failure.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one per-policy outcome for an application.
    pub fn record_application_outcome(&self, application: &str, decision: Decision) {
        let metrics = self
            .application_metrics
            .entry(application.to_string())
            .or_default();
        *metrics.entry(metric_name(decision).to_string()).or_insert(0) += 1;
    }

    /// Point-in-time copy of every counter.
    ///
    /// Policy totals are not counters; they are left at zero here and filled
    /// in with [`StatisticsSnapshot::with_policy_totals`].
    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let application_metrics: BTreeMap<String, BTreeMap<String, u64>> = self
            .application_metrics
            .iter()
            .map(|entry| {
                let metrics = entry
                    .value()
                    .iter()
                    .map(|m| (m.key().clone(), *m.value()))
                    .collect();
                (entry.key().clone(), metrics)
            })
            .collect();

        StatisticsSnapshot {
            code: 200,
            total_policy_types_count: 0,
            total_policies_count: 0,
            total_error_count: self.errors.load(Ordering::Relaxed),
            permit_decisions_count: self.permit.load(Ordering::Relaxed),
            deny_decisions_count: self.deny.load(Ordering::Relaxed),
            deploy_success_count: self.deploy_success.load(Ordering::Relaxed),
            deploy_failure_count: self.deploy_failure.load(Ordering::Relaxed),
            undeploy_success_count: self.undeploy_success.load(Ordering::Relaxed),
            undeploy_failure_count: self.undeploy_failure.load(Ordering::Relaxed),
            indeterminant_decisions_count: self.indeterminate.load(Ordering::Relaxed),
            not_applicable_decisions_count: self.not_applicable.load(Ordering::Relaxed),
            application_metrics,
        }
    }
}

fn metric_name(decision: Decision) -> &'static str {
    match decision {
        Decision::Permit => "permit_decision_count",
        Decision::Deny => "deny_decision_count",
        Decision::Indeterminate => "indeterminate_decision_count",
        Decision::NotApplicable => "not_applicable_decision_count",
    }
}

/// Serializable statistics report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub code: u16,
    pub total_policy_types_count: u64,
    pub total_policies_count: u64,
    pub total_error_count: u64,
    pub permit_decisions_count: u64,
    pub deny_decisions_count: u64,
    pub deploy_success_count: u64,
    pub deploy_failure_count: u64,
    pub undeploy_success_count: u64,
    pub undeploy_failure_count: u64,
    pub indeterminant_decisions_count: u64,
    pub not_applicable_decisions_count: u64,
    pub application_metrics: BTreeMap<String, BTreeMap<String, u64>>,
}

impl StatisticsSnapshot {
    /// Set the deployed policy and policy type totals.
    #[must_use]
    pub fn with_policy_totals(mut self, policy_types: usize, policies: usize) -> Self {
        self.total_policy_types_count = policy_types as u64;
        self.total_policies_count = policies as u64;
        self
    }
}
