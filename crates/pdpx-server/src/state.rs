//! Shared handler state and its construction from configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use pdpx_core::{
    ApplicationRouter, DecisionService, EvaluationOracle, PdpStatistics, PolicyDocument,
    RuleTreeEvaluator, guard_application, naming_application,
};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub service: DecisionService,
}

impl AppState {
    /// State over the standard applications with nothing deployed.
    pub fn new(cfg: &AppConfig) -> Self {
        let oracle: Arc<dyn EvaluationOracle> = Arc::new(RuleTreeEvaluator::new());
        let router = ApplicationRouter::new()
            .with(Arc::new(naming_application(oracle.clone())))
            .with(Arc::new(guard_application(oracle)));

        let service = DecisionService::new(router, Arc::new(PdpStatistics::new()))
            .with_timeout(cfg.decision_timeout());
        Self { service }
    }
}

/// Build state and deploy every configured policy document.
///
/// Any unreadable file or rejected document aborts startup.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let state = AppState::new(cfg);

    for path in &cfg.policies.deploy {
        let documents = load_policy_documents(Path::new(path)).await?;
        for document in documents {
            state
                .service
                .deploy(&document)
                .await
                .with_context(|| format!("deploying {} from {path}", document.identifier()))?;
        }
    }

    let stats = state.service.statistics();
    tracing::info!(
        applications = state.service.router().applications().len(),
        policies = stats.total_policies_count,
        "Decision service ready"
    );
    Ok(state)
}

/// Read a JSON file holding one policy document or an array of them.
pub async fn load_policy_documents(path: &Path) -> anyhow::Result<Vec<PolicyDocument>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading policy file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing policy file {}", path.display()))?;

    let documents = if value.is_array() {
        serde_json::from_value::<Vec<PolicyDocument>>(value)
    } else {
        serde_json::from_value::<PolicyDocument>(value).map(|document| vec![document])
    }
    .with_context(|| format!("policy file {} is not a policy document", path.display()))?;
    Ok(documents)
}
