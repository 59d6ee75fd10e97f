//! # pdpx-core
//!
//! Policy decision core: translates declarative policy documents into rule
//! trees, routes decision requests to the applications that own them, and
//! combines per-policy outcomes into one response.
//!
//! ## Modules
//!
//! - [`expr`] - Rule tree nodes and the pure builders that splice them
//! - [`document`] - Declarative policy documents and identifiers
//! - [`policy`] - Translated policies, rules and combining algorithms
//! - [`translator`] - Per-type translators (combined results, guard)
//! - [`oracle`] - Rule tree evaluation
//! - [`application`] - Applications owning deployed policy sets
//! - [`router`] - Action-based application routing
//! - [`combiner`] - Outcome combining and obligation merging
//! - [`statistics`] - Decision and deployment counters
//! - [`service`] - The async decision service tying it together

pub mod application;
pub mod combiner;
pub mod decision;
pub mod document;
pub mod error;
pub mod expr;
pub mod oracle;
pub mod policy;
pub mod router;
pub mod service;
pub mod statistics;
pub mod translator;

pub use application::{PolicyApplication, StdApplication, guard_application, naming_application};
pub use combiner::{DecisionCombiner, resolve_status};
pub use decision::{Decision, DecisionOutcome, DecisionRequest, DecisionResponse, EvaluationContext};
pub use document::{PolicyDocument, PolicyIdentifier, PolicyTypeIdentifier};
pub use error::{
    DeployError, ErrorCode, EvaluationError, PdpError, RoutingError, TranslationError,
};
pub use oracle::{EvaluationOracle, RuleTreeEvaluator};
pub use policy::{Advice, CombiningAlgorithm, Effect, Obligation, Rule, TranslatedPolicy};
pub use router::ApplicationRouter;
pub use service::{DEFAULT_DECISION_TIMEOUT, DecisionService};
pub use statistics::{PdpStatistics, StatisticsSnapshot};
pub use translator::PolicyTranslator;

/// Result type for decision service operations.
pub type PdpResult<T> = Result<T, PdpError>;
