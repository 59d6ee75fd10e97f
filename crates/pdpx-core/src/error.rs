//! Error types for translation, routing, evaluation and deployment.
//!
//! None of these are fatal to the process. Routing failures are returned to
//! the caller, translation failures reject a deployment, and evaluation
//! failures are folded into an `Indeterminate` outcome.

use std::fmt;

use crate::document::{PolicyIdentifier, PolicyTypeIdentifier};

// =============================================================================
// Routing
// =============================================================================

/// No registered application declares the requested action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No application for action {action}")]
pub struct RoutingError {
    /// The action that could not be routed.
    pub action: String,
}

impl RoutingError {
    #[must_use]
    pub fn no_application(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }
}

// =============================================================================
// Translation
// =============================================================================

/// A declarative policy document could not be turned into rule trees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    /// A required property is absent.
    #[error("Policy {policy}: missing required field '{field}'")]
    MissingField {
        /// Policy name.
        policy: String,
        /// Offending property.
        field: String,
    },

    /// A property is present but unusable.
    #[error("Policy {policy}: invalid field '{field}': {reason}")]
    InvalidField {
        /// Policy name.
        policy: String,
        /// Offending property.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The translator does not handle this policy type.
    #[error("Policy type {policy_type} is not supported by this translator")]
    UnsupportedPolicyType {
        /// The rejected policy type.
        policy_type: PolicyTypeIdentifier,
    },
}

impl TranslationError {
    #[must_use]
    pub fn missing_field(policy: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            policy: policy.into(),
            field: field.into(),
        }
    }

    #[must_use]
    pub fn invalid_field(
        policy: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            policy: policy.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The offending field, if the error names one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field, .. } | Self::InvalidField { field, .. } => Some(field),
            Self::UnsupportedPolicyType { .. } => None,
        }
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Failure raised while evaluating one rule tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    #[error("Required attribute '{attribute_id}' is missing")]
    MissingAttribute { attribute_id: String },

    #[error("Attribute '{attribute_id}' has {count} values where one was expected")]
    NotSingleValued { attribute_id: String, count: usize },

    #[error("Function {function} expected {expected} arguments, got {actual}")]
    ArgumentCount {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("Function {function} cannot operate on {found}")]
    TypeMismatch { function: String, found: String },

    #[error("Unknown variable '{variable_id}'")]
    UnknownVariable { variable_id: String },

    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Expression nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },
}

// =============================================================================
// Deployment
// =============================================================================

/// A deployment or undeployment request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// No registered application supports the document's policy type.
    #[error("No application supports policy type {policy_type}")]
    UnsupportedPolicyType { policy_type: PolicyTypeIdentifier },

    /// Undeploy of a policy no application holds.
    #[error("Policy {policy_id} is not deployed")]
    PolicyNotFound { policy_id: PolicyIdentifier },
}

// =============================================================================
// Crate Error
// =============================================================================

/// Machine-checkable error code for transport mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    BadRequest,
    NotFound,
}

impl ErrorCode {
    /// HTTP status code equivalent.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::NotFound => "NOT_FOUND",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced by the decision service.
#[derive(Debug, thiserror::Error)]
pub enum PdpError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error("Invalid request field '{field}': {reason}")]
    InvalidRequest { field: String, reason: String },
}

impl PdpError {
    #[must_use]
    pub fn invalid_request(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Error code for this failure.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Routing(_) => ErrorCode::BadRequest,
            Self::Deploy(DeployError::PolicyNotFound { .. }) => ErrorCode::NotFound,
            Self::Deploy(_) | Self::InvalidRequest { .. } => ErrorCode::BadRequest,
        }
    }
}
