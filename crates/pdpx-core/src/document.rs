//! Declarative policy documents and their identifiers.
//!
//! # Example
//!
//! ```ignore
//! use pdpx_core::document::PolicyDocument;
//!
//! let document: PolicyDocument = serde_json::from_str(r#"{
//!     "name": "guard.frequency.restart",
//!     "version": "1.0.0",
//!     "type": "onap.policies.controlloop.guard.FrequencyLimiter",
//!     "type_version": "1.0.0",
//!     "properties": { "actor": "APPC", "recipe": "Restart", "limit": 5 }
//! }"#)?;
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Identifiers
// =============================================================================

/// Policy type key an application declares support for.
///
/// Matching is exact on both name and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyTypeIdentifier {
    pub name: String,
    pub version: String,
}

impl PolicyTypeIdentifier {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PolicyTypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// Identity of a deployed policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolicyIdentifier {
    pub name: String,
    pub version: String,
}

impl PolicyIdentifier {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PolicyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

// =============================================================================
// Policy Document
// =============================================================================

/// A declaratively authored policy as supplied by the policy source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Policy name, unique per application.
    pub name: String,

    /// Policy version.
    pub version: String,

    /// Policy type name.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Policy type version.
    pub type_version: String,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    /// Type-specific properties the translator reads.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl PolicyDocument {
    /// Create a document with no metadata and no properties.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        policy_type: &PolicyTypeIdentifier,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            type_name: policy_type.name.clone(),
            type_version: policy_type.version.clone(),
            metadata: Map::new(),
            properties: Map::new(),
        }
    }

    /// Set a property, builder style.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn identifier(&self) -> PolicyIdentifier {
        PolicyIdentifier::new(&self.name, &self.version)
    }

    #[must_use]
    pub fn policy_type(&self) -> PolicyTypeIdentifier {
        PolicyTypeIdentifier::new(&self.type_name, &self.type_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_tosca_style_document() {
        let document: PolicyDocument = serde_json::from_str(
            r#"{
                "name": "SDNC_Policy.ONAP_NF_NAMING_TIMESTAMP",
                "version": "1.0.0",
                "type": "onap.policies.Naming",
                "type_version": "1.0.0",
                "properties": { "policy-instance-name": "ONAP_NF_NAMING_TIMESTAMP" }
            }"#,
        )
        .unwrap();

        assert_eq!(
            document.policy_type(),
            PolicyTypeIdentifier::new("onap.policies.Naming", "1.0.0")
        );
        assert_eq!(document.identifier().to_string(), "SDNC_Policy.ONAP_NF_NAMING_TIMESTAMP:1.0.0");
        assert!(document.metadata.is_empty());
    }

    #[test]
    fn type_identifier_requires_exact_version() {
        let a = PolicyTypeIdentifier::new("onap.policies.Naming", "1.0.0");
        let b = PolicyTypeIdentifier::new("onap.policies.Naming", "1.0.1");
        assert_ne!(a, b);
    }
}
