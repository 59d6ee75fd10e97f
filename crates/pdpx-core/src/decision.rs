//! Decision requests, per-policy outcomes and the combined response.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{OffsetDateTime, Time};

use crate::PdpResult;
use crate::document::PolicyIdentifier;
use crate::error::PdpError;
use crate::expr::{
    ACTION_ID_ATTRIBUTE, AttributeDesignator, AttributeValue, CURRENT_TIME_ATTRIBUTE, Category,
    DataType, SUBJECT_ID_ATTRIBUTE, parse_time_of_day,
};
use crate::policy::{Advice, Obligation};

// =============================================================================
// Decision
// =============================================================================

/// Decision status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    Permit,
    Deny,
    Indeterminate,
    NotApplicable,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Permit => "Permit",
            Self::Deny => "Deny",
            Self::Indeterminate => "Indeterminate",
            Self::NotApplicable => "NotApplicable",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Request
// =============================================================================

/// A decision request as received from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    /// Caller identity.
    #[serde(alias = "subject")]
    pub onap_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onap_component: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onap_instance: Option<String>,

    /// Caller-supplied correlation id, echoed into logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Action used for routing.
    pub action: String,

    /// Time of day (`HH:MM:SSZ`) to evaluate at instead of the wall clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_time: Option<String>,

    /// Resource attributes.
    #[serde(default)]
    pub resource: Map<String, Value>,
}

impl DecisionRequest {
    #[must_use]
    pub fn new(onap_name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            onap_name: onap_name.into(),
            onap_component: None,
            onap_instance: None,
            request_id: None,
            action: action.into(),
            current_time: None,
            resource: Map::new(),
        }
    }

    /// Set a resource attribute, builder style.
    #[must_use]
    pub fn with_resource(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.resource.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// Outcome and Response
// =============================================================================

/// Result of evaluating one translated policy.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub obligations: Vec<Obligation>,
    pub advice: Vec<Advice>,
    /// Originating policy; `None` for outcomes synthesized by the service.
    pub policy_id: Option<PolicyIdentifier>,
}

impl DecisionOutcome {
    /// An outcome carrying no annotations.
    #[must_use]
    pub fn bare(decision: Decision, policy_id: Option<PolicyIdentifier>) -> Self {
        Self {
            decision,
            obligations: Vec::new(),
            advice: Vec::new(),
            policy_id,
        }
    }

    /// Indeterminate outcome not tied to a policy.
    #[must_use]
    pub fn indeterminate() -> Self {
        Self::bare(Decision::Indeterminate, None)
    }

    #[must_use]
    pub fn indeterminate_for(policy_id: PolicyIdentifier) -> Self {
        Self::bare(Decision::Indeterminate, Some(policy_id))
    }
}

/// Final answer for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    pub status: Decision,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub advice: Vec<Advice>,
}

// =============================================================================
// Evaluation Context
// =============================================================================

/// Attribute view of one request, with the time of day fixed at creation.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    request: &'a DecisionRequest,
    current_time: Time,
}

impl<'a> EvaluationContext<'a> {
    /// Capture the request's time of day: its `current_time` when given,
    /// the UTC wall clock otherwise.
    ///
    /// A `current_time` that is not `HH:MM:SSZ` is rejected.
    pub fn new(request: &'a DecisionRequest) -> PdpResult<Self> {
        let current_time = match request.current_time.as_deref() {
            Some(text) => parse_time_of_day(text).ok_or_else(|| {
                PdpError::invalid_request("currentTime", format!("{text} is not HH:MM:SSZ"))
            })?,
            None => OffsetDateTime::now_utc().time(),
        };
        Ok(Self::at(request, current_time))
    }

    #[must_use]
    pub fn at(request: &'a DecisionRequest, current_time: Time) -> Self {
        Self {
            request,
            current_time,
        }
    }

    #[must_use]
    pub fn request(&self) -> &'a DecisionRequest {
        self.request
    }

    #[must_use]
    pub fn current_time(&self) -> Time {
        self.current_time
    }

    /// All values of the designated attribute, coerced to its data type.
    ///
    /// Arrays contribute each element. Values that cannot be coerced are
    /// dropped, so an empty bag means "absent".
    #[must_use]
    pub fn bag(&self, designator: &AttributeDesignator) -> Vec<AttributeValue> {
        let id = designator.attribute_id.as_str();
        match designator.category {
            Category::Subject if id == SUBJECT_ID_ATTRIBUTE => {
                coerce_string(&self.request.onap_name, designator.data_type)
                    .into_iter()
                    .collect()
            }
            Category::Action if id == ACTION_ID_ATTRIBUTE => {
                coerce_string(&self.request.action, designator.data_type)
                    .into_iter()
                    .collect()
            }
            Category::Environment if id == CURRENT_TIME_ATTRIBUTE => {
                match designator.data_type {
                    DataType::Time => vec![AttributeValue::Time(self.current_time)],
                    _ => Vec::new(),
                }
            }
            Category::Resource => match lookup(&self.request.resource, id) {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(|item| coerce(item, designator.data_type))
                    .collect(),
                Some(value) => coerce(value, designator.data_type).into_iter().collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

/// Find a resource attribute by exact key, then by dotted path.
fn lookup<'v>(resource: &'v Map<String, Value>, id: &str) -> Option<&'v Value> {
    if let Some(value) = resource.get(id) {
        return Some(value);
    }
    let mut segments = id.split('.');
    let mut current = resource.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn coerce(value: &Value, data_type: DataType) -> Option<AttributeValue> {
    match value {
        Value::String(s) => coerce_string(s, data_type),
        Value::Number(n) => match data_type {
            DataType::String => Some(AttributeValue::String(n.to_string())),
            DataType::Integer => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .map(AttributeValue::Integer),
            DataType::Double => n.as_f64().map(AttributeValue::Double),
            DataType::Boolean | DataType::Time => None,
        },
        Value::Bool(b) => match data_type {
            DataType::String => Some(AttributeValue::String(b.to_string())),
            DataType::Boolean => Some(AttributeValue::Boolean(*b)),
            _ => None,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn coerce_string(text: &str, data_type: DataType) -> Option<AttributeValue> {
    match data_type {
        DataType::String => Some(AttributeValue::string(text)),
        DataType::Integer => text.trim().parse().ok().map(AttributeValue::Integer),
        DataType::Double => text.trim().parse().ok().map(AttributeValue::Double),
        DataType::Boolean => match text.trim() {
            "true" => Some(AttributeValue::Boolean(true)),
            "false" => Some(AttributeValue::Boolean(false)),
            _ => None,
        },
        DataType::Time => parse_time_of_day(text).map(AttributeValue::Time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::time;

    fn request() -> DecisionRequest {
        DecisionRequest::new("usecases", "guard")
            .with_resource("actor", "APPC")
            .with_resource("targets", json!(["vnf-a", "vnf-b"]))
            .with_resource("operationCount", "3")
            .with_resource("vnf", json!({ "name": "somevnf", "count": 2 }))
    }

    #[test]
    fn deserializes_caller_request() {
        let request: DecisionRequest = serde_json::from_value(json!({
            "onapName": "policy",
            "requestId": "abc",
            "action": "naming",
            "resource": { "policy-type": "onap.policies.Naming" }
        }))
        .unwrap();
        assert_eq!(request.onap_name, "policy");
        assert_eq!(request.request_id.as_deref(), Some("abc"));
        assert_eq!(request.resource.len(), 1);
    }

    #[test]
    fn decision_serializes_as_name() {
        assert_eq!(
            serde_json::to_value(Decision::NotApplicable).unwrap(),
            json!("NotApplicable")
        );
    }

    #[test]
    fn resource_bag_flattens_arrays() {
        let request = request();
        let ctx = EvaluationContext::at(&request, time!(12:00));
        let bag = ctx.bag(&AttributeDesignator::resource("targets", DataType::String));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn resource_bag_follows_dotted_paths() {
        let request = request();
        let ctx = EvaluationContext::at(&request, time!(12:00));
        assert_eq!(
            ctx.bag(&AttributeDesignator::resource("vnf.name", DataType::String)),
            vec![AttributeValue::string("somevnf")]
        );
        assert_eq!(
            ctx.bag(&AttributeDesignator::resource("vnf.count", DataType::Integer)),
            vec![AttributeValue::Integer(2)]
        );
        assert!(ctx.bag(&AttributeDesignator::resource("vnf.missing", DataType::String)).is_empty());
    }

    #[test]
    fn string_values_coerce_to_integers() {
        let request = request();
        let ctx = EvaluationContext::at(&request, time!(12:00));
        assert_eq!(
            ctx.bag(&AttributeDesignator::resource("operationCount", DataType::Integer)),
            vec![AttributeValue::Integer(3)]
        );
        assert!(ctx.bag(&AttributeDesignator::resource("actor", DataType::Integer)).is_empty());
    }

    #[test]
    fn current_time_is_fixed_per_context() {
        let mut request = request();
        request.current_time = Some("23:30:00Z".to_string());
        let ctx = EvaluationContext::new(&request).unwrap();
        assert_eq!(ctx.current_time(), time!(23:30));
        assert_eq!(
            ctx.bag(&AttributeDesignator::current_time()),
            vec![AttributeValue::Time(time!(23:30))]
        );
    }

    #[test]
    fn malformed_current_time_is_rejected() {
        let mut request = request();
        request.current_time = Some("half past".to_string());
        let Err(err) = EvaluationContext::new(&request) else {
            panic!("expected invalid request");
        };
        assert!(matches!(err, PdpError::InvalidRequest { ref field, .. } if field == "currentTime"));
    }
}
