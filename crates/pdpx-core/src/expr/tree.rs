//! Rule tree node types.
//!
//! A translated policy is a shallow, fixed-shape tree: a [`Target`] made of a
//! [`Disjunction`] of [`Conjunction`]s of [`MatchClause`]s, plus an optional
//! [`Condition`] expression per rule. Nodes are plain owned values; builders
//! always return new trees instead of editing the ones they were given.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::Time;

// =============================================================================
// Categories and Data Types
// =============================================================================

/// Attribute category a designator reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The caller identity.
    Subject,
    /// The resource attribute map of the request.
    Resource,
    /// The requested action.
    Action,
    /// Request environment (current time).
    Environment,
}

impl Category {
    /// XACML category URN.
    #[must_use]
    pub fn urn(&self) -> &'static str {
        match self {
            Self::Subject => "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject",
            Self::Resource => "urn:oasis:names:tc:xacml:3.0:attribute-category:resource",
            Self::Action => "urn:oasis:names:tc:xacml:3.0:attribute-category:action",
            Self::Environment => "urn:oasis:names:tc:xacml:3.0:attribute-category:environment",
        }
    }
}

/// Data type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Integer,
    Double,
    Boolean,
    Time,
}

impl DataType {
    /// XML Schema data type URI.
    #[must_use]
    pub fn urn(&self) -> &'static str {
        match self {
            Self::String => "http://www.w3.org/2001/XMLSchema#string",
            Self::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            Self::Double => "http://www.w3.org/2001/XMLSchema#double",
            Self::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            Self::Time => "http://www.w3.org/2001/XMLSchema#time",
        }
    }
}

// =============================================================================
// Attribute Values
// =============================================================================

/// A typed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Time(Time),
}

impl AttributeValue {
    /// Create a string value.
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// The data type of this value.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Integer(_) => DataType::Integer,
            Self::Double(_) => DataType::Double,
            Self::Boolean(_) => DataType::Boolean,
            Self::Time(_) => DataType::Time,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Time(t) => write!(f, "{t}"),
        }
    }
}

/// Reference to a request attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeDesignator {
    /// Attribute identifier. Resource attributes accept dotted paths into
    /// nested maps.
    pub attribute_id: String,
    pub category: Category,
    pub data_type: DataType,
    /// Whether absence is an evaluation error rather than an empty bag.
    pub must_be_present: bool,
}

impl AttributeDesignator {
    /// Designator for a resource attribute.
    #[must_use]
    pub fn resource(attribute_id: impl Into<String>, data_type: DataType) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            category: Category::Resource,
            data_type,
            must_be_present: false,
        }
    }

    /// Designator for the environment's current time of day.
    #[must_use]
    pub fn current_time() -> Self {
        Self {
            attribute_id: CURRENT_TIME_ATTRIBUTE.to_string(),
            category: Category::Environment,
            data_type: DataType::Time,
            must_be_present: true,
        }
    }

    /// Mark the attribute as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.must_be_present = true;
        self
    }
}

/// Environment attribute id carrying the time of day of the request.
pub const CURRENT_TIME_ATTRIBUTE: &str = "current-time";

/// Subject attribute id carrying the caller identity.
pub const SUBJECT_ID_ATTRIBUTE: &str = "subject-id";

/// Action attribute id carrying the requested action.
pub const ACTION_ID_ATTRIBUTE: &str = "action-id";

// =============================================================================
// Functions
// =============================================================================

/// Function identifiers usable in match clauses and condition applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionId {
    StringEqual,
    StringEqualIgnoreCase,
    StringRegexpMatch,
    IntegerEqual,
    IntegerGreaterThan,
    IntegerGreaterThanOrEqual,
    IntegerLessThan,
    IntegerLessThanOrEqual,
    BooleanEqual,
    /// `(time, lower, upper)` with an inclusive upper bound.
    TimeInRange,
    /// `(time, lower, upper)` with an exclusive upper bound.
    TimeInRangeHalfOpen,
    And,
    Or,
    Not,
}

impl FunctionId {
    /// URN of the function.
    #[must_use]
    pub fn urn(&self) -> &'static str {
        match self {
            Self::StringEqual => "urn:oasis:names:tc:xacml:1.0:function:string-equal",
            Self::StringEqualIgnoreCase => {
                "urn:oasis:names:tc:xacml:3.0:function:string-equal-ignore-case"
            }
            Self::StringRegexpMatch => "urn:oasis:names:tc:xacml:1.0:function:string-regexp-match",
            Self::IntegerEqual => "urn:oasis:names:tc:xacml:1.0:function:integer-equal",
            Self::IntegerGreaterThan => "urn:oasis:names:tc:xacml:1.0:function:integer-greater-than",
            Self::IntegerGreaterThanOrEqual => {
                "urn:oasis:names:tc:xacml:1.0:function:integer-greater-than-or-equal"
            }
            Self::IntegerLessThan => "urn:oasis:names:tc:xacml:1.0:function:integer-less-than",
            Self::IntegerLessThanOrEqual => {
                "urn:oasis:names:tc:xacml:1.0:function:integer-less-than-or-equal"
            }
            Self::BooleanEqual => "urn:oasis:names:tc:xacml:1.0:function:boolean-equal",
            Self::TimeInRange => "urn:oasis:names:tc:xacml:2.0:function:time-in-range",
            Self::TimeInRangeHalfOpen => "urn:pdpx:function:time-in-range-half-open",
            Self::And => "urn:oasis:names:tc:xacml:1.0:function:and",
            Self::Or => "urn:oasis:names:tc:xacml:1.0:function:or",
            Self::Not => "urn:oasis:names:tc:xacml:1.0:function:not",
        }
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.urn())
    }
}

// =============================================================================
// Target Nodes
// =============================================================================

/// A single attribute test: `function(value, attribute)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchClause {
    pub function: FunctionId,
    /// Expected value from the policy.
    pub value: AttributeValue,
    /// Request attribute the value is compared against.
    pub designator: AttributeDesignator,
}

impl MatchClause {
    /// `string-equal` against a resource attribute.
    #[must_use]
    pub fn resource_equals(attribute_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            function: FunctionId::StringEqual,
            value: AttributeValue::string(value),
            designator: AttributeDesignator::resource(attribute_id, DataType::String),
        }
    }

    /// Attribute identifier tested by the clause.
    #[must_use]
    pub fn attribute_id(&self) -> &str {
        &self.designator.attribute_id
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.designator.category
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        self.designator.data_type
    }
}

/// AND-group of match clauses (`AllOf`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conjunction {
    pub clauses: Vec<MatchClause>,
}

impl Conjunction {
    #[must_use]
    pub fn new(clauses: Vec<MatchClause>) -> Self {
        Self { clauses }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// OR-group of conjunctions (`AnyOf`).
///
/// An empty disjunction is a transient builder state meaning "nothing built
/// yet"; finalized trees always hold at least one conjunction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Disjunction {
    pub conjunctions: Vec<Conjunction>,
}

impl Disjunction {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.conjunctions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conjunctions.is_empty()
    }
}

/// Match gate attached to a policy or rule.
///
/// A target whose disjunction is empty places no constraint on the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Target {
    pub disjunction: Disjunction,
}

impl Target {
    /// A target that matches every request.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Returns `true` if the target places no constraint on the request.
    #[must_use]
    pub fn matches_everything(&self) -> bool {
        self.disjunction.is_empty()
    }
}

/// Input accepted by the tree builders.
///
/// `Unrecognized` stands for any fragment kind the builders do not know how
/// to splice; they leave their output untouched when given one.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeFragment {
    Clause(MatchClause),
    Conjunction(Conjunction),
    Disjunction(Disjunction),
    Unrecognized,
}

impl From<MatchClause> for TreeFragment {
    fn from(clause: MatchClause) -> Self {
        Self::Clause(clause)
    }
}

impl From<Conjunction> for TreeFragment {
    fn from(conjunction: Conjunction) -> Self {
        Self::Conjunction(conjunction)
    }
}

impl From<Disjunction> for TreeFragment {
    fn from(disjunction: Disjunction) -> Self {
        Self::Disjunction(disjunction)
    }
}

// =============================================================================
// Condition Expressions
// =============================================================================

/// Named reference to a [`VariableDefinition`] of the owning policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    pub variable_id: String,
}

impl VariableReference {
    #[must_use]
    pub fn new(variable_id: impl Into<String>) -> Self {
        Self {
            variable_id: variable_id.into(),
        }
    }
}

/// A policy-scoped named expression.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDefinition {
    pub variable_id: String,
    pub expression: Expression,
}

/// Function application.
#[derive(Debug, Clone, PartialEq)]
pub struct Apply {
    pub function: FunctionId,
    pub arguments: Vec<Expression>,
}

impl Apply {
    #[must_use]
    pub fn new(function: FunctionId, arguments: Vec<Expression>) -> Self {
        Self {
            function,
            arguments,
        }
    }
}

/// Condition expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Value(AttributeValue),
    Designator(AttributeDesignator),
    Variable(VariableReference),
    Apply(Apply),
}

impl From<Apply> for Expression {
    fn from(apply: Apply) -> Self {
        Self::Apply(apply)
    }
}

impl From<AttributeValue> for Expression {
    fn from(value: AttributeValue) -> Self {
        Self::Value(value)
    }
}

impl From<VariableReference> for Expression {
    fn from(variable: VariableReference) -> Self {
        Self::Variable(variable)
    }
}

/// Boolean expression evaluated after the owning rule's target matched.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub root: Expression,
}

impl Condition {
    #[must_use]
    pub fn new(root: impl Into<Expression>) -> Self {
        Self { root: root.into() }
    }

    /// The root application, if the root is a function application.
    #[must_use]
    pub fn root_apply(&self) -> Option<&Apply> {
        match &self.root {
            Expression::Apply(apply) => Some(apply),
            _ => None,
        }
    }
}
