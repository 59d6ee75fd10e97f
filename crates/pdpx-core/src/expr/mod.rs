//! Boolean rule trees and the builders that assemble them.
//!
//! Translators never construct targets by hand; they go through
//! [`builder`] so the splice rules (clause promotion, no-op on unknown
//! fragments) stay in one place.

pub mod builder;
pub mod tree;

pub use builder::{
    append_conjunction_to_disjunction, attach_target_disjunction, build_time_in_range,
    extend_condition, parse_time_of_day, parse_tolerant_integer,
};
pub use tree::{
    ACTION_ID_ATTRIBUTE, Apply, AttributeDesignator, AttributeValue, CURRENT_TIME_ATTRIBUTE,
    Category, Condition, Conjunction, DataType, Disjunction, Expression, FunctionId, MatchClause,
    SUBJECT_ID_ATTRIBUTE, Target, TreeFragment, VariableDefinition, VariableReference,
};
